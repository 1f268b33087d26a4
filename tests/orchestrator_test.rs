//! Run-level behavior of the batch orchestrator against scripted workflows.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use labrunner::{BatchRunner, Config, Credentials, Outcome, SessionGuard, WorkItem};
use support::{ScriptedWorkflow, Step, StubConnector};

fn test_config() -> Config {
    Config {
        max_batch_size: 99,
        poll_interval_ms: 10,
        resolve_timeout_ms: 100,
        stage_timeout_ms: 100,
        ..Config::default()
    }
}

fn make_runner(config: Config, opens: Arc<AtomicUsize>, fail_from: Option<usize>) -> BatchRunner {
    let connector = match fail_from {
        Some(nth) => StubConnector::failing_from(opens, nth),
        None => StubConnector::reliable(opens),
    };
    let guard = SessionGuard::new(
        Box::new(connector),
        Credentials {
            username: "tech".to_string(),
            password: "secret".to_string(),
        },
        "http://lab/entry",
    );
    BatchRunner::new(config, guard).expect("config is valid")
}

fn items(n: usize) -> Vec<WorkItem> {
    (1..=n).map(|i| WorkItem::new(format!("ITEM-{i}"))).collect()
}

#[tokio::test]
async fn end_to_end_with_session_loss_and_soft_failure() {
    // Item 3 loses the session on its first attempt and succeeds on retry;
    // item 4 is a business no-match.
    let workflow = ScriptedWorkflow::new()
        .script("ITEM-3", vec![Step::LoseSession, Step::Succeed])
        .script("ITEM-4", vec![Step::Soft("no results found")]);

    let opens = Arc::new(AtomicUsize::new(0));
    let mut runner = make_runner(test_config(), opens.clone(), None);
    let input = items(5);
    let report = runner.run(&input, &workflow).await;

    assert!(!report.cancelled);
    assert!(!report.is_aborted());

    let summary = report.ledger.summary();
    assert_eq!(summary.success, 4);
    assert_eq!(summary.soft_failure, 1);
    assert_eq!(summary.hard_failure, 0);
    assert_eq!(summary.not_attempted, 0);
    assert_eq!(summary.total, 5);

    // Ledger order mirrors input order, recovery never skips an item.
    let recorded: Vec<&str> = report
        .ledger
        .entries()
        .iter()
        .map(|e| e.item_id.as_str())
        .collect();
    assert_eq!(recorded, vec!["ITEM-1", "ITEM-2", "ITEM-3", "ITEM-4", "ITEM-5"]);

    // Initial connect plus exactly one recovery.
    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert_eq!(workflow.rewinds.load(Ordering::SeqCst), 2);
    assert_eq!(workflow.attempts_for("ITEM-3"), 2);
    assert_eq!(workflow.attempts_for("ITEM-1"), 1);

    let rendered = report.ledger.render();
    let expected = "\
batch run report
================
successes (4):
  1. ITEM-1
  2. ITEM-2
  3. ITEM-3
  5. ITEM-5
soft failures (1):
  4. ITEM-4 - no results found
hard failures (0):
not attempted: 0
summary: success=4 soft=1 hard=0 not_attempted=0 total=5
";
    assert_eq!(rendered, expected);
}

#[tokio::test]
async fn an_item_is_never_driven_more_than_twice() {
    // Session loss on both attempts: recorded as a hard failure after the
    // single retry, and the rest of the batch still runs.
    let workflow = ScriptedWorkflow::new()
        .script("ITEM-2", vec![Step::LoseSession, Step::LoseSession]);

    let opens = Arc::new(AtomicUsize::new(0));
    let mut runner = make_runner(test_config(), opens, None);
    let input = items(3);
    let report = runner.run(&input, &workflow).await;

    assert_eq!(workflow.attempts_for("ITEM-2"), 2);

    let summary = report.ledger.summary();
    assert_eq!(summary.success, 2);
    assert_eq!(summary.hard_failure, 1);
    assert_eq!(summary.not_attempted, 0);
    assert!(matches!(
        report.ledger.entries()[1].outcome,
        Outcome::HardFailure(_)
    ));
}

#[tokio::test]
async fn ordinary_failures_do_not_trigger_recovery() {
    let workflow =
        ScriptedWorkflow::new().script("ITEM-1", vec![Step::Fail("submit button missing")]);

    let opens = Arc::new(AtomicUsize::new(0));
    let mut runner = make_runner(test_config(), opens.clone(), None);
    let input = items(2);
    let report = runner.run(&input, &workflow).await;

    // One attempt, no retry, no reconnect beyond the initial one.
    assert_eq!(workflow.attempts_for("ITEM-1"), 1);
    assert_eq!(opens.load(Ordering::SeqCst), 1);

    let summary = report.ledger.summary();
    assert_eq!(summary.hard_failure, 1);
    assert_eq!(summary.success, 1);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_item() {
    let workflow = ScriptedWorkflow::new().cancel_after("ITEM-2");

    let opens = Arc::new(AtomicUsize::new(0));
    let mut runner = make_runner(test_config(), opens, None);
    let input = items(5);
    let report = runner.run(&input, &workflow).await;

    assert!(report.cancelled);
    assert!(!report.is_aborted());
    assert_eq!(report.ledger.entries().len(), 2);
    assert_eq!(workflow.attempts_for("ITEM-3"), 0);

    let summary = report.ledger.summary();
    assert_eq!(summary.success, 2);
    assert_eq!(summary.not_attempted, 3);
}

#[tokio::test]
async fn failed_recovery_aborts_but_preserves_the_ledger() {
    // Item 2 loses the session; the reconnect for its retry is refused.
    let workflow = ScriptedWorkflow::new().script("ITEM-2", vec![Step::LoseSession]);

    let opens = Arc::new(AtomicUsize::new(0));
    let mut runner = make_runner(test_config(), opens, Some(2));
    let input = items(3);
    let report = runner.run(&input, &workflow).await;

    assert!(report.is_aborted());
    assert!(!report.cancelled);

    let summary = report.ledger.summary();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.not_attempted, 2);
    assert_eq!(report.ledger.entries().len(), 1);
    assert_eq!(report.ledger.entries()[0].item_id, "ITEM-1");
}

#[tokio::test]
async fn finalize_failure_is_a_batch_note_not_an_item_outcome() {
    let workflow = ScriptedWorkflow::new().finalize_fail(2);

    let config = Config {
        max_batch_size: 2,
        ..test_config()
    };
    let opens = Arc::new(AtomicUsize::new(0));
    let mut runner = make_runner(config, opens, None);
    let input = items(5);
    let report = runner.run(&input, &workflow).await;

    // All items succeeded; the batch failure lives next to them, not
    // instead of them.
    let summary = report.ledger.summary();
    assert_eq!(summary.success, 5);
    assert_eq!(summary.hard_failure, 0);

    assert_eq!(report.ledger.batch_notes().len(), 1);
    assert_eq!(report.ledger.batch_notes()[0].batch_number, 2);
    assert!(report.ledger.render().contains("batch notes (1):"));
}

#[tokio::test]
async fn zero_batch_size_is_rejected_up_front() {
    let config = Config {
        max_batch_size: 0,
        ..test_config()
    };
    let opens = Arc::new(AtomicUsize::new(0));
    let guard = SessionGuard::new(
        Box::new(StubConnector::reliable(opens)),
        Credentials {
            username: "tech".to_string(),
            password: "secret".to_string(),
        },
        "http://lab/entry",
    );
    assert!(BatchRunner::new(config, guard).is_err());
}
