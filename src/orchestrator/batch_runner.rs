//! Batch runner.
//!
//! ## Responsibilities
//!
//! Top-level loop of one run: per item, check the cancel flag, make the
//! session usable through the guard, drive the workflow, classify failures
//! (session loss → one recovery + one retry of the same item, anything else
//! → recorded hard failure) and append the outcome to the ledger. After a
//! batch's items, run the optional finalize hook; its failures are recorded
//! at batch granularity and never rewrite item outcomes.
//!
//! Only an unrecoverable session ends the run early, and even then the
//! ledger recorded so far is returned so the operator can resume where the
//! run stopped.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, GuardError, StageError};
use crate::guard::{Readiness, SessionGuard};
use crate::ledger::ResultLedger;
use crate::orchestrator::batching::{chunk_batches, Batch};
use crate::resolver::Resolver;
use crate::session::Rewind;
use crate::wait::CancelFlag;
use crate::workflow::{drive, BatchCx, ItemCtx, ItemWorkflow, Outcome, StageCx, WorkItem};

/// Why a run ended before the last item.
#[derive(Debug, Error)]
pub enum RunAbort {
    #[error("session unrecoverable: {0}")]
    SessionUnrecoverable(#[from] GuardError),
}

/// What a run produced. `ledger` is complete up to the point the run
/// stopped; a cancelled run is a normal return, not an error.
#[derive(Debug)]
pub struct RunReport {
    pub ledger: ResultLedger,
    pub cancelled: bool,
    pub abort: Option<RunAbort>,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }
}

/// How one item's attempt (including its possible retry) ended.
enum ItemEnd {
    Recorded(Outcome),
    Cancelled,
    Abort(GuardError),
}

/// Drives one run. Owns the cancel flag and the ledger for the duration of
/// the run; owns the session indirectly through the guard.
pub struct BatchRunner {
    config: Config,
    guard: SessionGuard,
    resolver: Resolver,
    cancel: CancelFlag,
}

impl BatchRunner {
    pub fn new(config: Config, guard: SessionGuard) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = Resolver::new(config.poll_interval(), config.resolve_timeout());
        Ok(Self {
            config,
            guard,
            resolver,
            cancel: CancelFlag::new(),
        })
    }

    /// Clone of the cooperative cancellation flag, for the result consumer.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process `items` in input order through `workflow`.
    pub async fn run<W: ItemWorkflow>(&mut self, items: &[WorkItem], workflow: &W) -> RunReport {
        let mut ledger = ResultLedger::new(items.len());
        let batches = chunk_batches(items, self.config.max_batch_size);
        log_run_start(items.len(), batches.len(), self.config.max_batch_size);

        let mut cancelled = false;
        let mut abort: Option<RunAbort> = None;

        'run: for batch in &batches {
            log_batch_start(batch, items.len());

            for (offset, item) in batch.items.iter().enumerate() {
                let ordinal = batch.start + offset + 1;

                if self.cancel.is_set() {
                    info!("cancellation requested, stopping before item {ordinal}");
                    cancelled = true;
                    break 'run;
                }

                let ctx = ItemCtx::new(item, ordinal, items.len(), batch.number);
                match self.attempt_item(item, &ctx, workflow).await {
                    ItemEnd::Recorded(outcome) => {
                        log_item_outcome(&ctx, &outcome);
                        ledger.record(item.id.clone(), ordinal, outcome);
                    }
                    ItemEnd::Cancelled => {
                        info!("{ctx} cancellation honored mid-item, no outcome recorded");
                        cancelled = true;
                        break 'run;
                    }
                    ItemEnd::Abort(e) => {
                        error!("{ctx} session unrecoverable, aborting run: {e}");
                        abort = Some(e.into());
                        break 'run;
                    }
                }
            }

            self.finalize_batch(batch, workflow, &mut ledger).await;
            log_batch_complete(batch, &ledger);
        }

        log_run_complete(&ledger, cancelled, abort.is_some());
        RunReport {
            ledger,
            cancelled,
            abort,
        }
    }

    /// One item, end to end: guard check, initial attempt, and — only for a
    /// detected session loss — one recovery plus one retry of the same item.
    async fn attempt_item<W: ItemWorkflow>(
        &mut self,
        item: &WorkItem,
        ctx: &ItemCtx,
        workflow: &W,
    ) -> ItemEnd {
        match self.guard.ensure_alive(workflow as &dyn Rewind).await {
            Ok(Readiness::Ready) => {}
            Ok(Readiness::Recovered) => info!("{ctx} proceeding on recovered session"),
            Err(e) => return ItemEnd::Abort(e),
        }

        let first = self.drive_once(item, ctx, workflow).await;
        let first_error = match first {
            Ok(outcome) => return ItemEnd::Recorded(outcome),
            Err(e) if e.is_cancelled() => return ItemEnd::Cancelled,
            Err(e) => e,
        };

        if let Some(source) = first_error.session_source() {
            self.guard.mark_suspect(source);
        }
        if !self.guard.is_lost() {
            return ItemEnd::Recorded(Outcome::HardFailure(first_error.to_string()));
        }

        // Session loss: recover once, retry this item once.
        warn!("{ctx} session lost mid-item, recovering for a single retry");
        if let Err(e) = self.guard.ensure_alive(workflow as &dyn Rewind).await {
            return ItemEnd::Abort(e);
        }

        let retry_ctx = ctx.retry();
        match self.drive_once(item, &retry_ctx, workflow).await {
            Ok(outcome) => ItemEnd::Recorded(outcome),
            Err(e) if e.is_cancelled() => ItemEnd::Cancelled,
            Err(e) => {
                if let Some(source) = e.session_source() {
                    self.guard.mark_suspect(source);
                }
                ItemEnd::Recorded(Outcome::HardFailure(format!("retry failed: {e}")))
            }
        }
    }

    /// Drive the workflow once from stage 0 against the current session.
    async fn drive_once<W: ItemWorkflow>(
        &self,
        item: &WorkItem,
        ctx: &ItemCtx,
        workflow: &W,
    ) -> Result<Outcome, StageError> {
        let session = self
            .guard
            .session()
            .ok_or_else(|| StageError::Other("no live session".to_string()))?;

        let cx = StageCx {
            item,
            ctx,
            session,
            resolver: &self.resolver,
            cancel: &self.cancel,
            stage_timeout: self.config.stage_timeout(),
            poll_interval: self.config.poll_interval(),
        };
        drive(workflow, &cx).await
    }

    /// Batch-boundary hook. A failure here is a batch-level note; a
    /// session-loss failure additionally marks the session suspect so the
    /// next item triggers normal recovery.
    async fn finalize_batch<W: ItemWorkflow>(
        &mut self,
        batch: &Batch<'_>,
        workflow: &W,
        ledger: &mut ResultLedger,
    ) {
        let mut failure: Option<StageError> = None;
        if let Some(session) = self.guard.session() {
            let cx = BatchCx {
                batch_number: batch.number,
                items: batch.items,
                session,
                resolver: &self.resolver,
                cancel: &self.cancel,
            };
            if let Err(e) = workflow.finalize_batch(&cx).await {
                failure = Some(e);
            }
        }

        if let Some(e) = failure {
            warn!("batch {} finalize failed: {e}", batch.number);
            if let Some(source) = e.session_source() {
                self.guard.mark_suspect(source);
            }
            ledger.record_batch_note(batch.number, e.to_string());
        }
    }
}

// ========== log helpers ==========

fn log_run_start(total: usize, batches: usize, max_batch_size: usize) {
    info!("{}", "=".repeat(60));
    info!("run started: {total} items in {batches} batches (max {max_batch_size} per batch)");
    info!("{}", "=".repeat(60));
}

fn log_batch_start(batch: &Batch<'_>, total: usize) {
    info!(
        "batch {} started: items {}-{} of {}",
        batch.number,
        batch.start + 1,
        batch.start + batch.items.len(),
        total
    );
}

fn log_item_outcome(ctx: &ItemCtx, outcome: &Outcome) {
    match outcome {
        Outcome::Success => info!("{ctx} ✓ {}", outcome.label()),
        Outcome::SoftFailure(reason) => info!("{ctx} ⚠️ {}: {reason}", outcome.label()),
        Outcome::HardFailure(reason) => warn!("{ctx} ⚠️ {}: {reason}", outcome.label()),
    }
}

fn log_batch_complete(batch: &Batch<'_>, ledger: &ResultLedger) {
    let summary = ledger.summary();
    info!(
        "batch {} complete: {} recorded so far ({} success, {} soft, {} hard)",
        batch.number,
        ledger.entries().len(),
        summary.success,
        summary.soft_failure,
        summary.hard_failure
    );
}

fn log_run_complete(ledger: &ResultLedger, cancelled: bool, aborted: bool) {
    let summary = ledger.summary();
    info!("{}", "=".repeat(60));
    if aborted {
        error!("run aborted early");
    } else if cancelled {
        info!("run cancelled by operator");
    } else {
        info!("run complete");
    }
    info!(
        "✓ success {} | soft {} | hard {} | not attempted {} | total {}",
        summary.success,
        summary.soft_failure,
        summary.hard_failure,
        summary.not_attempted,
        summary.total
    );
    info!("{}", "=".repeat(60));
}
