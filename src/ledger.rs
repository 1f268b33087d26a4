//! Result ledger.
//!
//! Single point of truth for run outcomes: one appended record per attempted
//! item, in input order, plus batch-level notes from finalize hooks. The
//! summary and the rendered report are pure projections; items never reached
//! (cancellation, run abort) show up as `not_attempted`.

use serde::Serialize;

use crate::workflow::Outcome;

/// One recorded `(item, outcome)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub item_id: String,
    /// 1-based position in the original input list.
    pub ordinal: usize,
    pub outcome: Outcome,
}

/// A batch-boundary failure, recorded at batch granularity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchNote {
    pub batch_number: usize,
    pub detail: String,
}

/// Aggregate counts handed to the result consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub success: usize,
    pub soft_failure: usize,
    pub hard_failure: usize,
    pub not_attempted: usize,
    pub total: usize,
}

/// Append-only outcome ledger for one run.
#[derive(Clone, Debug, Default)]
pub struct ResultLedger {
    total: usize,
    entries: Vec<LedgerEntry>,
    batch_notes: Vec<BatchNote>,
}

impl ResultLedger {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            entries: Vec::new(),
            batch_notes: Vec::new(),
        }
    }

    /// Append one outcome. Invariant: called at most once per item per run,
    /// in input order; the orchestrator is the only caller.
    pub fn record(&mut self, item_id: impl Into<String>, ordinal: usize, outcome: Outcome) {
        debug_assert!(
            self.entries.last().map_or(true, |e| e.ordinal < ordinal),
            "ledger records must stay in input order"
        );
        self.entries.push(LedgerEntry {
            item_id: item_id.into(),
            ordinal,
            outcome,
        });
    }

    pub fn record_batch_note(&mut self, batch_number: usize, detail: impl Into<String>) {
        self.batch_notes.push(BatchNote {
            batch_number,
            detail: detail.into(),
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn batch_notes(&self) -> &[BatchNote] {
        &self.batch_notes
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.total,
            not_attempted: self.total.saturating_sub(self.entries.len()),
            ..RunSummary::default()
        };
        for entry in &self.entries {
            match entry.outcome {
                Outcome::Success => summary.success += 1,
                Outcome::SoftFailure(_) => summary.soft_failure += 1,
                Outcome::HardFailure(_) => summary.hard_failure += 1,
            }
        }
        summary
    }

    /// Deterministic operator report: successes, then soft failures, then
    /// hard failures with their detail, then batch notes. Input order within
    /// each group; no timestamps, so test output can be diffed.
    pub fn render(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();

        out.push_str("batch run report\n");
        out.push_str("================\n");

        out.push_str(&format!("successes ({}):\n", summary.success));
        for entry in &self.entries {
            if matches!(entry.outcome, Outcome::Success) {
                out.push_str(&format!("  {}. {}\n", entry.ordinal, entry.item_id));
            }
        }

        out.push_str(&format!("soft failures ({}):\n", summary.soft_failure));
        for entry in &self.entries {
            if let Outcome::SoftFailure(reason) = &entry.outcome {
                out.push_str(&format!(
                    "  {}. {} - {}\n",
                    entry.ordinal, entry.item_id, reason
                ));
            }
        }

        out.push_str(&format!("hard failures ({}):\n", summary.hard_failure));
        for entry in &self.entries {
            if let Outcome::HardFailure(reason) = &entry.outcome {
                out.push_str(&format!(
                    "  {}. {} - {}\n",
                    entry.ordinal, entry.item_id, reason
                ));
            }
        }

        if !self.batch_notes.is_empty() {
            out.push_str(&format!("batch notes ({}):\n", self.batch_notes.len()));
            for note in &self.batch_notes {
                out.push_str(&format!("  batch {} - {}\n", note.batch_number, note.detail));
            }
        }

        out.push_str(&format!("not attempted: {}\n", summary.not_attempted));
        out.push_str(&format!(
            "summary: success={} soft={} hard={} not_attempted={} total={}\n",
            summary.success,
            summary.soft_failure,
            summary.hard_failure,
            summary.not_attempted,
            summary.total
        ));
        out
    }
}
