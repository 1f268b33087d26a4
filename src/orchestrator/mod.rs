//! Orchestration layer.
//!
//! ## Responsibilities
//!
//! The control center of a run: chunk the input into bounded batches, drive
//! every item through its workflow against the guarded session, contain
//! per-item failures, honor cancellation, and hand each outcome to the
//! ledger.
//!
//! ## Layering
//!
//! ```text
//! orchestrator::BatchRunner   (Vec<WorkItem> → ResultLedger)
//!     ↓
//! workflow::drive             (one WorkItem through its stages)
//!     ↓
//! resolver / wait             (bounded element + condition waits)
//!     ↓
//! session (via guard)         (click / type / read on the remote console)
//! ```
//!
//! ## Rules
//!
//! 1. Items and batches run strictly in input order, sequentially — the
//!    remote session has no concurrent contexts.
//! 2. A single item's failure never aborts the batch or the run.
//! 3. Each item is driven from stage 0 at most twice per run: the initial
//!    attempt plus one retry after a recovered session loss.
//! 4. Only an unrecoverable session (or invalid configuration) escapes as a
//!    run-level failure; outcomes recorded so far are always returned.

pub mod batch_runner;
pub mod batching;

pub use batch_runner::{BatchRunner, RunAbort, RunReport};
pub use batching::{chunk_batches, Batch};
