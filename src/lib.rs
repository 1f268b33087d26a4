//! # labrunner
//!
//! Resilient batch automation core for a laboratory management web console:
//! "process N items against a remote interactive system" without letting
//! late-rendering elements, silently dying sessions or single-item failures
//! take down the whole run.
//!
//! ## Architecture
//!
//! Strict layering, bottom up:
//!
//! ### ① Infrastructure
//! - `session/` - collaborator traits for the remote interactive session;
//!   the core only ever calls these
//! - `browser/` - the chromiumoxide-backed session, the sole owner of the
//!   scarce page resource
//!
//! ### ② Capabilities
//! - `wait` - the single bounded poll-with-timeout primitive
//! - `resolver` - logical target → element, through a declared strategy
//!   fallback chain
//! - `guard` - session health, session-loss classification, single-shot
//!   recovery (reconnect → authenticate → rewind)
//!
//! ### ③ Workflow
//! - `workflow/` - per-item stage machine: the `ItemWorkflow` trait each use
//!   case implements, plus the uniform driver
//!
//! ### ④ Orchestration
//! - `orchestrator/` - batch chunking and the run loop: cancellation,
//!   retry-once-on-session-loss, batch finalize
//! - `ledger` - append-only outcome ledger, summary and operator report
//!
//! ## Guarantees
//!
//! - Items are processed strictly in input order; the ledger mirrors it.
//! - Each item is driven from stage 0 at most twice per run.
//! - A single item's failure never aborts the batch or the run; only an
//!   unrecoverable session does, and even then the partial ledger is
//!   returned.
//! - Cancellation is honored within one polling interval.

pub mod browser;
pub mod config;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod utils;
pub mod wait;
pub mod workflow;

pub use config::Config;
pub use error::{ConfigError, GuardError, SessionError, StageError};
pub use guard::{Readiness, SessionGuard};
pub use ledger::{ResultLedger, RunSummary};
pub use orchestrator::{BatchRunner, RunAbort, RunReport};
pub use resolver::Resolver;
pub use session::{
    Action, Credentials, ElementHandle, InteractiveSession, Rewind, SessionConnector, Strategy,
    Target,
};
pub use wait::{poll_until, CancelFlag};
pub use workflow::{
    drive, BatchCx, ItemCtx, ItemWorkflow, Outcome, StageCx, StageId, StageResult, WorkItem,
};
