//! Item workflow layer.
//!
//! ## Responsibilities
//!
//! Defines what it means to process one work item: the per-item data
//! ([`WorkItem`], [`ItemCtx`]), the stage machine vocabulary ([`StageId`],
//! [`StageResult`], [`Outcome`]), the [`ItemWorkflow`] trait each use case
//! implements, and the uniform [`drive`] loop that runs any such workflow.
//!
//! The stage handlers hold the page knowledge (which targets, which
//! actions); the driver holds none. Stages keep no state across items —
//! everything per-item lives in the [`WorkItem`] and stage-local variables.

pub mod driver;
pub mod item;
pub mod stage;

pub use driver::drive;
pub use item::{ItemCtx, WorkItem};
pub use stage::{BatchCx, ItemWorkflow, Outcome, StageCx, StageId, StageResult};
