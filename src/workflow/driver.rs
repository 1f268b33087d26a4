//! Uniform stage driver.
//!
//! Runs any [`ItemWorkflow`] for one item: start at stage 0, apply the
//! transition rule until the workflow reports the item done or a stage
//! fails. The driver knows nothing about business branches; it only walks
//! the machine.

use tracing::trace;

use crate::error::StageError;
use crate::workflow::stage::{ItemWorkflow, Outcome, StageCx, StageId, StageResult};

/// Upper bound on transitions per item. The trait cannot prove a workflow's
/// stage graph is acyclic, so a runaway machine fails the item instead of
/// hanging the batch.
const MAX_STAGE_STEPS: usize = 128;

/// Drive `workflow` for the item in `cx` from stage 0 to a terminal result.
///
/// Cancellation is checked before every stage; a run stopped mid-item
/// surfaces as [`StageError::Cancelled`] and records no outcome.
pub async fn drive(workflow: &dyn ItemWorkflow, cx: &StageCx<'_>) -> Result<Outcome, StageError> {
    let mut stage = StageId::START;

    for _ in 0..MAX_STAGE_STEPS {
        if cx.cancel.is_set() {
            return Err(StageError::Cancelled(format!(
                "{} before stage {stage}",
                cx.ctx
            )));
        }

        trace!("{} running stage {stage}", cx.ctx);
        match workflow.run_stage(stage, cx).await {
            StageResult::Continue(next) => {
                trace!("{} stage {stage} -> {next}", cx.ctx);
                stage = next;
            }
            StageResult::Done(outcome) => {
                trace!("{} stage {stage} terminal: {}", cx.ctx, outcome.label());
                return Ok(outcome);
            }
            StageResult::Fail(error) => return Err(error),
        }
    }

    Err(StageError::Other(format!(
        "{} exceeded {MAX_STAGE_STEPS} stage transitions, stage graph likely cyclic",
        cx.ctx
    )))
}
