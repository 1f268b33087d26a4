//! Stage machine vocabulary and the per-use-case workflow trait.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, StageError};
use crate::resolver::Resolver;
use crate::session::{Action, ElementHandle, InteractiveSession, Rewind, Target};
use crate::wait::{poll_until, CancelFlag};
use crate::workflow::item::{ItemCtx, WorkItem};

/// Identifier of one workflow stage. Stage 0 is always the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId(pub u8);

impl StageId {
    pub const START: StageId = StageId(0);
}

impl Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Terminal classification of one attempted item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    /// Business-level non-match ("no results found"); recorded, never
    /// escalated.
    SoftFailure(String),
    /// Execution error after retries were exhausted or ruled out.
    HardFailure(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::SoftFailure(_) => "soft-failure",
            Outcome::HardFailure(_) => "hard-failure",
        }
    }
}

/// What one stage handler decided.
#[derive(Debug)]
pub enum StageResult {
    /// Advance to the given stage.
    Continue(StageId),
    /// This item is done, with the given outcome.
    Done(Outcome),
    /// This stage failed; the driver ends the item, the orchestrator
    /// classifies (session loss vs. ordinary hard failure).
    Fail(StageError),
}

impl From<Result<StageResult, StageError>> for StageResult {
    fn from(result: Result<StageResult, StageError>) -> Self {
        result.unwrap_or_else(StageResult::Fail)
    }
}

/// Everything a stage handler may touch: the item, the borrowed session and
/// the bounded-wait helpers. Handlers hold nothing across calls.
pub struct StageCx<'a> {
    pub item: &'a WorkItem,
    pub ctx: &'a ItemCtx,
    pub session: &'a dyn InteractiveSession,
    pub resolver: &'a Resolver,
    pub cancel: &'a CancelFlag,
    pub stage_timeout: Duration,
    pub poll_interval: Duration,
}

impl<'a> StageCx<'a> {
    /// Resolve a logical target through the fallback chain.
    pub async fn resolve(&self, target: &Target) -> Result<ElementHandle, StageError> {
        self.resolver.resolve(self.session, target, self.cancel).await
    }

    /// Resolve and click in one go.
    pub async fn click(&self, target: &Target) -> Result<(), StageError> {
        let element = self.resolve(target).await?;
        self.act(&element, &Action::Click).await?;
        Ok(())
    }

    /// Resolve and type into in one go.
    pub async fn type_into(&self, target: &Target, text: &str) -> Result<(), StageError> {
        let element = self.resolve(target).await?;
        self.act(&element, &Action::Type(text.to_string())).await?;
        Ok(())
    }

    /// Resolve and read the element's value.
    pub async fn read(&self, target: &Target) -> Result<String, StageError> {
        let element = self.resolve(target).await?;
        let value = self.act(&element, &Action::Read).await?;
        Ok(value.unwrap_or_default())
    }

    pub async fn act(
        &self,
        element: &ElementHandle,
        action: &Action,
    ) -> Result<Option<String>, StageError> {
        self.session
            .act(element, action)
            .await
            .map_err(|source| StageError::session(format!("act on {}", element.target), source))
    }

    /// Bounded in-stage wait. The probe is polled at the configured interval
    /// until it yields a value or the stage timeout elapses; the cancel flag
    /// is honored within one interval.
    pub async fn wait_for<T, F, Fut>(&self, what: &str, probe: F) -> Result<T, StageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, SessionError>>,
    {
        poll_until(what, self.stage_timeout, self.poll_interval, self.cancel, probe).await
    }
}

/// Batch-boundary context for the optional finalize hook.
pub struct BatchCx<'a> {
    pub batch_number: usize,
    pub items: &'a [WorkItem],
    pub session: &'a dyn InteractiveSession,
    pub resolver: &'a Resolver,
    pub cancel: &'a CancelFlag,
}

/// One use case's item workflow: an ordered set of stage handlers driven
/// uniformly by [`crate::workflow::drive`].
///
/// The `Rewind` supertrait returns a recovered session to the screen stage 0
/// expects; the guard invokes it after every recovery.
#[async_trait]
pub trait ItemWorkflow: Rewind {
    /// Execute one stage for one item. Business branching (which stage next,
    /// which outcome) lives entirely in here.
    async fn run_stage(&self, stage: StageId, cx: &StageCx<'_>) -> StageResult;

    /// Optional action once every item of a batch has been attempted
    /// (e.g. submit the sub-batch downstream). Failures are recorded at
    /// batch granularity and never rewrite item outcomes.
    async fn finalize_batch(&self, _cx: &BatchCx<'_>) -> Result<(), StageError> {
        Ok(())
    }
}
