//! Shared test doubles: a stub session backend and a scripted workflow.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use labrunner::error::{SessionError, StageError};
use labrunner::session::{
    Action, Credentials, ElementHandle, InteractiveSession, Rewind, SessionConnector, Strategy,
};
use labrunner::workflow::{BatchCx, ItemWorkflow, Outcome, StageCx, StageId, StageResult};

/// Session that answers every primitive successfully. Orchestrator tests
/// script behavior at the workflow level, not here.
pub struct StubSession;

#[async_trait]
impl InteractiveSession for StubSession {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<(), SessionError> {
        Ok(())
    }

    async fn locate(&self, strategy: &Strategy) -> Result<Option<ElementHandle>, SessionError> {
        Ok(Some(ElementHandle {
            target: strategy.name().to_string(),
            locator: "#stub".to_string(),
        }))
    }

    async fn act(
        &self,
        _element: &ElementHandle,
        action: &Action,
    ) -> Result<Option<String>, SessionError> {
        Ok(match action {
            Action::Read => Some("stub".to_string()),
            _ => None,
        })
    }

    async fn navigate(&self, _url: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn current_context(&self) -> Result<String, SessionError> {
        Ok("#/worklist".to_string())
    }

    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Connector that counts opens and can be told to start failing from the
/// n-th open (1-based), to simulate an unrecoverable session.
pub struct StubConnector {
    pub opens: Arc<AtomicUsize>,
    pub fail_from: Option<usize>,
}

impl StubConnector {
    pub fn reliable(opens: Arc<AtomicUsize>) -> Self {
        Self {
            opens,
            fail_from: None,
        }
    }

    pub fn failing_from(opens: Arc<AtomicUsize>, nth: usize) -> Self {
        Self {
            opens,
            fail_from: Some(nth),
        }
    }
}

#[async_trait]
impl SessionConnector for StubConnector {
    async fn open(&self, _entry_point: &str) -> Result<Box<dyn InteractiveSession>, SessionError> {
        let nth = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_from {
            Some(from) if nth >= from => Err(SessionError::action_failed("connect refused")),
            _ => Ok(Box::new(StubSession)),
        }
    }
}

/// One scripted behavior for one attempt at one item.
#[derive(Clone, Copy, Debug)]
pub enum Step {
    Succeed,
    Soft(&'static str),
    LoseSession,
    Fail(&'static str),
}

/// Two-stage workflow (S0 → S1) whose terminal behavior is scripted per
/// item and per attempt. Unscripted attempts succeed.
pub struct ScriptedWorkflow {
    steps: Mutex<HashMap<String, VecDeque<Step>>>,
    attempts: Mutex<HashMap<String, usize>>,
    pub rewinds: AtomicUsize,
    cancel_after: Option<String>,
    finalize_fail: Option<usize>,
}

impl ScriptedWorkflow {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            rewinds: AtomicUsize::new(0),
            cancel_after: None,
            finalize_fail: None,
        }
    }

    pub fn script(self, item_id: &str, steps: Vec<Step>) -> Self {
        self.steps
            .lock()
            .unwrap()
            .insert(item_id.to_string(), steps.into());
        self
    }

    /// Raise the run's cancel flag right after this item completes.
    pub fn cancel_after(mut self, item_id: &str) -> Self {
        self.cancel_after = Some(item_id.to_string());
        self
    }

    /// Make the finalize hook of the given batch number fail.
    pub fn finalize_fail(mut self, batch_number: usize) -> Self {
        self.finalize_fail = Some(batch_number);
        self
    }

    /// How many times this item was driven from stage 0.
    pub fn attempts_for(&self, item_id: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(item_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Rewind for ScriptedWorkflow {
    async fn rewind(&self, _session: &dyn InteractiveSession) -> Result<(), SessionError> {
        self.rewinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ItemWorkflow for ScriptedWorkflow {
    async fn run_stage(&self, stage: StageId, cx: &StageCx<'_>) -> StageResult {
        if stage == StageId::START {
            *self
                .attempts
                .lock()
                .unwrap()
                .entry(cx.item.id.clone())
                .or_insert(0) += 1;
            return StageResult::Continue(StageId(1));
        }

        let step = self
            .steps
            .lock()
            .unwrap()
            .get_mut(&cx.item.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Succeed);

        let result = match step {
            Step::Succeed => StageResult::Done(Outcome::Success),
            Step::Soft(reason) => StageResult::Done(Outcome::SoftFailure(reason.to_string())),
            Step::LoseSession => StageResult::Fail(StageError::session(
                "confirm submission",
                SessionError::invalid("session expired"),
            )),
            Step::Fail(reason) => StageResult::Fail(StageError::Other(reason.to_string())),
        };

        if matches!(result, StageResult::Done(_))
            && self.cancel_after.as_deref() == Some(cx.item.id.as_str())
        {
            cx.cancel.request();
        }
        result
    }

    async fn finalize_batch(&self, cx: &BatchCx<'_>) -> Result<(), StageError> {
        if self.finalize_fail == Some(cx.batch_number) {
            Err(StageError::Other("downstream submit rejected".to_string()))
        } else {
            Ok(())
        }
    }
}
