//! Bounded poll-with-timeout primitive.
//!
//! Every wait in the crate (element resolution, in-stage waits) goes through
//! [`poll_until`]: a monotonic deadline, a fixed polling interval and a
//! cancellation check per iteration. There are no bare sleeps anywhere else.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::{SessionError, StageError};

/// Cooperative cancellation flag for one run.
///
/// The orchestrator owns it; the result consumer holds a clone and raises it
/// to stop the run. Checked before every item and on every polling
/// iteration, so a request is honored within one interval.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Polls `probe` every `interval` until it yields a value, `timeout` elapses
/// or `cancel` is raised.
///
/// `probe` returns `Ok(Some(value))` when the condition holds, `Ok(None)` to
/// keep waiting; session errors propagate immediately as
/// [`StageError::Session`] so the caller can report them to the guard.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    cancel: &CancelFlag,
    mut probe: F,
) -> Result<T, StageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, SessionError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_set() {
            return Err(StageError::Cancelled(what.to_string()));
        }

        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(source) => return Err(StageError::session(what.to_string(), source)),
        }

        if Instant::now() + interval > deadline {
            return Err(StageError::Timeout {
                what: what.to_string(),
                waited: timeout,
            });
        }
        sleep(interval).await;
    }
}
