//! Element resolver.
//!
//! Resolves a logical target to a concrete element by trying the target's
//! declared strategies in order, each with bounded polling. The first
//! strategy to find exactly one interactable element wins; `NotFound` is
//! only reported after every strategy has timed out.
//!
//! The resolver is read-only against the session and keeps no state between
//! calls.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::StageError;
use crate::session::{ElementHandle, InteractiveSession, Target};
use crate::wait::{poll_until, CancelFlag};

#[derive(Clone, Debug)]
pub struct Resolver {
    poll_interval: Duration,
    default_timeout: Duration,
}

impl Resolver {
    pub fn new(poll_interval: Duration, default_timeout: Duration) -> Self {
        Self {
            poll_interval,
            default_timeout,
        }
    }

    /// Resolve with the configured default per-strategy timeout.
    pub async fn resolve(
        &self,
        session: &dyn InteractiveSession,
        target: &Target,
        cancel: &CancelFlag,
    ) -> Result<ElementHandle, StageError> {
        self.resolve_with_timeout(session, target, self.default_timeout, cancel)
            .await
    }

    /// Resolve `target`, giving each strategy up to `timeout` of polling.
    pub async fn resolve_with_timeout(
        &self,
        session: &dyn InteractiveSession,
        target: &Target,
        timeout: Duration,
        cancel: &CancelFlag,
    ) -> Result<ElementHandle, StageError> {
        if target.strategies.is_empty() {
            return Err(StageError::Other(format!(
                "target {} declares no resolution strategies",
                target.name
            )));
        }

        for strategy in &target.strategies {
            debug!(
                target_name = %target.name,
                strategy = strategy.name(),
                "trying resolution strategy"
            );

            let what = format!("{} ({})", target.name, strategy.name());
            let attempt = poll_until(&what, timeout, self.poll_interval, cancel, move || {
                let strategy = strategy.clone();
                async move { session.locate(&strategy).await }
            })
            .await;

            match attempt {
                Ok(element) => {
                    debug!(
                        target_name = %target.name,
                        strategy = strategy.name(),
                        locator = %element.locator,
                        "resolved element"
                    );
                    return Ok(element);
                }
                // This strategy exhausted its budget; fall through to the
                // next one in the chain.
                Err(StageError::Timeout { .. }) => {
                    warn!(
                        target_name = %target.name,
                        strategy = strategy.name(),
                        "strategy timed out, falling back"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Err(StageError::NotFound {
            target: target.name.clone(),
            strategies: target.strategies.len(),
            timeout,
        })
    }
}
