//! Fallback-chain behavior of the element resolver.

use std::time::Duration;

use async_trait::async_trait;
use labrunner::error::{SessionError, StageError};
use labrunner::session::{
    Action, Credentials, ElementHandle, InteractiveSession, Strategy, Target,
};
use labrunner::{CancelFlag, Resolver};

/// Session whose locate answers are fixed per strategy kind.
struct SelectiveSession {
    by_id_found: bool,
    by_text_found: bool,
    error: Option<fn() -> SessionError>,
}

impl SelectiveSession {
    fn found(strategy: &Strategy) -> ElementHandle {
        ElementHandle {
            target: strategy.name().to_string(),
            locator: "#resolved".to_string(),
        }
    }
}

#[async_trait]
impl InteractiveSession for SelectiveSession {
    async fn authenticate(&self, _: &Credentials) -> Result<(), SessionError> {
        Ok(())
    }

    async fn locate(&self, strategy: &Strategy) -> Result<Option<ElementHandle>, SessionError> {
        if let Some(make_error) = self.error {
            return Err(make_error());
        }
        let found = match strategy {
            Strategy::ById(_) => self.by_id_found,
            Strategy::ByText(_) => self.by_text_found,
            Strategy::ByAnchor { .. } => false,
        };
        Ok(found.then(|| Self::found(strategy)))
    }

    async fn act(&self, _: &ElementHandle, _: &Action) -> Result<Option<String>, SessionError> {
        Ok(None)
    }

    async fn navigate(&self, _: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn current_context(&self) -> Result<String, SessionError> {
        Ok(String::new())
    }

    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

fn resolver() -> Resolver {
    Resolver::new(Duration::from_millis(100), Duration::from_secs(2))
}

fn submit_target() -> Target {
    Target::new("submit control")
        .by_id("#submit")
        .by_text("Submit")
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_the_next_strategy_after_a_timeout() {
    let session = SelectiveSession {
        by_id_found: false,
        by_text_found: true,
        error: None,
    };

    let element = resolver()
        .resolve(&session, &submit_target(), &CancelFlag::new())
        .await
        .expect("second strategy should win");
    assert_eq!(element.target, "by-text");
}

#[tokio::test(start_paused = true)]
async fn the_first_successful_strategy_wins() {
    let session = SelectiveSession {
        by_id_found: true,
        by_text_found: true,
        error: None,
    };

    let element = resolver()
        .resolve(&session, &submit_target(), &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(element.target, "by-id");
}

#[tokio::test(start_paused = true)]
async fn not_found_only_after_every_strategy_timed_out() {
    let session = SelectiveSession {
        by_id_found: false,
        by_text_found: false,
        error: None,
    };

    let result = resolver()
        .resolve(&session, &submit_target(), &CancelFlag::new())
        .await;
    match result {
        Err(StageError::NotFound {
            target, strategies, ..
        }) => {
            assert_eq!(target, "submit control");
            assert_eq!(strategies, 2);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn session_loss_during_resolution_propagates_immediately() {
    let session = SelectiveSession {
        by_id_found: false,
        by_text_found: false,
        error: Some(|| SessionError::invalid("session expired")),
    };

    let result = resolver()
        .resolve(&session, &submit_target(), &CancelFlag::new())
        .await;
    match result {
        Err(e) => assert!(e.is_session_loss()),
        Ok(_) => panic!("expected a session error"),
    }
}

#[tokio::test(start_paused = true)]
async fn a_target_without_strategies_is_a_usage_error() {
    let session = SelectiveSession {
        by_id_found: true,
        by_text_found: true,
        error: None,
    };

    let result = resolver()
        .resolve(&session, &Target::new("empty"), &CancelFlag::new())
        .await;
    assert!(matches!(result, Err(StageError::Other(_))));
}
