//! Error types for the batch automation core.
//!
//! Errors are grouped per concern, the way the rest of the crate is layered:
//!
//! - [`SessionError`] — anything reported by the interactive session
//!   (the remote web console), including the distinguishable session-loss
//!   signature the guard recovers from.
//! - [`StageError`] — a failed step inside one item's workflow; contained at
//!   item level by the orchestrator, never fatal to the batch.
//! - [`GuardError`] — a failed session recovery; fatal to the run.
//! - [`ConfigError`] — rejected configuration values.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by an interactive session backend.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session-loss signature: the remote side no longer recognizes this
    /// session. Only this variant makes the guard flip the session to `Lost`.
    #[error("session invalid: {detail}")]
    Invalid { detail: String },

    /// Connecting to the backend failed.
    #[error("connection failed (port {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Navigation to a URL failed.
    #[error("navigation to {url} failed: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The remote side rejected the supplied credentials.
    #[error("authentication rejected for user {user}")]
    AuthenticationRejected { user: String },

    /// A script or action against the page failed for a non-session reason.
    #[error("action failed: {detail}")]
    ActionFailed {
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SessionError {
    /// Session-loss signature check. Everything else is an ordinary
    /// transient error and must not trigger recovery.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, SessionError::Invalid { .. })
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        SessionError::Invalid {
            detail: detail.into(),
        }
    }

    pub fn action_failed(detail: impl Into<String>) -> Self {
        SessionError::ActionFailed {
            detail: detail.into(),
            source: None,
        }
    }

    pub fn connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SessionError::ConnectionFailed {
            port,
            source: Box::new(source),
        }
    }

    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SessionError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

/// A failed step inside one item's workflow.
///
/// The orchestrator converts these into per-item outcomes; they never abort
/// the batch. Only the session-loss classification matters to the driver,
/// exposed through [`StageError::is_session_loss`].
#[derive(Debug, Error)]
pub enum StageError {
    /// The cooperative cancellation flag was raised during a wait.
    #[error("cancelled while {0}")]
    Cancelled(String),

    /// A bounded wait elapsed without the condition holding.
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// Every resolution strategy for a logical target timed out.
    #[error("element not found: {target} ({strategies} strategies tried, {timeout:?} each)")]
    NotFound {
        target: String,
        strategies: usize,
        timeout: Duration,
    },

    /// The session reported an error while executing this stage.
    #[error("session error during {context}: {source}")]
    Session {
        context: String,
        #[source]
        source: SessionError,
    },

    /// Business-level stage failure with no underlying session error.
    #[error("{0}")]
    Other(String),
}

impl StageError {
    pub fn session(context: impl Into<String>, source: SessionError) -> Self {
        StageError::Session {
            context: context.into(),
            source,
        }
    }

    /// The underlying session error, when there is one.
    pub fn session_source(&self) -> Option<&SessionError> {
        match self {
            StageError::Session { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_session_loss(&self) -> bool {
        self.session_source()
            .map(SessionError::is_session_loss)
            .unwrap_or(false)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageError::Cancelled(_))
    }
}

/// A failed session recovery. Fatal to the run: a session that cannot
/// re-authenticate will not recover on its own.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("reconnect failed: {source}")]
    ReconnectFailed {
        #[source]
        source: SessionError,
    },

    #[error("re-authentication failed: {source}")]
    AuthenticationFailed {
        #[source]
        source: SessionError,
    },

    #[error("workflow rewind failed: {source}")]
    RewindFailed {
        #[source]
        source: SessionError,
    },
}

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_counts_as_session_loss() {
        assert!(SessionError::invalid("expired").is_session_loss());
        assert!(!SessionError::action_failed("click missed").is_session_loss());
    }

    #[test]
    fn stage_error_classifies_through_source() {
        let lost = StageError::session("submit", SessionError::invalid("expired"));
        assert!(lost.is_session_loss());

        let plain = StageError::session("submit", SessionError::action_failed("boom"));
        assert!(!plain.is_session_loss());
        assert!(!StageError::Other("no match".into()).is_session_loss());
    }
}
