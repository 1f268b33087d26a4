//! Session guard.
//!
//! Sole owner of the live session. The orchestrator never inspects the
//! session's health itself; it asks the guard "is it usable" before each
//! item and reports suspicious errors back via [`SessionGuard::mark_suspect`].
//!
//! Recovery (close → reconnect → authenticate → rewind) runs at most once
//! per detected loss and is synchronous from the orchestrator's point of
//! view. A failed recovery is fatal to the run: a session that cannot
//! re-authenticate will not come back on its own.

use tracing::{debug, info, warn};

use crate::error::{GuardError, SessionError};
use crate::session::{Credentials, InteractiveSession, Rewind, SessionConnector};

/// Observable state of the owned session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Alive,
    Lost,
}

/// Result of a successful [`SessionGuard::ensure_alive`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Session was already usable; nothing happened.
    Ready,
    /// A full recovery ran; the session is back on the workflow's entry
    /// screen.
    Recovered,
}

pub struct SessionGuard {
    connector: Box<dyn SessionConnector>,
    credentials: Credentials,
    entry_point: String,
    session: Option<Box<dyn InteractiveSession>>,
    state: SessionState,
}

impl SessionGuard {
    /// The guard starts with no session; the first `ensure_alive` performs
    /// the initial connect through the same path as a recovery.
    pub fn new(
        connector: Box<dyn SessionConnector>,
        credentials: Credentials,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            credentials,
            entry_point: entry_point.into(),
            session: None,
            state: SessionState::Lost,
        }
    }

    pub fn is_lost(&self) -> bool {
        self.state == SessionState::Lost
    }

    /// Borrow the owned session. `None` only before the first successful
    /// `ensure_alive` or after a failed recovery.
    pub fn session(&self) -> Option<&dyn InteractiveSession> {
        self.session.as_deref()
    }

    /// Classify an observed error. Only the session-loss signature flips the
    /// session to `Lost`; ordinary transient errors are left alone.
    pub fn mark_suspect(&mut self, error: &SessionError) {
        if error.is_session_loss() {
            warn!("session-loss signature observed, marking session lost: {error}");
            self.state = SessionState::Lost;
        } else {
            debug!("transient error, session still considered alive: {error}");
        }
    }

    /// Make the session usable, recovering it if it was lost.
    pub async fn ensure_alive(&mut self, rewinder: &dyn Rewind) -> Result<Readiness, GuardError> {
        if self.state == SessionState::Alive && self.session.is_some() {
            return Ok(Readiness::Ready);
        }

        info!("session lost, starting recovery");
        self.recover(rewinder).await?;
        info!("session recovered and rewound to entry screen");
        Ok(Readiness::Recovered)
    }

    async fn recover(&mut self, rewinder: &dyn Rewind) -> Result<(), GuardError> {
        // The dead session's close result is irrelevant; resources go away
        // with the handle either way.
        if let Some(old) = self.session.take() {
            if let Err(e) = old.close().await {
                debug!("closing lost session failed: {e}");
            }
        }

        let session = self
            .connector
            .open(&self.entry_point)
            .await
            .map_err(|source| GuardError::ReconnectFailed { source })?;

        session
            .authenticate(&self.credentials)
            .await
            .map_err(|source| GuardError::AuthenticationFailed { source })?;

        rewinder
            .rewind(session.as_ref())
            .await
            .map_err(|source| GuardError::RewindFailed { source })?;

        self.session = Some(session);
        self.state = SessionState::Alive;
        Ok(())
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("state", &self.state)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}
