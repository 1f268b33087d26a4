//! Interactive session boundary.
//!
//! The remote web console is an external collaborator: the core only ever
//! talks to it through the capability traits in this module and never learns
//! what is behind them. The one concrete backend ships in [`crate::browser`];
//! tests script their own.
//!
//! Resource rule: exactly one owner per live session (the
//! [`crate::guard::SessionGuard`]), everyone else borrows per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// One way of locating a logical target in the remote interface.
///
/// Strategies are declared per target in fallback order; the resolver tries
/// them one at a time. The same control is labelled inconsistently across
/// screens of the console, so a single selector is never trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Stable identifier (CSS selector).
    ById(String),
    /// Exact visible text of the element.
    ByText(String),
    /// Relative position to a known anchor: `relative` resolved within the
    /// subtree of `anchor`.
    ByAnchor { anchor: String, relative: String },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ById(_) => "by-id",
            Strategy::ByText(_) => "by-text",
            Strategy::ByAnchor { .. } => "by-anchor",
        }
    }
}

/// A logical target plus its declared fallback chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Human-readable name, used in logs and error detail only.
    pub name: String,
    pub strategies: Vec<Strategy>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
        }
    }

    pub fn by_id(mut self, selector: impl Into<String>) -> Self {
        self.strategies.push(Strategy::ById(selector.into()));
        self
    }

    pub fn by_text(mut self, text: impl Into<String>) -> Self {
        self.strategies.push(Strategy::ByText(text.into()));
        self
    }

    pub fn by_anchor(mut self, anchor: impl Into<String>, relative: impl Into<String>) -> Self {
        self.strategies.push(Strategy::ByAnchor {
            anchor: anchor.into(),
            relative: relative.into(),
        });
        self
    }
}

/// A resolved element.
///
/// `locator` is whatever backend-specific address the winning strategy
/// produced; the core treats it as opaque and only hands it back to
/// [`InteractiveSession::act`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementHandle {
    pub target: String,
    pub locator: String,
}

/// Primitive actions the core may perform on a resolved element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Click,
    /// Clear the element and type the given text.
    Type(String),
    /// Read the element's value or text content.
    Read,
}

/// Operator account used for (re-)authentication.
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Action primitive layer of a live remote session.
///
/// Contract notes:
/// - `locate` returns `Ok(None)` for "not there (yet)"; `Err` is reserved
///   for real failures. A strategy must only match when it finds exactly one
///   interactable element.
/// - A dead session surfaces as [`SessionError::Invalid`] from any method;
///   callers report it to the guard, nobody recovers in place.
#[async_trait]
pub trait InteractiveSession: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), SessionError>;

    async fn locate(&self, strategy: &Strategy) -> Result<Option<ElementHandle>, SessionError>;

    /// Perform `action` on `element`. `Read` returns the text read,
    /// everything else returns `None`.
    async fn act(
        &self,
        element: &ElementHandle,
        action: &Action,
    ) -> Result<Option<String>, SessionError>;

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Identifier of the screen the session is currently on.
    async fn current_context(&self) -> Result<String, SessionError>;

    async fn close(&self) -> Result<(), SessionError>;
}

/// Opens fresh sessions. The guard calls this once at startup and once per
/// recovery; nothing else creates sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn open(&self, entry_point: &str) -> Result<Box<dyn InteractiveSession>, SessionError>;
}

/// Returns a session to the canonical entry screen a workflow expects at its
/// first stage. Supplied by the workflow, invoked by the guard after every
/// recovery.
#[async_trait]
pub trait Rewind: Send + Sync {
    async fn rewind(&self, session: &dyn InteractiveSession) -> Result<(), SessionError>;
}
