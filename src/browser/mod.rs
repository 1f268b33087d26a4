//! Chromium-backed session (infrastructure layer).
//!
//! The one concrete [`crate::session::InteractiveSession`] backend: attaches
//! to an already running browser over the devtools port and drives the lab
//! console through script evaluation. Holds the scarce resources (browser,
//! page) and exposes only the action primitives; it knows nothing about
//! items, stages or batches.

pub mod cdp_session;
pub mod connection;

pub use cdp_session::{CdpConnector, CdpSession, LoginForm};
pub use connection::connect_to_browser_and_page;
