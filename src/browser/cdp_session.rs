//! CDP-backed implementation of the interactive session contract.
//!
//! Every primitive is a script evaluation against the attached page; the
//! console is a script-rendered SPA and the devtools protocol is the only
//! stable surface it offers. Located elements are tagged with a data
//! attribute so the handle stays valid across re-renders of the same node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::browser::connection::connect_to_browser_and_page;
use crate::error::{SessionError, StageError};
use crate::session::{
    Action, Credentials, ElementHandle, InteractiveSession, SessionConnector, Strategy,
};
use crate::wait::{poll_until, CancelFlag};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(20);
const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Selectors of the console's login screen plus a marker that only exists
/// once a session is established.
#[derive(Clone, Debug)]
pub struct LoginForm {
    pub username_field: String,
    pub password_field: String,
    pub submit_button: String,
    pub ready_marker: String,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username_field: "input[name='username']".to_string(),
            password_field: "input[name='password']".to_string(),
            submit_button: "button[type='submit']".to_string(),
            ready_marker: ".main-toolbar".to_string(),
        }
    }
}

/// Live session against the lab console, owned by the guard.
pub struct CdpSession {
    _browser: Browser,
    page: Page,
    login: LoginForm,
    tag_counter: AtomicU64,
}

impl CdpSession {
    pub fn new(browser: Browser, page: Page, login: LoginForm) -> Self {
        Self {
            _browser: browser,
            page,
            login,
            tag_counter: AtomicU64::new(0),
        }
    }

    async fn eval(&self, js: String) -> Result<JsonValue, SessionError> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(classify_cdp_error)?;
        result.into_value().map_err(|e| SessionError::ActionFailed {
            detail: "evaluation result was not deserializable".to_string(),
            source: Some(Box::new(e)),
        })
    }

    /// Script for one strategy. Each script yields the CSS locator of the
    /// single interactable match, or null.
    fn locate_script(&self, strategy: &Strategy) -> Result<String, SessionError> {
        let tag = self.tag_counter.fetch_add(1, Ordering::Relaxed);
        let script = match strategy {
            Strategy::ById(selector) => format!(
                r#"
                (() => {{
                    const found = document.querySelectorAll({sel});
                    if (found.length !== 1) return null;
                    if (found[0].offsetParent === null) return null;
                    return {sel};
                }})()
                "#,
                sel = js_string(selector)?
            ),
            Strategy::ByText(text) => format!(
                r#"
                (() => {{
                    const wanted = {text};
                    const matches = [];
                    for (const el of document.querySelectorAll('*')) {{
                        if (el.children.length === 0 &&
                            el.textContent.trim() === wanted &&
                            el.offsetParent !== null) {{
                            matches.push(el);
                        }}
                    }}
                    if (matches.length !== 1) return null;
                    matches[0].setAttribute('data-labrunner', '{tag}');
                    return "[data-labrunner='{tag}']";
                }})()
                "#,
                text = js_string(text)?
            ),
            Strategy::ByAnchor { anchor, relative } => format!(
                r#"
                (() => {{
                    const anchor = document.querySelector({anchor});
                    if (!anchor) return null;
                    const found = anchor.querySelectorAll({rel});
                    if (found.length !== 1) return null;
                    if (found[0].offsetParent === null) return null;
                    found[0].setAttribute('data-labrunner', '{tag}');
                    return "[data-labrunner='{tag}']";
                }})()
                "#,
                anchor = js_string(anchor)?,
                rel = js_string(relative)?
            ),
        };
        Ok(script)
    }

    async fn marker_present(&self, selector: &str) -> Result<bool, SessionError> {
        let js = format!(
            "document.querySelector({}) !== null",
            js_string(selector)?
        );
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl InteractiveSession for CdpSession {
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), SessionError> {
        if self.marker_present(&self.login.ready_marker).await? {
            debug!("already authenticated, login skipped");
            return Ok(());
        }

        info!("authenticating as {}", credentials.username);
        let js = format!(
            r#"
            (() => {{
                const user = document.querySelector({user_sel});
                const pass = document.querySelector({pass_sel});
                const submit = document.querySelector({submit_sel});
                if (!user || !pass || !submit) return false;
                const set = (el, value) => {{
                    el.value = value;
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                }};
                set(user, {username});
                set(pass, {password});
                submit.click();
                return true;
            }})()
            "#,
            user_sel = js_string(&self.login.username_field)?,
            pass_sel = js_string(&self.login.password_field)?,
            submit_sel = js_string(&self.login.submit_button)?,
            username = js_string(&credentials.username)?,
            password = js_string(&credentials.password)?,
        );

        if !self.eval(js).await?.as_bool().unwrap_or(false) {
            return Err(SessionError::action_failed("login form not found"));
        }

        let user = credentials.username.clone();
        let cancel = CancelFlag::new();
        poll_until(
            "login confirmation",
            LOGIN_TIMEOUT,
            LOGIN_POLL_INTERVAL,
            &cancel,
            move || {
                let session = self;
                async move {
                    Ok(session
                        .marker_present(&session.login.ready_marker)
                        .await?
                        .then_some(()))
                }
            },
        )
        .await
        .map_err(|e| match e {
            StageError::Session { source, .. } => source,
            _ => SessionError::AuthenticationRejected { user },
        })?;

        info!("✓ authenticated");
        Ok(())
    }

    async fn locate(&self, strategy: &Strategy) -> Result<Option<ElementHandle>, SessionError> {
        let script = self.locate_script(strategy)?;
        let locator = self.eval(script).await?;
        Ok(locator.as_str().map(|locator| ElementHandle {
            target: strategy.name().to_string(),
            locator: locator.to_string(),
        }))
    }

    async fn act(
        &self,
        element: &ElementHandle,
        action: &Action,
    ) -> Result<Option<String>, SessionError> {
        let locator = js_string(&element.locator)?;
        let js = match action {
            Action::Click => format!(
                r#"
                (() => {{
                    const el = document.querySelector({locator});
                    if (!el) return null;
                    el.click();
                    return true;
                }})()
                "#
            ),
            Action::Type(text) => format!(
                r#"
                (() => {{
                    const el = document.querySelector({locator});
                    if (!el) return null;
                    el.focus();
                    el.value = {text};
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()
                "#,
                text = js_string(text)?
            ),
            Action::Read => format!(
                r#"
                (() => {{
                    const el = document.querySelector({locator});
                    if (!el) return null;
                    return el.value !== undefined && el.value !== ''
                        ? el.value
                        : el.textContent.trim();
                }})()
                "#
            ),
        };

        match self.eval(js).await? {
            JsonValue::Null => Err(SessionError::action_failed(format!(
                "element vanished before {action:?}: {}",
                element.locator
            ))),
            JsonValue::String(text) => Ok(Some(text)),
            _ => Ok(None),
        }
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::navigation_failed(url, e))
    }

    async fn current_context(&self) -> Result<String, SessionError> {
        let js = "window.location.hash || window.location.pathname".to_string();
        Ok(self
            .eval(js)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn close(&self) -> Result<(), SessionError> {
        // Attached over devtools; dropping the handles detaches. The
        // operator's browser stays open.
        debug!("detaching from browser");
        Ok(())
    }
}

/// Opens CDP sessions against the configured devtools port.
pub struct CdpConnector {
    port: u16,
    login: LoginForm,
}

impl CdpConnector {
    pub fn new(port: u16, login: LoginForm) -> Self {
        Self { port, login }
    }
}

#[async_trait]
impl SessionConnector for CdpConnector {
    async fn open(&self, entry_point: &str) -> Result<Box<dyn InteractiveSession>, SessionError> {
        let (browser, page) =
            connect_to_browser_and_page(self.port, Some(entry_point), None).await?;
        Ok(Box::new(CdpSession::new(browser, page, self.login.clone())))
    }
}

/// Map CDP failures onto the session error taxonomy. Only the signatures
/// that mean "this session is gone" become [`SessionError::Invalid`].
fn classify_cdp_error(error: CdpError) -> SessionError {
    let text = error.to_string();
    let lost = text.contains("Session with given id not found")
        || text.contains("Target closed")
        || text.contains("Connection is closed")
        || text.contains("websocket");
    if lost {
        SessionError::Invalid { detail: text }
    } else {
        SessionError::ActionFailed {
            detail: text,
            source: Some(Box::new(error)),
        }
    }
}

fn js_string(value: &str) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| SessionError::ActionFailed {
        detail: "could not encode script argument".to_string(),
        source: Some(Box::new(e)),
    })
}
