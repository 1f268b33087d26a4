use std::time::Duration;

use crate::error::ConfigError;

/// Runtime configuration.
///
/// Every field has a working default and can be overridden through the
/// environment, so the operator frontend only has to set what differs.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum items per sub-batch (remote system limit).
    pub max_batch_size: usize,
    /// Polling interval for element resolution and stage waits, in ms.
    pub poll_interval_ms: u64,
    /// Per-strategy element resolution timeout, in ms.
    pub resolve_timeout_ms: u64,
    /// Bound for any single in-stage wait, in ms.
    pub stage_timeout_ms: u64,
    /// Browser devtools debugging port.
    pub browser_debug_port: u16,
    /// Canonical entry screen of the workflow.
    pub entry_url: String,
    /// Operator account for (re-)authentication.
    pub username: String,
    pub password: String,
    /// Where the final run report is written.
    pub report_file: String,
    /// Whether to log per-stage detail.
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_batch_size: 99,
            poll_interval_ms: 250,
            resolve_timeout_ms: 10_000,
            stage_timeout_ms: 25_000,
            browser_debug_port: 9222,
            entry_url: "http://localhost/labsys/#/worklist".to_string(),
            username: String::new(),
            password: String::new(),
            report_file: "run_report.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_batch_size: env_parsed("MAX_BATCH_SIZE", default.max_batch_size),
            poll_interval_ms: env_parsed("POLL_INTERVAL_MS", default.poll_interval_ms),
            resolve_timeout_ms: env_parsed("RESOLVE_TIMEOUT_MS", default.resolve_timeout_ms),
            stage_timeout_ms: env_parsed("STAGE_TIMEOUT_MS", default.stage_timeout_ms),
            browser_debug_port: env_parsed("BROWSER_DEBUG_PORT", default.browser_debug_port),
            entry_url: std::env::var("ENTRY_URL").unwrap_or(default.entry_url),
            username: std::env::var("LAB_USERNAME").unwrap_or(default.username),
            password: std::env::var("LAB_PASSWORD").unwrap_or(default.password),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            verbose_logging: env_parsed("VERBOSE_LOGGING", default.verbose_logging),
        }
    }

    /// The core only insists on positive sizes and timeouts; everything else
    /// is opaque input from the caller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_batch_size",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "poll_interval_ms",
            });
        }
        if self.resolve_timeout_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "resolve_timeout_ms",
            });
        }
        if self.stage_timeout_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "stage_timeout_ms",
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

fn env_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
