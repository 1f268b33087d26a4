//! Logging and report output helpers.

use std::fs;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::ledger::ResultLedger;

/// Initialize tracing. `RUST_LOG` overrides the default `info` level.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Write the rendered ledger to the operator's report file, under a
/// timestamped header. The render itself stays timestamp-free.
pub fn write_report(path: &str, ledger: &ResultLedger) -> Result<()> {
    let header = format!(
        "{}\nrun report - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(path, header + &ledger.render())?;
    info!("report written to {path}");
    Ok(())
}

/// Truncate long text for log lines.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
