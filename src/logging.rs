use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "nse-live-premiums.log";

/// Install the process-wide subscriber.
///
/// Operators watch the console for refresh and stale-fallback warnings; the
/// JSON file under `log_dir` (rotated daily) keeps the structured fields
/// (`age_secs`, `rows`, upstream `body` excerpts) for later digging.
/// `RUST_LOG` overrides the default `info` level, e.g.
/// `RUST_LOG=nse_live_premiums::cache=debug` to see every refresh attempt.
pub fn init_logging(log_dir: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE);

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(true);

    // Upstream excerpts can contain HTML; keep them out of ANSI and in JSON
    let file = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
