//! Logging setup on the `tracing` ecosystem.
//!
//! Standard output carries the bar protocol, so no subscriber may write
//! there. Human-readable events go to standard error; with a log directory,
//! events are also appended to a daily file as one JSON object per line.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter from `RUST_LOG` when it is set and valid, otherwise from
/// `log_level`.
fn level_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env().or_else(|_| parse_level(log_level))
}

/// Parse a level or directive list such as `"info"` or
/// `"warn,i3ps_engine=debug"`.
fn parse_level(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level).with_context(|| format!("invalid log level {log_level:?}"))
}

/// Install the global subscriber.
///
/// Call once, before any module is registered. Module worker threads are
/// named `module-<name>`, and both outputs record thread names so a worker's
/// events can be told apart from the tick loop's.
///
/// - `log_level`: used when `RUST_LOG` is unset
/// - `log_dir`: directory for daily-rotating JSON log files
/// - `app_name`: file name prefix (`<app_name>.log.<date>`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, app_name: &str) -> Result<()> {
    let filter = level_filter(log_level)?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(std::io::stderr().is_terminal());

    let file = log_dir.map(|dir| {
        fmt::layer()
            .json()
            .with_writer(tracing_appender::rolling::daily(dir, format!("{app_name}.log")))
            .with_thread_names(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("installing the log subscriber")
}
