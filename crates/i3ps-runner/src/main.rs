//! # i3ps
//!
//! Status line aggregator for i3bar.
//!
//! Sits between i3status and i3bar: reads the JSON protocol on stdin,
//! inserts the output of every configured module into each tick, and writes
//! the result to stdout. With `--standalone` no i3status is needed; the
//! engine fabricates empty ticks at a fixed interval instead.
//!
//! # Usage
//!
//! ```bash
//! i3status | i3ps config.json
//! i3ps --standalone --interval 2 config.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use i3ps_core::StatusError;
use i3ps_core::config::{AppConfig, load_config};
use i3ps_core::shutdown::ShutdownSignal;
use i3ps_engine::modules::builtin_catalog;
use i3ps_engine::{LineIo, StandaloneIo, StatusEngine};
use tracing::info;

/// i3bar status line aggregator.
#[derive(Parser)]
#[command(name = "i3ps", about = "i3bar status line aggregator")]
struct Cli {
    /// Configuration file path (JSON).
    config: Option<PathBuf>,

    /// Run without i3status, producing empty ticks on a timer.
    #[arg(long)]
    standalone: bool,

    /// Seconds between ticks in standalone mode.
    #[arg(long)]
    interval: Option<f64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// Print the built-in modules and their settings, then exit.
    #[arg(long)]
    list_modules: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    // The stdin reader may still be parked in a blocking read after an
    // interrupt; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    // 1. Load configuration (command-line flags win)
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };

    let standalone = cli.standalone || config.is_standalone();
    let interval = match cli.interval {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid --interval {secs}"))?,
        None => config.standalone_interval()?,
    };
    let log_level = cli
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or("info");
    let log_dir = cli.log_dir.as_deref().or(config.log_dir.as_deref());

    // 2. Initialize logging (stderr + optional file; stdout is the protocol)
    i3ps_core::logging::init_logging(log_level, log_dir, "i3ps")?;

    let catalog = builtin_catalog()?;

    if cli.list_modules {
        for id in catalog.ids() {
            let kind = catalog.get(id)?.find_kind()?;
            println!("{id} ({})", kind.class);
            for setting in kind.settings {
                println!("    {setting}");
            }
        }
        return Ok(());
    }

    info!(
        "i3ps starting: standalone={standalone}, modules={}",
        config.modules.len()
    );

    // 3. Register modules in config order
    let mut engine = StatusEngine::with_catalog(catalog);
    for (idx, entry) in config.modules.iter().enumerate() {
        engine
            .register_entry(entry)
            .with_context(|| format!("modules[{idx}] ({})", entry.module))?;
    }

    // 4. Drive the protocol until the host goes away
    let shutdown = ShutdownSignal::ctrl_c();
    let outcome = if standalone {
        engine
            .run(StandaloneIo::new(interval).with_shutdown(shutdown))
            .await
    } else {
        engine.run(LineIo::stdio(shutdown)).await
    };

    match outcome {
        Ok(ticks) => info!("end of stream after {ticks} tick(s), goodbye"),
        Err(StatusError::EndOfStream) => info!("input closed during handshake, goodbye"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
