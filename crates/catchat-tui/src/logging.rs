use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info,catchat=debug,catchat_core=debug";

/// Initialize structured logging into `<cache dir>/catchat/catchat.log`.
///
/// The terminal UI owns stderr, so nothing is logged there. `RUST_LOG`
/// overrides the default filter.
pub fn init_logging() -> Result<PathBuf> {
    let log_dir = dirs::cache_dir()
        .context("could not determine cache directory")?
        .join("catchat");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating {}", log_dir.display()))?;

    let log_path = log_dir.join("catchat.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()?;

    Ok(log_path)
}
