//! File logging setup.
//!
//! Logs go to a daily-rolling file so they never interleave with command
//! output on stdout.

use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

const LOG_FILE_PREFIX: &str = "halakat.log";
const DEFAULT_LEVEL: &str = "info";

/// Log directory: the configured one, else `$XDG_DATA_HOME/halakat/logs`.
pub fn log_dir(config: &LogConfig) -> PathBuf {
  config.directory.clone().unwrap_or_else(|| {
    dirs::data_dir()
      .unwrap_or_else(std::env::temp_dir)
      .join("halakat")
      .join("logs")
  })
}

/// Filter directives: `RUST_LOG` wins, then the configured level.
fn filter(config: &LogConfig) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    let level = config.level.as_deref().unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
  })
}

/// Install the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let dir = log_dir(config);
  std::fs::create_dir_all(&dir)?;

  let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter(config))
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()?;

  tracing::debug!(dir = %dir.display(), "logging initialized");
  Ok(guard)
}
