use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialise the global tracing subscriber.
///
/// JSON lines go to a daily-rotated file under `log_dir`, a compact
/// human-readable stream goes to stderr. `RUST_LOG` wins over the configured
/// filter when set.
///
/// Returns a [`WorkerGuard`] that **must** be held for the lifetime of the
/// process; dropping it flushes and closes the log file writer.
pub fn init_tracing(logging: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&logging.log_dir)
        .with_context(|| format!("creating log dir {}", logging.log_dir))?;

    let file_appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(&logging.file_name)
        .max_log_files(logging.max_log_files)
        .build(&logging.log_dir)
        .context("building rolling log appender")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.default_filter))
        .with_context(|| format!("invalid log filter {:?}", logging.default_filter))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .json(),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    Ok(guard)
}
