use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "clipsum.log";

/// Installs the global subscriber: human readable output on stdout plus a
/// daily rolling file under `dir`. `RUST_LOG` overrides the `info` default.
///
/// Keep the returned guard alive for as long as the process runs, dropping it
/// flushes and stops the file writer.
pub fn init(dir: String) -> Result<WorkerGuard> {
    std::fs::create_dir_all(Path::new(&dir))?;

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}
