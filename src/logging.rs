//! Log sinks: console always, plus an optional plain-text log file.
//!
//! The assembled subscriber is returned as a [`Dispatch`] handle instead of
//! being installed globally; callers scope it onto the futures they run.

use std::path::Path;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::EnvFilter;

use crate::types::LogLevel;

/// Keeps the file writer alive; dropping it flushes buffered lines.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Build the logging dispatcher.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn build_dispatch(level: LogLevel, log_file: Option<&Path>) -> anyhow::Result<(Dispatch, LogGuard)> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let console_layer = tracing_subscriber::fmt::layer().with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {}", path.display()))?;
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer);

    Ok((Dispatch::new(subscriber), LogGuard { _file: guard }))
}
