use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::students::{LoggingSettings, WorkspacePaths};

const LOG_FILE_PREFIX: &str = "cognitivetwin.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// `RUST_LOG` wins over the configured level when set.
fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn log_dir(settings: &LoggingSettings, paths: &WorkspacePaths) -> PathBuf {
    settings
        .log_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.default_log_dir())
}

/// Installs the global subscriber: stderr always, plus daily-rolling files
/// when enabled. A subscriber that is already installed is left in place.
pub fn init_tracing(settings: &LoggingSettings, paths: &WorkspacePaths) -> Option<FileLogGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    if settings.file_logs {
        let dir = log_dir(settings, paths);
        if let Err(err) = std::fs::create_dir_all(&dir) {
            eprintln!("failed to create log directory {}: {err}", dir.display());
        } else {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            let _ = tracing_subscriber::registry()
                .with(env_filter(settings))
                .with(stderr_layer)
                .with(file_layer)
                .try_init();

            return Some(FileLogGuard { _guard: guard });
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter(settings))
        .with(stderr_layer)
        .try_init();

    None
}
