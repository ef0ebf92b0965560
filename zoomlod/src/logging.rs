//! Logging setup for binaries built on this crate.
//!
//! - Human-readable output on stderr
//! - Optional plain-text copy in a log file (truncated on start)
//! - Filter from `RUST_LOG`, defaulting to `info`

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer, if one was opened.
pub struct LoggingGuard {
    file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether a log file is being written.
    pub fn has_file(&self) -> bool {
        self.file_guard.is_some()
    }
}

/// Build the env filter, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Prepare `path` for writing: create its directory and clear old content.
fn prepare_log_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, "")
}

/// Initialize the global subscriber.
///
/// With `log_file`, events are also written to that file through a
/// non-blocking writer.
///
/// # Errors
///
/// Returns an error if the log file cannot be prepared or a global
/// subscriber is already installed.
pub fn init_logging(log_file: Option<&Path>) -> Result<LoggingGuard, io::Error> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            prepare_log_file(path)?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Log path has no file name: {}", path.display()),
                )
            })?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard { file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_log_file_creates_directory_and_truncates() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("zoomlod.log");

        prepare_log_file(&path).unwrap();
        assert!(path.exists());

        fs::write(&path, "previous session").unwrap();
        prepare_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_log_file_without_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.log");
        prepare_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
