//! Process-wide logging setup
//!
//! Installs a layered `tracing` subscriber:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, falls back to the CLI level)
//!   ├── Fmt Layer (stdout, text or JSON)
//!   └── Fmt Layer (per-run log file, no ANSI)
//! ```
//!
//! Each run writes to `<log_dir>/<YYYY-MM-DD>/<HH-MM-SS>@<app>.log`. When two
//! runs start within the same second the process id is appended.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Errors that can occur during logging initialization
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log file {path}: {source}")]
    LogFileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    InitError(String),
}

/// Logging options taken from the command line
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Level used when `RUST_LOG` is not set
    pub default_level: String,
    /// Emit JSON lines on stdout instead of text
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            json: false,
        }
    }
}

/// Path of the log file for a run started at `now`
pub fn log_file_path(log_dir: &Path, app_name: &str, now: DateTime<Local>) -> PathBuf {
    log_dir
        .join(now.format("%Y-%m-%d").to_string())
        .join(format!("{}@{}.log", now.format("%H-%M-%S"), app_name))
}

/// Create the per-run log file, including its dated folder
pub fn create_log_file(log_dir: &Path, app_name: &str) -> Result<(PathBuf, File), LoggingError> {
    let mut path = log_file_path(log_dir, app_name, Local::now());
    if path.exists() {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}", std::process::id()));
        path = PathBuf::from(name);
    }

    let open = |path: &Path| -> std::io::Result<File> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    };

    match open(&path) {
        Ok(file) => Ok((path, file)),
        Err(source) => Err(LoggingError::LogFileError { path, source }),
    }
}

/// Install the global subscriber writing to stdout and to a new log file.
///
/// Returns the path of the log file.
pub fn init_logging(
    log_dir: &Path,
    app_name: &str,
    options: &LogOptions,
) -> Result<PathBuf, LoggingError> {
    let (path, file) = create_log_file(log_dir, app_name)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_level));

    let stdout_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::InitError(e.to_string()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_path_layout() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = log_file_path(Path::new("/var/log/spool"), "spool-uploadr", now);
        assert_eq!(
            path,
            PathBuf::from("/var/log/spool/2024-03-09/07-05-01@spool-uploadr.log")
        );
    }

    #[test]
    fn test_create_log_file_creates_dated_folder() {
        let dir = TempDir::new().unwrap();
        let (path, _file) = create_log_file(dir.path(), "app").unwrap();
        assert!(path.exists());
        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().contains("@app.log"));
    }

    #[test]
    fn test_create_log_file_unwritable_dir() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = create_log_file(&blocker, "app");
        assert!(matches!(result, Err(LoggingError::LogFileError { .. })));
    }
}
