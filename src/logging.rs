//! Tracing setup: a compact stdout layer plus an append-only log file.
//!
//! The file lives at `PDF_QA_LOG_FILE` when set and at `logs/pdf-qa.log` otherwise. It is
//! written through a non-blocking worker whose guard is held for the life of the process.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_ENV: &str = "PDF_QA_LOG_FILE";
const DEFAULT_LOG_PATH: &str = "logs/pdf-qa.log";

/// Install the global subscriber.
///
/// `RUST_LOG` controls filtering and defaults to `info`. If the log file cannot be prepared the
/// service keeps logging to stdout only.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let path = log_file_path(std::env::var(LOG_FILE_ENV).ok());

    let file_layer = match open_file_writer(&path) {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .compact(),
        ),
        Err(err) => {
            eprintln!("File logging disabled ({}): {err}", path.display());
            None
        }
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init();
    if let Err(err) = result {
        eprintln!("Tracing subscriber already installed: {err}");
    }
}

/// Resolve the log file location from the optional override.
fn log_file_path(override_path: Option<String>) -> PathBuf {
    override_path
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
}

fn open_file_writer(path: &Path) -> std::io::Result<NonBlocking> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
