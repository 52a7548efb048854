//! Logging configuration for NimbusData.
//!
//! Logs go to stderr by default. A log file can be requested on the command
//! line, in which case output is written there without ANSI colors.

use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes logging to the given file.
///
/// Falls back to stderr if the file cannot be created.
pub fn init_file_logging(path: &Path) {
    let log_file = match open_log_file(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {}: {e}", path.display());
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Creates the log file and its parent directory. Existing files are truncated.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}
