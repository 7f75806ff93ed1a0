//! Logging init: append to a file under the XDG state dir, or go to stderr.
//!
//! The CLI tries the file first and falls back to stderr when the state dir
//! is unusable, so a read-only home never prevents polling.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "feedpoll.log";

/// Directives used when `RUST_LOG` is unset.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,feedpoll=debug,feedpoll_core=debug"
    } else {
        "info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// `~/.local/state/feedpoll/feedpoll.log`; parent directories are created.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("feedpoll")?;
    Ok(xdg_dirs.place_state_file(LOG_FILE)?)
}

/// Initialize structured logging to [`log_file_path`] and return the path.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(verbose: bool) -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    tracing::info!("feedpoll logging initialized at {}", path.display());
    Ok(path)
}

/// Initialize logging to stderr only. Used with `--stderr` or when
/// [`init_logging`] fails. A subscriber that is already installed is kept.
pub fn init_logging_stderr(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
