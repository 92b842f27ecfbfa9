//! Scheduler logging: stdout plus an append-only file under the log directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use reportsync_core::AppConfig;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

pub(crate) const LOG_FILE_NAME: &str = "scheduler.log";

/// Open `{log_dir}/scheduler.log` for appending, creating the directory if needed.
pub(crate) fn open_log_file(log_dir: &Path) -> anyhow::Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok((file, path))
}

/// Install the global subscriber. Returns the log file path.
pub(crate) fn init(config: &AppConfig) -> anyhow::Result<PathBuf> {
    let (file, path) = open_log_file(&config.log_dir)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(Mutex::new(file)))
        .init();
    Ok(path)
}
