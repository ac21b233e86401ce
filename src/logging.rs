//! File-based logging for babble.
//!
//! Session logs go to daily-rotated files in the babble state directory (see
//! [`crate::config::paths`]), never to the terminal, so nothing is printed
//! over the TUI. The most recent week of rotated files is kept; older ones
//! are pruned at startup. Log level is controlled by RUST_LOG (default
//! "info").

use crate::config::state_dir;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Base name of the rotated log files; the daily appender adds a
/// `.YYYY-MM-DD` suffix.
pub const LOG_FILE_PREFIX: &str = "babble.log";

/// How many days of rotated files survive pruning.
const RETAINED_DAYS: usize = 7;

/// Keeps the non-blocking appender's worker alive for the program lifetime.
static APPENDER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initializes file-based logging.
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init() -> anyhow::Result<()> {
    let log_dir = state_dir()?;
    fs::create_dir_all(&log_dir)?;

    if let Err(e) = prune_stale_logs(&log_dir) {
        eprintln!("Warning: failed to prune old logs: {e}");
    }

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging to {}", log_dir.display());
    Ok(())
}

/// Deletes dated log files beyond the retention window.
///
/// Rotated files are named `babble.log.YYYY-MM-DD`, so sorting by file name
/// descending is sorting by age.
fn prune_stale_logs(log_dir: &Path) -> anyhow::Result<()> {
    let mut dated: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| Some(entry.ok()?.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix(LOG_FILE_PREFIX))
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(is_date_suffix)
        })
        .collect();

    dated.sort();
    for stale in dated.iter().rev().skip(RETAINED_DAYS) {
        if let Err(e) = fs::remove_file(stale) {
            tracing::warn!("Failed to delete old log file {}: {}", stale.display(), e);
        }
    }

    Ok(())
}

/// True for a `YYYY-MM-DD` rotation suffix.
fn is_date_suffix(suffix: &str) -> bool {
    suffix.len() == 10
        && suffix.chars().enumerate().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_suffixes_are_recognized() {
        assert!(is_date_suffix("2026-08-04"));
        assert!(!is_date_suffix("2026-8-4"));
        assert!(!is_date_suffix("today"));
        assert!(!is_date_suffix("2026-08-04.bak"));
    }

    #[test]
    fn undated_files_are_never_pruning_candidates() {
        // The live file has no date suffix and must survive any retention
        // policy; only `babble.log.YYYY-MM-DD` names qualify.
        assert!(!is_date_suffix(""));
        assert!(!is_date_suffix("lock"));
    }
}
