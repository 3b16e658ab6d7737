//! Logging infrastructure for dub jobs.
//!
//! This module provides:
//! - Per-job loggers appending to the job's `log.txt` plus an optional callback
//! - Compact mode with progress filtering
//! - Tail buffer of tool output for error diagnosis
//! - Structured [`StageDecision`] records serialized into `report.json`
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use dubsync_core::logging::{JobLogger, LogConfig, StageDecision};
//!
//! let logger = JobLogger::new(
//!     "lecture-01",
//!     "dub_data/lecture-01/dubs/hi/log.txt",
//!     LogConfig::default(),
//!     None,
//! ).unwrap();
//!
//! logger.marker("DUB START");
//! logger.phase("Merge");
//! logger.decision(StageDecision::SegmentsMerged { raw: 12, merged: 7 });
//! logger.marker("DUB DONE");
//! ```

mod decisions;
mod job_logger;
mod types;

pub use decisions::StageDecision;
pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Daily log file prefix inside the logs folder.
const APP_LOG_PREFIX: &str = "dubsync.log";

/// Initialize the global tracing subscriber writing to stderr.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Should be called
/// once at startup; the CLI layers a file appender on top instead.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Like [`init_tracing`], plus a daily-rolling file in `logs_dir`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer. Returns `None` (stderr only) when
/// the folder cannot be created.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        eprintln!("Cannot create logs folder {}: {}", logs_dir.display(), e);
        init_tracing(default_level);
        return None;
    }

    let appender = tracing_appender::rolling::daily(logs_dir, APP_LOG_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter)
        .init();

    Some(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
    }
}
