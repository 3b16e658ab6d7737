//! Per-job logger with file and callback output.
//!
//! Each dub job gets its own logger that:
//! - Appends to the job's `log.txt` (retries keep earlier attempts)
//! - Sends messages to a callback (if provided)
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer of tool output for error diagnosis
//! - Records structured [`StageDecision`]s for the job report

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::decisions::StageDecision;
use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-job logger with dual output (file + callback).
pub struct JobLogger {
    /// Job id, for callers that show several logs.
    job_name: String,
    /// The dub's `log.txt`.
    log_path: PathBuf,
    /// File writer (buffered); `None` once closed.
    file_writer: Arc<Mutex<Option<BufWriter<File>>>>,
    /// Receives every formatted line, e.g. for a live console.
    callback: Arc<Mutex<Option<LogCallback>>>,
    /// Logging configuration.
    config: LogConfig,
    /// Recent tool output lines (used for error diagnosis).
    tail_buffer: Arc<Mutex<VecDeque<String>>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Arc<Mutex<u32>>,
    /// Stage decisions, later written to `report.json`.
    decisions: Arc<Mutex<Vec<StageDecision>>>,
}

impl JobLogger {
    /// Create a new job logger appending to `log_path`.
    ///
    /// # Arguments
    /// * `job_name` - Name of the job (shown by callers, not in the file)
    /// * `log_path` - Log file; parent directories are created
    /// * `config` - Logging configuration
    /// * `callback` - Optional callback receiving every formatted line
    pub fn new(
        job_name: impl Into<String>,
        log_path: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let tail_capacity = config.error_tail.min(1024);
        Ok(Self {
            job_name: job_name.into(),
            log_path,
            file_writer: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
            callback: Arc::new(Mutex::new(callback)),
            config,
            tail_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(tail_capacity))),
            last_progress: Arc::new(Mutex::new(0)),
            decisions: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error as `ERROR: <message>`.
    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log command arguments as a JSON array (when enabled in config).
    pub fn command_json(&self, tokens: &[String]) {
        if let Ok(json) = serde_json::to_string(tokens) {
            self.log(LogLevel::Debug, &json);
        }
    }

    /// Log a job boundary marker, e.g. `== DUB START ==`.
    pub fn marker(&self, name: &str) {
        let msg = MessagePrefix::Marker.format(name);
        self.log(LogLevel::Info, &msg);
    }

    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    pub fn section(&self, section_name: &str) {
        let msg = MessagePrefix::Section.format(section_name);
        self.log(LogLevel::Info, &msg);
    }

    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Record a decision and mirror it into the log.
    pub fn decision(&self, decision: StageDecision) {
        let prefix = if decision.is_degraded() {
            MessagePrefix::Degraded
        } else {
            MessagePrefix::Decision
        };
        let msg = prefix.format(&decision.summary());
        self.log(LogLevel::Info, &msg);
        self.decisions.lock().push(decision);
    }

    /// All decisions recorded so far, in order.
    pub fn decisions(&self) -> Vec<StageDecision> {
        self.decisions.lock().clone()
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);

            let current_step = (percent / step) * step;
            let last_step = (*last / step) * step;

            if current_step <= last_step && percent < 100 {
                return false;
            }
            *last = percent;
        }

        let msg = format!("Progress: {}%", percent);
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Log a line of external tool output.
    ///
    /// In compact mode, these only go to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail == 0 {
                buffer.clear();
            } else {
                while buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        let msg = format!("{}{}", prefix, line);
        self.output(&self.format_message(&msg));
    }

    /// Dump the tail buffer into the log (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file handle.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn quiet_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_log_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job").join("dubs").join("hi").join("log.txt");
        let logger = JobLogger::new("job", &path, LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
    }

    #[test]
    fn appends_across_loggers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");

        {
            let logger = JobLogger::new("job", &path, quiet_config(), None).unwrap();
            logger.marker("DUB START");
        }
        {
            let logger = JobLogger::new("job", &path, quiet_config(), None).unwrap();
            logger.marker("DUB DONE");
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "== DUB START ==\n== DUB DONE ==\n");
    }

    #[test]
    fn calls_callback() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLogger::new(
            "job",
            dir.path().join("log.txt"),
            LogConfig::default(),
            Some(callback),
        )
        .unwrap();

        logger.info("Message 1");
        logger.info("Message 2");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let mut config = LogConfig::default();
        config.compact = true;
        config.progress_step = 20;

        let logger = JobLogger::new("job", dir.path().join("log.txt"), config, None).unwrap();

        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let mut config = LogConfig::default();
        config.error_tail = 5;

        let logger = JobLogger::new("job", dir.path().join("log.txt"), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), true);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn decisions_recorded_and_logged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let logger = JobLogger::new("job", &path, quiet_config(), None).unwrap();

        logger.decision(StageDecision::Cached);
        logger.decision(StageDecision::LoudnessSkipped {
            reason: "disabled".into(),
        });
        logger.flush();

        assert_eq!(logger.decisions().len(), 2);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[Decision] cached=true"));
        assert!(content.contains("[DEGRADED] loudnorm skipped: disabled"));
    }

    #[test]
    fn error_lines_use_error_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let logger = JobLogger::new("job", &path, quiet_config(), None).unwrap();

        logger.error("tts failed");
        logger.flush();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ERROR: tts failed\n");
    }
}
