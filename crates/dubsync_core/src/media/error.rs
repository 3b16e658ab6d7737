//! Error types for media tool invocations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from running ffmpeg/ffprobe and other external tools.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("missing dependency: {tool} not found in PATH")]
    ToolNotFound { tool: String },

    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool exited non-zero. `tail` holds the last captured output lines.
    #[error("{tool} failed (rc={exit_code}): {last_line}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        last_line: String,
        tail: Vec<String>,
    },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("No audio decoded from {0}")]
    NoAudio(PathBuf),
}

impl MediaError {
    pub fn command_failed(tool: impl Into<String>, exit_code: i32, tail: Vec<String>) -> Self {
        let last_line = tail
            .iter()
            .rev()
            .find(|l| !l.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "no output".to_string());
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            last_line,
            tail,
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Captured output tail, if this error came from a failed process.
    pub fn output_tail(&self) -> &[String] {
        match self {
            MediaError::CommandFailed { tail, .. } => tail,
            _ => &[],
        }
    }
}

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;
