//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Operation → Detail

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::audio::AudioError;
use crate::media::MediaError;
use crate::services::RecognizerError;
use crate::synthesis::SegmentError;
use crate::timeline::TimelineError;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The request was rejected before the pipeline started.
    #[error("Job '{job_name}' failed validation: {message}")]
    ValidationFailed { job_name: String, message: String },

    /// Failed to set up job (create directories, open the log, etc.).
    #[error("Job '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_name: job_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn validation_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    /// The message stored in the status file.
    ///
    /// Validation failures keep their bare message ("unsupported lang").
    pub fn status_message(&self) -> String {
        match self {
            Self::ValidationFailed { message, .. } => message.clone(),
            Self::StepFailed { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Recognizer failed: {0}")]
    Recognizer(#[from] RecognizerError),

    #[error(transparent)]
    Synthesis(#[from] SegmentError),

    #[error("Timeline assembly failed: {0}")]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(path: &Path) -> Self {
        Self::FileNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    /// Captured output tail of a failed external tool, if any.
    pub fn output_tail(&self) -> &[String] {
        match self {
            Self::Media(e) => e.output_tail(),
            _ => &[],
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_chains_step_context() {
        let err = PipelineError::step_failed(
            "job-1",
            "Mux",
            MediaError::command_failed("ffmpeg", 1, vec!["bad input".into()]).into(),
        );
        let msg = err.to_string();
        assert!(msg.contains("job-1"));
        assert!(msg.contains("Mux"));
        assert!(msg.contains("ffmpeg failed (rc=1): bad input"));
    }

    #[test]
    fn status_message_is_bare_for_validation() {
        let err = PipelineError::validation_failed("job", "unsupported lang");
        assert_eq!(err.status_message(), "unsupported lang");
    }

    #[test]
    fn output_tail_exposed_for_media_failures() {
        let err: StepError =
            MediaError::command_failed("ffmpeg", 2, vec!["a".into(), "b".into()]).into();
        assert_eq!(err.output_tail(), ["a".to_string(), "b".to_string()]);
        assert!(StepError::invalid_input("x").output_tail().is_empty());
    }
}
