//! Speech recognizer boundary.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Transcript;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("Failed to read transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid recognizer output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Recognizer unavailable: {0}")]
    Unavailable(String),
}

pub type RecognizerResult<T> = Result<T, RecognizerError>;

/// Turns source audio into timed segments plus a detected language.
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;

    fn transcribe(&self, audio: &Path) -> RecognizerResult<Transcript>;
}

/// Reads recognizer JSON produced ahead of time.
///
/// Accepts the common `{"language": "en", "segments": [{"start", "end", "text"}]}`
/// layout; extra fields are ignored.
pub struct TranscriptFileRecognizer {
    path: PathBuf,
}

impl TranscriptFileRecognizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Recognizer for TranscriptFileRecognizer {
    fn name(&self) -> &str {
        "transcript-file"
    }

    fn transcribe(&self, _audio: &Path) -> RecognizerResult<Transcript> {
        let content = fs::read_to_string(&self.path).map_err(|e| RecognizerError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let transcript: Transcript = serde_json::from_str(&content)?;
        Ok(transcript)
    }
}
