//! Segment structures flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// A timed phrase as produced by the speech recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Recognized text.
    pub text: String,
}

impl RawSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Recognizer output for one source audio track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    /// Best-effort detected source language code.
    #[serde(default)]
    pub language: Option<String>,
    /// Segments in chronological order.
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

/// A speakable phrase unit built from one or more raw segments.
///
/// Merged segments are ordered and never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl MergedSegment {
    /// Length of the time window in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// One caption line in the target language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_parses_recognizer_json() {
        let json = r#"{
            "language": "en",
            "text": "hello world",
            "segments": [
                {"start": 0.0, "end": 1.2, "text": " hello"},
                {"start": 1.25, "end": 1.9, "text": " world"}
            ]
        }"#;
        let transcript: Transcript = serde_json::from_str(json).unwrap();
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[1].start, 1.25);
    }

    #[test]
    fn merged_duration_never_negative() {
        let seg = MergedSegment {
            start: 2.0,
            end: 1.5,
            text: "x".to_string(),
        };
        assert_eq!(seg.duration(), 0.0);
    }
}
