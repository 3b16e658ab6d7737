//! Dub synthesis: voice selection and per-segment rendering.

mod segment;
mod voices;

use std::io;

use thiserror::Error;

use crate::fit::FitError;

pub use segment::{SegmentSynthesizer, SynthesisOutput, SynthesisPlan, SynthesizedSegment};
pub use voices::{default_voices, select_voice};

/// Failures that abort the synthesis stage.
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("segment {segment} has an empty window at {start:.3}s")]
    EmptyWindow { segment: usize, start: f64 },

    #[error("segment {0} has no text")]
    EmptyText(usize),

    #[error("segment {0}: translation returned empty text")]
    EmptyTranslation(usize),

    #[error("segment {segment}: every synthesis backend failed: {reasons}")]
    AllBackendsFailed { segment: usize, reasons: String },

    #[error("segment {segment}: {source}")]
    Fit {
        segment: usize,
        #[source]
        source: FitError,
    },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl SegmentError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn segment(&self) -> Option<usize> {
        match self {
            Self::EmptyText(index) | Self::EmptyTranslation(index) => Some(*index),
            Self::EmptyWindow { segment, .. }
            | Self::AllBackendsFailed { segment, .. }
            | Self::Fit { segment, .. } => Some(*segment),
            Self::Io { .. } => None,
        }
    }
}

pub type SegmentResult<T> = Result<T, SegmentError>;
