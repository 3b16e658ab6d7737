//! Timeline assembly: gap silence plus fitted clips, then final alignment.

mod aligner;
mod stitcher;

use thiserror::Error;

use crate::audio::AudioError;

pub use aligner::{align_to_video, Alignment};
pub use stitcher::{ChunkKind, Timeline, TimelineChunk, TimelineStitcher};

#[derive(Error, Debug, PartialEq)]
pub enum TimelineError {
    #[error("clip refers to segment {index} but only {count} segments exist")]
    UnknownSegment { index: usize, count: usize },

    #[error("clips out of order: segment {index} follows segment {previous}")]
    OutOfOrder { index: usize, previous: usize },

    #[error(transparent)]
    Audio(#[from] AudioError),
}

pub type TimelineResult<T> = Result<T, TimelineError>;
