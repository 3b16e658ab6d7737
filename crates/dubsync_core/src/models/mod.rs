//! Data models for dubsync.
//!
//! This module contains the core data structures shared by the pipeline:
//! - Enums for speaker class, dub language and caption style
//! - Segment structures (raw recognizer output, merged phrases, captions)

mod enums;
mod segments;

pub use enums::{CaptionStyle, DubLanguage, SpeakerClass, UnsupportedLanguage};
pub use segments::{CaptionEntry, MergedSegment, RawSegment, Transcript};
