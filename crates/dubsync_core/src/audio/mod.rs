//! In-memory audio representation.
//!
//! Audio is decoded once by ffmpeg into mono f64 PCM and edited here
//! sample-exactly (padding, trimming, fades, concatenation).

mod buffer;

pub use buffer::{samples_for, AudioBuffer, AudioError};
