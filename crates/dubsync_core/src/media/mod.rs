//! Process-based media toolkit (ffmpeg, ffprobe).
//!
//! All calls are synchronous and blocking with no timeout; a non-zero
//! exit code is a stage failure carrying the captured output tail.

mod decoder;
mod error;
pub mod ffmpeg;
mod probe;
mod runner;

pub use decoder::{AudioDecoder, FfmpegDecoder};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_duration, probe_media, MediaProbe};
pub use runner::{require_tool, ToolRunner, DEFAULT_TAIL_LINES};

#[cfg(test)]
pub(crate) use decoder::RawF64Decoder;
