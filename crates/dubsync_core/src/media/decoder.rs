//! Decoding rendered clips back into PCM.

use std::path::Path;

use crate::audio::AudioBuffer;

use super::error::MediaResult;
use super::ffmpeg;
use super::runner::ToolRunner;

/// Loads an audio file as mono PCM at a given sample rate.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path, sample_rate: u32) -> MediaResult<AudioBuffer>;
}

/// Decoder backed by ffmpeg (any format ffmpeg reads).
#[derive(Clone, Default)]
pub struct FfmpegDecoder {
    runner: ToolRunner,
}

impl FfmpegDecoder {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

impl AudioDecoder for FfmpegDecoder {
    fn decode(&self, path: &Path, sample_rate: u32) -> MediaResult<AudioBuffer> {
        ffmpeg::decode_mono(&self.runner, path, sample_rate)
    }
}

/// Reads raw f64le files, ignoring the requested rate (tests only).
#[cfg(test)]
pub(crate) struct RawF64Decoder;

#[cfg(test)]
impl AudioDecoder for RawF64Decoder {
    fn decode(&self, path: &Path, sample_rate: u32) -> MediaResult<AudioBuffer> {
        let bytes = std::fs::read(path).map_err(|e| super::MediaError::io("reading clip", e))?;
        Ok(AudioBuffer::new(
            ffmpeg::bytes_to_f64_samples(&bytes),
            sample_rate,
        ))
    }
}
