//! Pitch-preserving tempo change.

use crate::audio::AudioBuffer;
use crate::media::{ffmpeg, MediaResult, ToolRunner};

/// Applies a chain of tempo factors to audio.
///
/// Each factor must lie within the primitive's supported range;
/// [`super::tempo_chain`] produces such chains.
pub trait TempoStretcher: Send + Sync {
    fn stretch(&self, audio: &AudioBuffer, chain: &[f64]) -> MediaResult<AudioBuffer>;
}

/// Tempo change through ffmpeg's `atempo` filter.
#[derive(Clone)]
pub struct FfmpegTempo {
    runner: ToolRunner,
}

impl FfmpegTempo {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

impl TempoStretcher for FfmpegTempo {
    fn stretch(&self, audio: &AudioBuffer, chain: &[f64]) -> MediaResult<AudioBuffer> {
        ffmpeg::apply_atempo(&self.runner, audio, chain)
    }
}

/// Linear-interpolation stretcher for tests (changes pitch, keeps timing).
#[cfg(test)]
pub(crate) struct ResampleTempo;

#[cfg(test)]
impl TempoStretcher for ResampleTempo {
    fn stretch(&self, audio: &AudioBuffer, chain: &[f64]) -> MediaResult<AudioBuffer> {
        let factor: f64 = chain.iter().product();
        let src = audio.samples();
        let out_len = (src.len() as f64 / factor).round() as usize;
        let samples = (0..out_len)
            .map(|i| {
                let pos = i as f64 * factor;
                let idx = pos.floor() as usize;
                let frac = pos - idx as f64;
                let a = src.get(idx).copied().unwrap_or(0.0);
                let b = src.get(idx + 1).copied().unwrap_or(a);
                a + (b - a) * frac
            })
            .collect();
        Ok(AudioBuffer::new(samples, audio.sample_rate()))
    }
}
