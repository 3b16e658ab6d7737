//! Exact-duration fitting of synthesized clips.

use std::sync::Arc;

use crate::audio::{samples_for, AudioBuffer};
use crate::config::FitSettings;

use super::chain::tempo_chain;
use super::tempo::TempoStretcher;
use super::{FitError, FitResult};

/// A clip occupying exactly its segment's window.
#[derive(Debug, Clone)]
pub struct FittedClip {
    pub segment_index: usize,
    pub audio: AudioBuffer,
    /// Duration of the clip before fitting.
    pub raw_secs: f64,
    /// Tempo steps applied; empty when the clip only needed padding.
    pub tempo_chain: Vec<f64>,
}

impl FittedClip {
    pub fn duration_secs(&self) -> f64 {
        self.audio.duration_secs()
    }
}

/// Pads or speeds up clips so they last exactly a target duration.
///
/// Speech is never slowed down: a short clip gets trailing silence,
/// a long clip is sped up by `D / T` and then padded or trimmed.
pub struct DurationFitter {
    settings: FitSettings,
    stretcher: Arc<dyn TempoStretcher>,
}

impl DurationFitter {
    pub fn new(settings: FitSettings, stretcher: Arc<dyn TempoStretcher>) -> Self {
        Self {
            settings,
            stretcher,
        }
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    /// Fit `clip` to `target_secs`.
    ///
    /// The output has `round(target_secs × sample_rate)` samples with short
    /// fades at both ends.
    pub fn fit(
        &self,
        segment_index: usize,
        clip: AudioBuffer,
        target_secs: f64,
    ) -> FitResult<FittedClip> {
        if !target_secs.is_finite() || target_secs <= 0.0 {
            return Err(FitError::InvalidTarget(target_secs));
        }
        if clip.is_empty() {
            return Err(FitError::EmptyClip);
        }

        let sample_rate = clip.sample_rate();
        let raw_secs = clip.duration_secs();
        let target_len = samples_for(target_secs, sample_rate);

        let (stretched, chain) = if clip.len() > target_len {
            let factor = raw_secs / target_secs;
            let chain = tempo_chain(factor, self.settings.min_tempo, self.settings.max_tempo)?;
            let stretched = self.stretcher.stretch(&clip, &chain)?;
            (stretched, chain)
        } else {
            (clip, Vec::new())
        };

        let mut fitted = stretched.fit_to_len(target_len);
        let fade_secs = (self.settings.fade_ms / 1000.0).min(target_secs / 4.0);
        fitted.apply_fades(samples_for(fade_secs, sample_rate));

        let actual = fitted.duration_secs();
        if (actual - target_secs).abs() * 1000.0 > self.settings.tolerance_ms {
            return Err(FitError::OutOfTolerance {
                target: target_secs,
                actual,
            });
        }

        Ok(FittedClip {
            segment_index,
            audio: fitted,
            raw_secs,
            tempo_chain: chain,
        })
    }
}
