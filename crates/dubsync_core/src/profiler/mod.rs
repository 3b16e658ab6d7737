//! Speaker profiling: coarse voice class from source pitch.
//!
//! The median F0 of confidently voiced windows picks between male and
//! female synthesis voices. Ambiguous pitches (145–190 Hz by default)
//! stay `unknown` and use the language's default voice.

mod filter;
mod pitch;

pub use filter::{high_pass, RUMBLE_CUTOFF_HZ};
pub use pitch::{median, PitchEstimate, PitchTracker};

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;
use crate::config::ProfilerSettings;
use crate::models::SpeakerClass;

/// Outcome of speaker profiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    pub class: SpeakerClass,
    /// Absent when the class was forced by configuration.
    pub estimate: Option<PitchEstimate>,
    pub forced: bool,
}

/// Map a median pitch to a speaker class using the configured thresholds.
pub fn classify(median_hz: Option<f64>, settings: &ProfilerSettings) -> SpeakerClass {
    match median_hz {
        Some(hz) if hz < settings.male_below_hz => SpeakerClass::Male,
        Some(hz) if hz > settings.female_above_hz => SpeakerClass::Female,
        _ => SpeakerClass::Unknown,
    }
}

/// Profile the speaker in `audio`, honoring a forced class override.
pub fn profile_speaker(audio: &AudioBuffer, settings: &ProfilerSettings) -> SpeakerProfile {
    if let Some(class) = settings.forced_class {
        if class != SpeakerClass::Unknown {
            tracing::debug!("Speaker class forced to {}", class);
            return SpeakerProfile {
                class,
                estimate: None,
                forced: true,
            };
        }
    }

    let analysed = audio.head(settings.max_analysis_secs);
    let filtered = high_pass(analysed.samples(), analysed.sample_rate(), RUMBLE_CUTOFF_HZ);

    let tracker = PitchTracker::new(settings, analysed.sample_rate());
    let estimate = tracker.estimate(&filtered);
    let class = classify(estimate.median_hz, settings);

    tracing::debug!(
        "Pitch median={:?} voiced={}/{} -> {}",
        estimate.median_hz,
        estimate.voiced_windows,
        estimate.total_windows,
        class
    );

    SpeakerProfile {
        class,
        estimate: Some(estimate),
        forced: false,
    }
}
