//! Final alignment of the stitched track to the source video length.

use crate::audio::{samples_for, AudioBuffer};

/// Result of aligning the stitched track to the video.
#[derive(Debug, Clone)]
pub enum Alignment {
    Aligned {
        audio: AudioBuffer,
        before_secs: f64,
        after_secs: f64,
    },
    /// Video duration unknown; track passed through unchanged.
    Skipped { audio: AudioBuffer, reason: String },
}

impl Alignment {
    pub fn audio(&self) -> &AudioBuffer {
        match self {
            Alignment::Aligned { audio, .. } | Alignment::Skipped { audio, .. } => audio,
        }
    }

    pub fn into_audio(self) -> AudioBuffer {
        match self {
            Alignment::Aligned { audio, .. } | Alignment::Skipped { audio, .. } => audio,
        }
    }
}

/// Pad with trailing silence or trim so the track lasts exactly `video_secs`.
pub fn align_to_video(audio: AudioBuffer, video_secs: Option<f64>) -> Alignment {
    let video_secs = match video_secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => secs,
        Some(secs) => {
            return Alignment::Skipped {
                audio,
                reason: format!("invalid video duration {}", secs),
            }
        }
        None => {
            return Alignment::Skipped {
                audio,
                reason: "video duration unknown".to_string(),
            }
        }
    };

    let before_secs = audio.duration_secs();
    let target_len = samples_for(video_secs, audio.sample_rate());
    let audio = audio.fit_to_len(target_len);

    Alignment::Aligned {
        after_secs: audio.duration_secs(),
        audio,
        before_secs,
    }
}
