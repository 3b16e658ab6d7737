//! Structured record of every decision a dub job makes.
//!
//! Decisions are mirrored into the human log and serialized into
//! `report.json` for diagnostics.

use serde::{Deserialize, Serialize};

use crate::models::SpeakerClass;

/// One pipeline decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageDecision {
    SourceLanguage {
        detected: Option<String>,
        translate: bool,
    },
    SegmentsMerged {
        raw: usize,
        merged: usize,
    },
    SpeakerProfiled {
        class: SpeakerClass,
        median_hz: Option<f64>,
        voiced_windows: usize,
        forced: bool,
    },
    TranslationFallback {
        segment: usize,
        reason: String,
    },
    VoiceSelected {
        voice: String,
        class: SpeakerClass,
    },
    SegmentSynthesized {
        segment: usize,
        backend: String,
        rate_percent: i32,
        raw_secs: f64,
        target_secs: f64,
        tempo_chain: Vec<f64>,
    },
    BackendFailed {
        segment: usize,
        backend: String,
        reason: String,
    },
    TimelineStitched {
        chunks: usize,
        silence_chunks: usize,
        duration_secs: f64,
    },
    FinalAlignment {
        video_secs: f64,
        before_secs: f64,
        after_secs: f64,
    },
    AlignmentSkipped {
        reason: String,
    },
    LoudnessSkipped {
        reason: String,
    },
    FontSelected {
        font: String,
        fallback: bool,
    },
    Cached,
}

impl StageDecision {
    /// One-line human summary for the job log.
    pub fn summary(&self) -> String {
        match self {
            StageDecision::SourceLanguage {
                detected,
                translate,
            } => format!(
                "source_lang={} translate={}",
                detected.as_deref().unwrap_or("?"),
                translate
            ),
            StageDecision::SegmentsMerged { raw, merged } => {
                format!("segments raw={} merged={}", raw, merged)
            }
            StageDecision::SpeakerProfiled {
                class,
                median_hz,
                voiced_windows,
                forced,
            } => match median_hz {
                Some(hz) => format!(
                    "speaker={} median_hz={:.1} voiced_windows={} forced={}",
                    class, hz, voiced_windows, forced
                ),
                None => format!(
                    "speaker={} median_hz=none voiced_windows={} forced={}",
                    class, voiced_windows, forced
                ),
            },
            StageDecision::TranslationFallback { segment, reason } => {
                format!("seg={} translation_fallback=source_text ({})", segment, reason)
            }
            StageDecision::VoiceSelected { voice, class } => {
                format!("voice={} for speaker={}", voice, class)
            }
            StageDecision::SegmentSynthesized {
                segment,
                backend,
                rate_percent,
                raw_secs,
                target_secs,
                tempo_chain,
            } => {
                let chain = if tempo_chain.is_empty() {
                    "none".to_string()
                } else {
                    tempo_chain
                        .iter()
                        .map(|f| format!("{:.3}", f))
                        .collect::<Vec<_>>()
                        .join(",")
                };
                format!(
                    "seg={} backend={} rate={:+}% raw={:.3}s target={:.3}s atempo={}",
                    segment, backend, rate_percent, raw_secs, target_secs, chain
                )
            }
            StageDecision::BackendFailed {
                segment,
                backend,
                reason,
            } => format!("seg={} backend={} failed: {}", segment, backend, reason),
            StageDecision::TimelineStitched {
                chunks,
                silence_chunks,
                duration_secs,
            } => format!(
                "timeline chunks={} silences={} duration={:.3}s",
                chunks, silence_chunks, duration_secs
            ),
            StageDecision::FinalAlignment {
                video_secs,
                before_secs,
                after_secs,
            } => format!(
                "align video={:.3}s stitched={:.3}s final={:.3}s",
                video_secs, before_secs, after_secs
            ),
            StageDecision::AlignmentSkipped { reason } => format!("align skipped: {}", reason),
            StageDecision::LoudnessSkipped { reason } => format!("loudnorm skipped: {}", reason),
            StageDecision::FontSelected { font, fallback } => {
                format!("font={} fallback={}", font, fallback)
            }
            StageDecision::Cached => "cached=true (outputs already exist)".to_string(),
        }
    }

    /// Whether this decision records a degraded-but-continuing condition.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            StageDecision::AlignmentSkipped { .. } | StageDecision::LoudnessSkipped { .. }
        )
    }
}
