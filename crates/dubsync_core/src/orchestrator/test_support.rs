//! Shared fixture for step and pipeline tests.
//!
//! Every external tool is replaced by an in-process double: the "video"
//! is raw f64le source audio, synthesizers write raw f64le clips and the
//! font probe reports a fixed set of families.

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::{tempdir, TempDir};

use crate::audio::AudioBuffer;
use crate::captions::FontProbe;
use crate::config::Settings;
use crate::fit::ResampleTempo;
use crate::jobs::{Admission, DubLayout};
use crate::logging::{JobLogger, LogConfig};
use crate::media::{ffmpeg, MediaError, MediaResult, RawF64Decoder, ToolRunner};
use crate::models::{DubLanguage, RawSegment, Transcript};
use crate::services::{
    Recognizer, RecognizerResult, SynthesisRequest, SynthesisResult, Synthesizer,
};

use super::steps::{MergeStep, ProfileStep};
use super::{Context, DubServices, JobState, PipelineStep, PreparedMedia, TranscriptOutput};

pub(crate) const JOB_ID: &str = "job";

/// Fixed transcript: two fragments that merge, then one far away.
pub(crate) struct FixtureRecognizer;

impl Recognizer for FixtureRecognizer {
    fn name(&self) -> &str {
        "fixture"
    }

    fn transcribe(&self, _audio: &Path) -> RecognizerResult<Transcript> {
        Ok(Transcript {
            language: Some("en".to_string()),
            segments: fixture_segments(),
        })
    }
}

pub(crate) fn fixture_segments() -> Vec<RawSegment> {
    vec![
        RawSegment::new(0.0, 1.2, "hello"),
        RawSegment::new(1.25, 1.9, "world"),
        RawSegment::new(5.0, 6.0, "bye"),
    ]
}

/// Speaks 0.1 s per character at the clip rate, faster with positive rates.
pub(crate) struct PacedSynth {
    sample_rate: u32,
}

impl Synthesizer for PacedSynth {
    fn name(&self) -> &str {
        "paced"
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> SynthesisResult<()> {
        let secs = request.text.chars().count() as f64 * 0.1
            / (1.0 + request.rate_percent as f64 / 100.0);
        let samples = vec![0.4; (secs * self.sample_rate as f64).round() as usize];
        fs::write(output, ffmpeg::f64_samples_to_bytes(&samples))
            .map_err(|e| MediaError::io("writing clip", e))?;
        Ok(())
    }
}

pub(crate) struct FixedFonts(pub Vec<&'static str>);

impl FontProbe for FixedFonts {
    fn installed_families(&self) -> MediaResult<BTreeSet<String>> {
        Ok(self.0.iter().map(|f| f.to_string()).collect())
    }
}

/// In-process doubles for every external collaborator.
pub(crate) fn fixture_services(clip_rate: u32) -> DubServices {
    DubServices {
        recognizer: Arc::new(FixtureRecognizer),
        translator: None,
        synthesizers: vec![Arc::new(PacedSynth {
            sample_rate: clip_rate,
        })],
        decoder: Arc::new(RawF64Decoder),
        stretcher: Arc::new(ResampleTempo),
        font_probe: Arc::new(FixedFonts(vec!["Noto Sans Devanagari", "DejaVu Sans"])),
    }
}

/// Fundamental plus a weaker second harmonic.
pub(crate) fn tone(hz: f64, secs: f64, sample_rate: u32) -> Vec<f64> {
    let len = (secs * sample_rate as f64).round() as usize;
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            0.3 * (2.0 * PI * hz * t).sin() + 0.1 * (4.0 * PI * hz * t).sin()
        })
        .collect()
}

pub(crate) struct TestJob {
    pub dir: TempDir,
    pub settings: Settings,
    pub layout: DubLayout,
    pub video: std::path::PathBuf,
    pub admission: Arc<Admission>,
}

impl TestJob {
    pub fn new() -> Self {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.data_root = dir.path().join("data").display().to_string();
        settings.paths.work_root = dir.path().join("work").display().to_string();
        settings.fit.sample_rate = 1000;

        let layout = DubLayout::new(&settings.paths, JOB_ID, DubLanguage::Hindi.code());
        let video = dir.path().join("source.mp4");

        Self {
            dir,
            settings,
            layout,
            video,
            admission: Arc::new(Admission::new()),
        }
    }

    pub fn services(&self) -> DubServices {
        fixture_services(self.settings.fit.sample_rate)
    }

    /// Fresh context with its own logger (no decisions recorded yet).
    pub fn context(&self) -> Context {
        let logger = Arc::new(
            JobLogger::new(
                JOB_ID,
                self.dir.path().join("log.txt"),
                LogConfig {
                    show_timestamps: false,
                    ..LogConfig::default()
                },
                None,
            )
            .unwrap(),
        );
        Context::new(
            JOB_ID,
            DubLanguage::Hindi,
            self.video.clone(),
            self.settings.clone(),
            self.layout.clone(),
            Arc::clone(&logger),
            ToolRunner::default().with_logger(logger),
            self.services(),
            Arc::clone(&self.admission),
        )
    }

    /// Write a "video" holding `secs` of tone at the profiler rate.
    pub fn write_tone_video(&self, hz: f64, secs: f64) {
        let samples = tone(hz, secs, self.settings.profiler.sample_rate);
        fs::write(&self.video, ffmpeg::f64_samples_to_bytes(&samples)).unwrap();
    }

    /// A 10 s, 720p source with a low (male) voice.
    pub fn prepared_media(&self) -> PreparedMedia {
        let sample_rate = self.settings.profiler.sample_rate;
        PreparedMedia {
            video_secs: Some(10.0),
            frame_height: Some(720),
            source_audio: AudioBuffer::new(tone(120.0, 2.0, sample_rate), sample_rate),
        }
    }

    pub fn transcribed_state(&self) -> JobState {
        let mut state = JobState::new(JOB_ID);
        state.media = Some(self.prepared_media());
        state.transcript = Some(TranscriptOutput {
            detected_language: Some("en".to_string()),
            segments: fixture_segments(),
            translate: true,
            fingerprint: "fixture".to_string(),
        });
        state
    }

    /// State after Merge and Profile have run.
    pub fn profiled_state(&self) -> JobState {
        let ctx = self.context();
        let mut state = self.transcribed_state();
        MergeStep::new().execute(&ctx, &mut state).unwrap();
        ProfileStep::new().execute(&ctx, &mut state).unwrap();
        state
    }
}
