//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::audio::AudioBuffer;
use crate::captions::{FcListProbe, FontProbe};
use crate::config::Settings;
use crate::fit::{FfmpegTempo, TempoStretcher};
use crate::jobs::{Admission, DubLayout};
use crate::logging::{JobLogger, StageDecision};
use crate::media::{AudioDecoder, FfmpegDecoder, ToolRunner};
use crate::models::{DubLanguage, MergedSegment, RawSegment, SpeakerClass};
use crate::profiler::SpeakerProfile;
use crate::services::{EdgeTtsSynthesizer, EspeakSynthesizer, Recognizer, Synthesizer, Translator};
use crate::synthesis::SynthesisOutput;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// External collaborators used by the steps.
#[derive(Clone)]
pub struct DubServices {
    pub recognizer: Arc<dyn Recognizer>,
    pub translator: Option<Arc<dyn Translator>>,
    /// Synthesis backends in fallback order.
    pub synthesizers: Vec<Arc<dyn Synthesizer>>,
    pub decoder: Arc<dyn AudioDecoder>,
    pub stretcher: Arc<dyn TempoStretcher>,
    pub font_probe: Arc<dyn FontProbe>,
}

impl DubServices {
    /// Process-backed tools (edge-tts, espeak-ng, ffmpeg, fc-list) sharing `runner`.
    pub fn process_backed(
        runner: &ToolRunner,
        settings: &Settings,
        recognizer: Arc<dyn Recognizer>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Self {
        Self {
            recognizer,
            translator,
            synthesizers: vec![
                Arc::new(EdgeTtsSynthesizer::new(
                    runner.clone(),
                    &settings.synthesis.edge_tts_bin,
                )),
                Arc::new(EspeakSynthesizer::new(
                    runner.clone(),
                    &settings.synthesis.espeak_bin,
                )),
            ],
            decoder: Arc::new(FfmpegDecoder::new(runner.clone())),
            stretcher: Arc::new(FfmpegTempo::new(runner.clone())),
            font_probe: Arc::new(FcListProbe::new(runner.clone())),
        }
    }
}

/// Builds the services for one job around that job's tool runner.
///
/// Heavy collaborators (recognizer, translator) are captured by `Arc`
/// so they are constructed once and shared across jobs.
pub type ServiceFactory = Arc<dyn Fn(&ToolRunner) -> DubServices + Send + Sync>;

/// Read-only context passed to pipeline steps.
pub struct Context {
    pub job_id: String,
    pub language: DubLanguage,
    /// Source video.
    pub video: PathBuf,
    pub settings: Settings,
    pub layout: DubLayout,
    pub logger: Arc<JobLogger>,
    /// Tool runner mirroring commands into the job log.
    pub runner: ToolRunner,
    pub services: DubServices,
    pub admission: Arc<Admission>,
    /// Fingerprint recorded with the currently published outputs.
    pub published_fingerprint: Option<String>,
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: impl Into<String>,
        language: DubLanguage,
        video: PathBuf,
        settings: Settings,
        layout: DubLayout,
        logger: Arc<JobLogger>,
        runner: ToolRunner,
        services: DubServices,
        admission: Arc<Admission>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            language,
            video,
            settings,
            layout,
            logger,
            runner,
            services,
            admission,
            published_fingerprint: None,
            progress_callback: None,
        }
    }

    pub fn with_published_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.published_fingerprint = fingerprint;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    pub fn work_dir(&self) -> &Path {
        self.layout.work_dir()
    }

    /// Log and keep a stage decision.
    pub fn decide(&self, decision: StageDecision) {
        self.logger.decision(decision);
    }
}

/// Output of the Prepare step.
#[derive(Debug, Clone)]
pub struct PreparedMedia {
    pub video_secs: Option<f64>,
    pub frame_height: Option<u32>,
    /// Mono source audio at the profiler sample rate.
    pub source_audio: AudioBuffer,
}

/// Output of the Transcribe step.
#[derive(Debug, Clone)]
pub struct TranscriptOutput {
    pub detected_language: Option<String>,
    pub segments: Vec<RawSegment>,
    /// False when the source already is in the target language.
    pub translate: bool,
    pub fingerprint: String,
}

/// Output of the Profile step.
#[derive(Debug, Clone)]
pub struct VoiceOutput {
    pub profile: SpeakerProfile,
    pub voice: String,
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Steps add their own section and never overwrite another step's.
#[derive(Debug, Default)]
pub struct JobState {
    pub job_id: String,
    pub started_at: Option<String>,
    pub media: Option<PreparedMedia>,
    pub transcript: Option<TranscriptOutput>,
    pub segments: Option<Vec<MergedSegment>>,
    pub voice: Option<VoiceOutput>,
    pub synthesis: Option<SynthesisOutput>,
    pub stitched: Option<AudioBuffer>,
    /// Final-length dub track.
    pub aligned: Option<AudioBuffer>,
    /// Work-dir WAV of the aligned track before loudness normalization.
    pub raw_audio_path: Option<PathBuf>,
    /// Work-dir `audio.wav`.
    pub audio_path: Option<PathBuf>,
    /// Work-dir video with the dub track, before captions.
    pub muxed_path: Option<PathBuf>,
    pub captions_path: Option<PathBuf>,
    /// Work-dir `video.mp4`.
    pub video_path: Option<PathBuf>,
    /// Outputs reused from a matching earlier run.
    pub cached: bool,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.transcript.as_ref().map(|t| t.fingerprint.as_str())
    }

    pub fn speaker_class(&self) -> SpeakerClass {
        self.voice
            .as_ref()
            .map(|v| v.profile.class)
            .unwrap_or_default()
    }
}

/// Summary written to `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub lang: String,
    pub cached: bool,
    pub speaker_class: SpeakerClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_hz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    pub segments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_secs: Option<f64>,
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
    pub decisions: Vec<StageDecision>,
}

impl JobReport {
    pub fn build(ctx: &Context, state: &JobState, run: &super::PipelineRunResult) -> Self {
        Self {
            job_id: ctx.job_id.clone(),
            lang: ctx.language.code().to_string(),
            cached: state.cached,
            speaker_class: state.speaker_class(),
            median_hz: state
                .voice
                .as_ref()
                .and_then(|v| v.profile.estimate.as_ref())
                .and_then(|e| e.median_hz),
            voice: state.voice.as_ref().map(|v| v.voice.clone()),
            segments: state.segments.as_ref().map(Vec::len).unwrap_or(0),
            video_secs: state.media.as_ref().and_then(|m| m.video_secs),
            audio_secs: state.aligned.as_ref().map(AudioBuffer::duration_secs),
            steps_completed: run.steps_completed.clone(),
            steps_skipped: run.steps_skipped.clone(),
            decisions: ctx.logger.decisions(),
        }
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (not an error).
    Skipped(String),
    /// The job is complete; remaining steps do not run.
    Finished(String),
}
