//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CaptionStyle, SpeakerClass};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Segment merging thresholds.
    #[serde(default)]
    pub merge: MergeSettings,

    /// Speaker pitch profiling.
    #[serde(default)]
    pub profiler: ProfilerSettings,

    /// Machine translation endpoint.
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Speech synthesis and voice selection.
    #[serde(default)]
    pub synthesis: SynthesisSettings,

    /// Duration fitting.
    #[serde(default)]
    pub fit: FitSettings,

    /// Timeline stitching.
    #[serde(default)]
    pub timeline: TimelineSettings,

    /// Loudness normalization.
    #[serde(default)]
    pub loudness: LoudnessSettings,

    /// Caption writing and burning.
    #[serde(default)]
    pub captions: CaptionSettings,

    /// Final mux encoding.
    #[serde(default)]
    pub mux: MuxSettings,

    /// Job status and admission.
    #[serde(default)]
    pub jobs: JobSettings,
}

/// Path configuration for output, work and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root of the per-job data tree (`<root>/<job>/dubs/<lang>/`).
    #[serde(default = "default_data_root")]
    pub data_root: String,

    /// Root folder for temporary per-job work files.
    #[serde(default = "default_work_root")]
    pub work_root: String,

    /// Folder for application log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Keep per-job work files after the job finishes.
    #[serde(default)]
    pub keep_work_files: bool,
}

fn default_data_root() -> String {
    "dub_data".to_string()
}

fn default_work_root() -> String {
    ".dub_work".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            work_root: default_work_root(),
            logs_folder: default_logs_folder(),
            keep_work_files: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format (process output only kept in the tail buffer).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of process output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log each media tool argument list as JSON.
    #[serde(default)]
    pub show_commands_json: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    200
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_commands_json: false,
        }
    }
}

/// Segment merging thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Largest pause (seconds) that still allows two segments to merge.
    #[serde(default = "default_max_gap")]
    pub max_gap_secs: f64,

    /// Accumulators shorter than this always absorb the next segment.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Merged text may not grow beyond this many characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_gap() -> f64 {
    0.18
}

fn default_min_chars() -> usize {
    10
}

fn default_max_chars() -> usize {
    220
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            max_gap_secs: default_max_gap(),
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
        }
    }
}

/// Speaker pitch profiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerSettings {
    /// Operator override; skips analysis when set to male or female.
    #[serde(default)]
    pub forced_class: Option<SpeakerClass>,

    /// Sample rate the source audio is decoded at for analysis.
    #[serde(default = "default_profiler_rate")]
    pub sample_rate: u32,

    /// Only the first N seconds are analysed.
    #[serde(default = "default_max_analysis")]
    pub max_analysis_secs: f64,

    #[serde(default = "default_window_ms")]
    pub window_ms: f64,

    #[serde(default = "default_hop_ms")]
    pub hop_ms: f64,

    #[serde(default = "default_min_hz")]
    pub min_hz: f64,

    #[serde(default = "default_max_hz")]
    pub max_hz: f64,

    /// Minimum RMS of a window for it to be considered voiced.
    #[serde(default = "default_min_rms")]
    pub min_rms: f64,

    /// Minimum peak-to-zero-lag autocorrelation ratio.
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// Median pitch below this is classified male.
    #[serde(default = "default_male_below")]
    pub male_below_hz: f64,

    /// Median pitch above this is classified female.
    #[serde(default = "default_female_above")]
    pub female_above_hz: f64,
}

fn default_profiler_rate() -> u32 {
    16000
}

fn default_max_analysis() -> f64 {
    120.0
}

fn default_window_ms() -> f64 {
    40.0
}

fn default_hop_ms() -> f64 {
    10.0
}

fn default_min_hz() -> f64 {
    70.0
}

fn default_max_hz() -> f64 {
    300.0
}

fn default_min_rms() -> f64 {
    0.01
}

fn default_confidence() -> f64 {
    0.25
}

fn default_male_below() -> f64 {
    145.0
}

fn default_female_above() -> f64 {
    190.0
}

impl Default for ProfilerSettings {
    fn default() -> Self {
        Self {
            forced_class: None,
            sample_rate: default_profiler_rate(),
            max_analysis_secs: default_max_analysis(),
            window_ms: default_window_ms(),
            hop_ms: default_hop_ms(),
            min_hz: default_min_hz(),
            max_hz: default_max_hz(),
            min_rms: default_min_rms(),
            confidence: default_confidence(),
            male_below_hz: default_male_below(),
            female_above_hz: default_female_above(),
        }
    }
}

/// LibreTranslate-compatible translation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSettings {
    /// POST endpoint accepting `{q, source, target, format}`.
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,

    /// Optional API key sent as `api_key`.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_translate_endpoint() -> String {
    "http://127.0.0.1:5000/translate".to_string()
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: default_translate_endpoint(),
            api_key: None,
        }
    }
}

/// Voice identifiers for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSet {
    pub male: String,
    pub female: String,
    /// Used when the speaker class is unknown.
    pub default: String,
}

/// Speech synthesis and voice selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Native speech-rate ladder in signed percent, tried in order.
    #[serde(default = "default_rate_ladder")]
    pub rate_ladder: Vec<i32>,

    /// An attempt fits when its raw duration is at most this ratio of the target.
    #[serde(default = "default_over_target")]
    pub over_target_ratio: f64,

    /// Synthesized files smaller than this are treated as failures.
    #[serde(default = "default_min_clip_bytes")]
    pub min_clip_bytes: u64,

    /// Primary neural TTS command.
    #[serde(default = "default_edge_tts_bin")]
    pub edge_tts_bin: String,

    /// Fallback lightweight TTS command.
    #[serde(default = "default_espeak_bin")]
    pub espeak_bin: String,

    /// Per-language voice overrides keyed by language code.
    #[serde(default)]
    pub voices: BTreeMap<String, VoiceSet>,
}

fn default_rate_ladder() -> Vec<i32> {
    vec![0, 10, 20, 30, 40]
}

fn default_over_target() -> f64 {
    1.06
}

fn default_min_clip_bytes() -> u64 {
    2048
}

fn default_edge_tts_bin() -> String {
    "edge-tts".to_string()
}

fn default_espeak_bin() -> String {
    "espeak-ng".to_string()
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            rate_ladder: default_rate_ladder(),
            over_target_ratio: default_over_target(),
            min_clip_bytes: default_min_clip_bytes(),
            edge_tts_bin: default_edge_tts_bin(),
            espeak_bin: default_espeak_bin(),
            voices: BTreeMap::new(),
        }
    }
}

/// Duration fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSettings {
    /// Working sample rate for all synthesized speech.
    #[serde(default = "default_work_rate")]
    pub sample_rate: u32,

    /// Smallest tempo factor a single atempo step accepts.
    #[serde(default = "default_min_tempo")]
    pub min_tempo: f64,

    /// Largest tempo factor a single atempo step accepts.
    #[serde(default = "default_max_tempo")]
    pub max_tempo: f64,

    /// Edge fade length in milliseconds (capped at a quarter of the clip).
    #[serde(default = "default_fade_ms")]
    pub fade_ms: f64,

    /// Maximum allowed deviation of a fitted clip from its target.
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: f64,
}

fn default_work_rate() -> u32 {
    24000
}

fn default_min_tempo() -> f64 {
    0.5
}

fn default_max_tempo() -> f64 {
    2.0
}

fn default_fade_ms() -> f64 {
    25.0
}

fn default_tolerance_ms() -> f64 {
    5.0
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_work_rate(),
            min_tempo: default_min_tempo(),
            max_tempo: default_max_tempo(),
            fade_ms: default_fade_ms(),
            tolerance_ms: default_tolerance_ms(),
        }
    }
}

/// Timeline stitching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// Gaps shorter than this are not rendered as silence.
    #[serde(default = "default_min_gap")]
    pub min_gap_secs: f64,
}

fn default_min_gap() -> f64 {
    0.02
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            min_gap_secs: default_min_gap(),
        }
    }
}

/// Loudness normalization (ffmpeg loudnorm).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoudnessSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Integrated loudness target (LUFS).
    #[serde(default = "default_integrated")]
    pub integrated: f64,

    /// Loudness range target (LU).
    #[serde(default = "default_lra")]
    pub lra: f64,

    /// True peak ceiling (dBTP).
    #[serde(default = "default_true_peak")]
    pub true_peak: f64,
}

fn default_integrated() -> f64 {
    -16.0
}

fn default_lra() -> f64 {
    11.0
}

fn default_true_peak() -> f64 {
    -1.5
}

impl Default for LoudnessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            integrated: default_integrated(),
            lra: default_lra(),
            true_peak: default_true_peak(),
        }
    }
}

/// Caption writing and burning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSettings {
    /// Burn captions into the output video.
    #[serde(default = "default_true")]
    pub burn: bool,

    #[serde(default)]
    pub style: CaptionStyle,

    /// Frame height the base sizes were tuned for.
    #[serde(default = "default_reference_height")]
    pub reference_height: u32,

    #[serde(default = "default_base_font_size")]
    pub base_font_size: f64,

    #[serde(default = "default_base_outline")]
    pub base_outline: f64,

    #[serde(default = "default_base_margin")]
    pub base_margin_v: f64,

    /// Lower clamp of the height scale factor.
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,

    /// Upper clamp of the height scale factor.
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,

    /// Caption lines are wrapped at this many characters.
    #[serde(default = "default_max_line_chars")]
    pub max_line_chars: usize,

    /// Per-language font preference overrides keyed by language code.
    #[serde(default)]
    pub fonts: BTreeMap<String, Vec<String>>,
}

fn default_reference_height() -> u32 {
    1080
}

fn default_base_font_size() -> f64 {
    24.0
}

fn default_base_outline() -> f64 {
    2.0
}

fn default_base_margin() -> f64 {
    40.0
}

fn default_min_scale() -> f64 {
    0.75
}

fn default_max_scale() -> f64 {
    1.25
}

fn default_max_line_chars() -> usize {
    42
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            burn: true,
            style: CaptionStyle::default(),
            reference_height: default_reference_height(),
            base_font_size: default_base_font_size(),
            base_outline: default_base_outline(),
            base_margin_v: default_base_margin(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            max_line_chars: default_max_line_chars(),
            fonts: BTreeMap::new(),
        }
    }
}

/// Final mux encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxSettings {
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Minimum size for a produced video to count as valid.
    #[serde(default = "default_min_video_bytes")]
    pub min_video_bytes: u64,
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

fn default_min_video_bytes() -> u64 {
    10_000
}

impl Default for MuxSettings {
    fn default() -> Self {
        Self {
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            min_video_bytes: default_min_video_bytes(),
        }
    }
}

/// Job status heartbeat and staleness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Seconds between heartbeat writes while a job runs.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,

    /// A running job whose heartbeat is older than this is reported stalled.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Reuse existing outputs when the job fingerprint matches.
    #[serde(default = "default_true")]
    pub reuse_cached: bool,
}

fn default_heartbeat() -> u64 {
    10
}

fn default_stale_after() -> u64 {
    180
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat(),
            stale_after_secs: default_stale_after(),
            reuse_cached: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Merge,
    Profiler,
    Translation,
    Synthesis,
    Fit,
    Timeline,
    Loudness,
    Captions,
    Mux,
    Jobs,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Merge => "merge",
            ConfigSection::Profiler => "profiler",
            ConfigSection::Translation => "translation",
            ConfigSection::Synthesis => "synthesis",
            ConfigSection::Fit => "fit",
            ConfigSection::Timeline => "timeline",
            ConfigSection::Loudness => "loudness",
            ConfigSection::Captions => "captions",
            ConfigSection::Mux => "mux",
            ConfigSection::Jobs => "jobs",
        }
    }

    /// All sections in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Merge,
            ConfigSection::Profiler,
            ConfigSection::Translation,
            ConfigSection::Synthesis,
            ConfigSection::Fit,
            ConfigSection::Timeline,
            ConfigSection::Loudness,
            ConfigSection::Captions,
            ConfigSection::Mux,
            ConfigSection::Jobs,
        ]
    }

    /// Comment line written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Data, work and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Merge => "Recognizer segment merging",
            ConfigSection::Profiler => "Speaker pitch profiling",
            ConfigSection::Translation => "Machine translation endpoint",
            ConfigSection::Synthesis => "Speech synthesis and voice table overrides",
            ConfigSection::Fit => "Clip duration fitting",
            ConfigSection::Timeline => "Timeline stitching",
            ConfigSection::Loudness => "Loudness normalization",
            ConfigSection::Captions => "Caption writing and burn-in",
            ConfigSection::Mux => "Final mux encoding",
            ConfigSection::Jobs => "Job status and caching",
        }
    }
}
