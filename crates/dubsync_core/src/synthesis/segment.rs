//! Per-segment translate → synthesize → fit.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::AudioBuffer;
use crate::fit::{DurationFitter, FittedClip};
use crate::logging::{JobLogger, StageDecision};
use crate::media::AudioDecoder;
use crate::merge::{normalize_text, MIN_WINDOW_SECS};
use crate::models::{CaptionEntry, DubLanguage, MergedSegment, SpeakerClass};
use crate::config::SynthesisSettings;
use crate::services::{
    StrategyChain, SynthesisError, SynthesisRequest, SynthesisResult, Synthesizer, Translator,
};

use super::{SegmentError, SegmentResult};

/// Strategy name used when the source text is spoken untranslated.
const SOURCE_TEXT: &str = "source-text";

/// Job-wide synthesis choices.
#[derive(Debug, Clone)]
pub struct SynthesisPlan {
    pub target: DubLanguage,
    /// False when the source is already in the target language.
    pub translate: bool,
    pub voice: String,
    pub speaker: SpeakerClass,
}

/// A fitted clip plus its caption.
#[derive(Debug, Clone)]
pub struct SynthesizedSegment {
    pub clip: FittedClip,
    pub caption: CaptionEntry,
    pub backend: String,
    pub rate_percent: i32,
}

/// All fitted clips and captions of a job, in segment order.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutput {
    pub clips: Vec<FittedClip>,
    pub captions: Vec<CaptionEntry>,
}

struct LadderAttempt {
    rate_percent: i32,
    audio: AudioBuffer,
}

/// Renders each merged segment into a clip of exactly its window.
///
/// Backends are tried in order; each walks the native-rate ladder before
/// the fitter applies any post-hoc speed-up.
pub struct SegmentSynthesizer {
    translator: Option<Arc<dyn Translator>>,
    backends: Vec<Arc<dyn Synthesizer>>,
    decoder: Arc<dyn AudioDecoder>,
    fitter: DurationFitter,
    settings: SynthesisSettings,
    clip_dir: PathBuf,
    logger: Arc<JobLogger>,
}

impl SegmentSynthesizer {
    pub fn new(
        backends: Vec<Arc<dyn Synthesizer>>,
        decoder: Arc<dyn AudioDecoder>,
        fitter: DurationFitter,
        settings: SynthesisSettings,
        clip_dir: impl Into<PathBuf>,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            translator: None,
            backends,
            decoder,
            fitter,
            settings,
            clip_dir: clip_dir.into(),
            logger,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Synthesize every segment strictly in order.
    pub fn synthesize_all(
        &self,
        segments: &[MergedSegment],
        plan: &SynthesisPlan,
    ) -> SegmentResult<SynthesisOutput> {
        fs::create_dir_all(&self.clip_dir)
            .map_err(|e| SegmentError::io("creating clip directory", e))?;

        let mut output = SynthesisOutput::default();
        let total = segments.len().max(1);

        for (index, segment) in segments.iter().enumerate() {
            let done = self.synthesize_segment(index, segment, plan)?;
            output.clips.push(done.clip);
            output.captions.push(done.caption);
            self.logger
                .progress((((index + 1) * 100) / total).min(100) as u32);
        }

        Ok(output)
    }

    /// Synthesize one segment into a clip and its caption.
    ///
    /// The merger never emits windows under [`MIN_WINDOW_SECS`]; such a
    /// window here is an error rather than a silently dropped caption.
    pub fn synthesize_segment(
        &self,
        index: usize,
        segment: &MergedSegment,
        plan: &SynthesisPlan,
    ) -> SegmentResult<SynthesizedSegment> {
        let target_secs = segment.duration();
        if target_secs < MIN_WINDOW_SECS {
            return Err(SegmentError::EmptyWindow {
                segment: index,
                start: segment.start,
            });
        }

        let text = self.spoken_text(index, &segment.text, plan)?;
        let text_ref = text.as_str();

        let mut chain = StrategyChain::new();
        for backend in &self.backends {
            let backend = backend.as_ref();
            chain = chain.then(backend.name(), move || {
                self.render_with_ladder(backend, index, text_ref, plan, target_secs)
            });
        }

        let success = chain
            .run()
            .map_err(|exhausted| SegmentError::AllBackendsFailed {
                segment: index,
                reasons: exhausted.to_string(),
            })?;

        for (backend, err) in &success.failures {
            self.logger.decision(StageDecision::BackendFailed {
                segment: index,
                backend: backend.clone(),
                reason: err.to_string(),
            });
        }

        let attempt = success.value;
        let raw_secs = attempt.audio.duration_secs();
        let clip = self
            .fitter
            .fit(index, attempt.audio, target_secs)
            .map_err(|source| SegmentError::Fit {
                segment: index,
                source,
            })?;

        self.logger.decision(StageDecision::SegmentSynthesized {
            segment: index,
            backend: success.name.clone(),
            rate_percent: attempt.rate_percent,
            raw_secs,
            target_secs,
            tempo_chain: clip.tempo_chain.clone(),
        });

        Ok(SynthesizedSegment {
            caption: CaptionEntry {
                start: segment.start,
                end: segment.end,
                text,
            },
            clip,
            backend: success.name,
            rate_percent: attempt.rate_percent,
        })
    }

    /// Translate if needed, falling back to the source text on errors.
    fn spoken_text(&self, index: usize, text: &str, plan: &SynthesisPlan) -> SegmentResult<String> {
        if text.trim().is_empty() {
            return Err(SegmentError::EmptyText(index));
        }
        if !plan.translate {
            return Ok(text.to_string());
        }

        let Some(translator) = self.translator.as_ref() else {
            self.logger.decision(StageDecision::TranslationFallback {
                segment: index,
                reason: "no translator configured".to_string(),
            });
            return Ok(text.to_string());
        };

        let outcome = StrategyChain::new()
            .then(translator.name(), || translator.translate(text, plan.target))
            .then(SOURCE_TEXT, || Ok(text.to_string()))
            .run();

        let success = match outcome {
            Ok(success) => success,
            Err(_) => return Ok(text.to_string()),
        };

        if let Some((_, err)) = success.failures.last() {
            self.logger.decision(StageDecision::TranslationFallback {
                segment: index,
                reason: err.to_string(),
            });
        }

        let translated = normalize_text(&success.value);
        if translated.is_empty() {
            return Err(SegmentError::EmptyTranslation(index));
        }
        Ok(translated)
    }

    /// Walk the rate ladder, accepting the first clip within the over-target ratio.
    ///
    /// If no rung fits, the fastest successful rung is returned for speed-up.
    fn render_with_ladder(
        &self,
        backend: &dyn Synthesizer,
        index: usize,
        text: &str,
        plan: &SynthesisPlan,
        target_secs: f64,
    ) -> SynthesisResult<LadderAttempt> {
        let limit = target_secs * self.settings.over_target_ratio;
        let mut fastest: Option<LadderAttempt> = None;
        let mut last_error: Option<SynthesisError> = None;

        for &rate in &self.settings.rate_ladder {
            let path = self.clip_dir.join(format!(
                "seg{:04}_{}_{:+}.{}",
                index,
                backend.name(),
                rate,
                backend.extension()
            ));
            let request = SynthesisRequest {
                text,
                voice: &plan.voice,
                rate_percent: rate,
                language: plan.target,
                speaker: plan.speaker,
            };

            match self.render_once(backend, &request, &path) {
                Ok(audio) => {
                    let raw = audio.duration_secs();
                    if raw <= limit {
                        return Ok(LadderAttempt {
                            rate_percent: rate,
                            audio,
                        });
                    }
                    self.logger.debug(&format!(
                        "seg={} {} rate={:+}% raw={:.3}s over limit {:.3}s",
                        index,
                        backend.name(),
                        rate,
                        raw,
                        limit
                    ));
                    fastest = Some(LadderAttempt {
                        rate_percent: rate,
                        audio,
                    });
                }
                Err(e) => {
                    self.logger.warn(&format!(
                        "seg={} {} rate={:+}% failed: {}",
                        index,
                        backend.name(),
                        rate,
                        e
                    ));
                    last_error = Some(e);
                }
            }
        }

        match (fastest, last_error) {
            (Some(attempt), _) => Ok(attempt),
            (None, Some(e)) => Err(e),
            (None, None) => Err(SynthesisError::EmptyAudio),
        }
    }

    /// Render one attempt and validate the produced file.
    fn render_once(
        &self,
        backend: &dyn Synthesizer,
        request: &SynthesisRequest<'_>,
        path: &Path,
    ) -> SynthesisResult<AudioBuffer> {
        // a stale file from an earlier run must not pass validation
        let _ = fs::remove_file(path);

        backend.synthesize(request, path)?;

        let bytes = fs::metadata(path)
            .map_err(|_| SynthesisError::MissingOutput(path.to_path_buf()))?
            .len();
        if bytes < self.settings.min_clip_bytes {
            return Err(SynthesisError::TooSmall {
                path: path.to_path_buf(),
                bytes,
                min: self.settings.min_clip_bytes,
            });
        }

        let audio = self
            .decoder
            .decode(path, self.fitter.settings().sample_rate)?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitSettings;
    use crate::fit::ResampleTempo;
    use crate::logging::LogConfig;
    use crate::media::{ffmpeg, MediaError, RawF64Decoder};
    use crate::services::{TranslationError, TranslationResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};

    const RATE: u32 = 1000;

    /// Speaks 0.1 s per character, shortened by the rate percentage.
    struct PacedSynth {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl PacedSynth {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Synthesizer for PacedSynth {
        fn name(&self) -> &str {
            self.name
        }

        fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> SynthesisResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let secs = request.text.chars().count() as f64 * 0.1
                / (1.0 + request.rate_percent as f64 / 100.0);
            let samples = vec![0.5; (secs * RATE as f64).round() as usize];
            fs::write(output, ffmpeg::f64_samples_to_bytes(&samples))
                .map_err(|e| MediaError::io("writing clip", e))?;
            Ok(())
        }
    }

    struct BrokenSynth;

    impl Synthesizer for BrokenSynth {
        fn name(&self) -> &str {
            "broken"
        }

        fn synthesize(&self, _: &SynthesisRequest<'_>, _: &Path) -> SynthesisResult<()> {
            Err(MediaError::ToolNotFound {
                tool: "edge-tts".into(),
            }
            .into())
        }
    }

    struct TinySynth;

    impl Synthesizer for TinySynth {
        fn name(&self) -> &str {
            "tiny"
        }

        fn synthesize(&self, _: &SynthesisRequest<'_>, output: &Path) -> SynthesisResult<()> {
            fs::write(output, [0u8; 100]).map_err(|e| MediaError::io("writing clip", e))?;
            Ok(())
        }
    }

    enum FakeTranslator {
        Prefix,
        Down,
        Blank,
    }

    impl Translator for FakeTranslator {
        fn name(&self) -> &str {
            "fake"
        }

        fn translate(&self, text: &str, target: DubLanguage) -> TranslationResult<String> {
            match self {
                FakeTranslator::Prefix => Ok(format!("{}:{}", target, text)),
                FakeTranslator::Down => Err(TranslationError::Unavailable("offline".into())),
                FakeTranslator::Blank => Ok("   ".into()),
            }
        }
    }

    fn logger(dir: &TempDir) -> Arc<JobLogger> {
        Arc::new(
            JobLogger::new(
                "job",
                dir.path().join("log.txt"),
                LogConfig {
                    show_timestamps: false,
                    ..LogConfig::default()
                },
                None,
            )
            .unwrap(),
        )
    }

    fn synthesizer(dir: &TempDir, backends: Vec<Arc<dyn Synthesizer>>) -> SegmentSynthesizer {
        fs::create_dir_all(dir.path().join("clips")).unwrap();
        let fitter = DurationFitter::new(
            FitSettings {
                sample_rate: RATE,
                ..FitSettings::default()
            },
            Arc::new(ResampleTempo),
        );
        SegmentSynthesizer::new(
            backends,
            Arc::new(RawF64Decoder),
            fitter,
            SynthesisSettings::default(),
            dir.path().join("clips"),
            logger(dir),
        )
    }

    fn plan(translate: bool) -> SynthesisPlan {
        SynthesisPlan {
            target: DubLanguage::Hindi,
            translate,
            voice: "hi-IN-SwaraNeural".into(),
            speaker: SpeakerClass::Unknown,
        }
    }

    fn segment(start: f64, end: f64) -> MergedSegment {
        MergedSegment {
            start,
            end,
            text: "abcdefghij".into(),
        }
    }

    #[test]
    fn base_rate_accepted_when_it_fits() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))]);

        let done = synth
            .synthesize_segment(0, &segment(2.0, 3.2), &plan(false))
            .unwrap();

        assert_eq!(done.rate_percent, 0);
        assert!(done.clip.tempo_chain.is_empty());
        assert_eq!(done.clip.audio.len(), 1200);
        assert_eq!(done.caption.start, 2.0);
        assert_eq!(done.caption.end, 3.2);
    }

    #[test]
    fn ladder_climbs_until_within_ratio() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))]);

        // raw: 1.0 → 0.909 → 0.833; limit 0.8 × 1.06 = 0.848
        let done = synth
            .synthesize_segment(0, &segment(0.0, 0.8), &plan(false))
            .unwrap();

        assert_eq!(done.rate_percent, 20);
        assert_eq!(done.clip.tempo_chain.len(), 1);
        assert_eq!(done.clip.audio.len(), 800);
    }

    #[test]
    fn fastest_rung_is_sped_up_when_nothing_fits() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))]);

        let done = synth
            .synthesize_segment(0, &segment(0.0, 0.3), &plan(false))
            .unwrap();

        assert_eq!(done.rate_percent, 40);
        let product: f64 = done.clip.tempo_chain.iter().product();
        assert!((product - (1.0 / 1.4) / 0.3).abs() < 0.01);
        assert_eq!(done.clip.audio.len(), 300);
    }

    #[test]
    fn secondary_backend_used_when_primary_fails() {
        let dir = tempdir().unwrap();
        let fallback = Arc::new(PacedSynth::new("espeak-ng"));
        let synth = synthesizer(&dir, vec![Arc::new(BrokenSynth), fallback.clone()]);

        let done = synth
            .synthesize_segment(0, &segment(0.0, 2.0), &plan(false))
            .unwrap();

        assert_eq!(done.backend, "espeak-ng");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
        assert!(synth.logger.decisions().iter().any(|d| matches!(
            d,
            StageDecision::BackendFailed { backend, .. } if backend == "broken"
        )));
    }

    #[test]
    fn undersized_clips_count_as_failures() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(TinySynth)]);

        let err = synth
            .synthesize_segment(4, &segment(0.0, 2.0), &plan(false))
            .unwrap_err();
        assert!(matches!(err, SegmentError::AllBackendsFailed { segment: 4, .. }));
        assert!(err.to_string().contains("bytes"));
    }

    #[test]
    fn all_backends_failing_is_fatal() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(BrokenSynth)]);
        assert!(matches!(
            synth.synthesize_segment(0, &segment(0.0, 1.0), &plan(false)),
            Err(SegmentError::AllBackendsFailed { .. })
        ));
    }

    #[test]
    fn translation_used_for_caption_and_speech() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))])
            .with_translator(Arc::new(FakeTranslator::Prefix));

        let done = synth
            .synthesize_segment(0, &segment(0.0, 2.0), &plan(true))
            .unwrap();
        assert_eq!(done.caption.text, "hi:abcdefghij");
    }

    #[test]
    fn translator_failure_falls_back_to_source() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))])
            .with_translator(Arc::new(FakeTranslator::Down));

        let done = synth
            .synthesize_segment(2, &segment(0.0, 2.0), &plan(true))
            .unwrap();
        assert_eq!(done.caption.text, "abcdefghij");
        assert!(matches!(
            synth.logger.decisions().first(),
            Some(StageDecision::TranslationFallback { segment: 2, .. })
        ));
    }

    #[test]
    fn empty_translation_is_fatal() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))])
            .with_translator(Arc::new(FakeTranslator::Blank));

        assert!(matches!(
            synth.synthesize_segment(1, &segment(0.0, 2.0), &plan(true)),
            Err(SegmentError::EmptyTranslation(1))
        ));
    }

    #[test]
    fn same_language_skips_translator() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))])
            .with_translator(Arc::new(FakeTranslator::Blank));

        let done = synth
            .synthesize_segment(0, &segment(0.0, 2.0), &plan(false))
            .unwrap();
        assert_eq!(done.caption.text, "abcdefghij");
    }

    #[test]
    fn synthesize_all_keeps_order() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))]);

        let segments = vec![segment(0.0, 1.5), segment(2.0, 2.5), segment(3.0, 4.5)];
        let output = synth.synthesize_all(&segments, &plan(false)).unwrap();

        assert_eq!(output.clips.len(), 3);
        assert_eq!(output.captions.len(), 3);
        assert_eq!(output.clips[2].segment_index, 2);
        assert_eq!(output.captions[1].start, 2.0);
        assert_eq!(output.captions[2].start, 3.0);
    }

    #[test]
    fn sub_millisecond_window_is_an_error() {
        let dir = tempdir().unwrap();
        let synth = synthesizer(&dir, vec![Arc::new(PacedSynth::new("paced"))]);

        let segments = vec![segment(0.0, 1.5), segment(2.0, 2.0)];
        assert!(matches!(
            synth.synthesize_all(&segments, &plan(false)),
            Err(SegmentError::EmptyWindow { segment: 1, .. })
        ));
    }
}
