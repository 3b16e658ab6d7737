//! Job fingerprints for the cached-result short-circuit.

use std::fs;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{
    CaptionSettings, FitSettings, LoudnessSettings, MergeSettings, MuxSettings, ProfilerSettings,
    Settings, SynthesisSettings, TimelineSettings,
};
use crate::models::{DubLanguage, RawSegment, Transcript};

/// Bump when the output format changes so old outputs are not reused.
const FINGERPRINT_VERSION: u32 = 2;

#[derive(Serialize)]
struct FingerprintInput<'a> {
    version: u32,
    lang: &'a str,
    video_name: Option<String>,
    video_bytes: u64,
    source_language: Option<&'a str>,
    segments: &'a [RawSegment],
    translate: bool,
    /// Identity of the translator whose text is spoken; `None` speaks the source.
    translator: Option<&'a str>,
    merge: &'a MergeSettings,
    profiler: &'a ProfilerSettings,
    synthesis: &'a SynthesisSettings,
    fit: &'a FitSettings,
    timeline: &'a TimelineSettings,
    loudness: &'a LoudnessSettings,
    captions: &'a CaptionSettings,
    mux: &'a MuxSettings,
}

/// SHA-256 over everything that shapes a dub's outputs.
///
/// `translator` is only consulted when `translate` is set, since the
/// source text is spoken otherwise.
pub fn job_fingerprint(
    video: &Path,
    language: DubLanguage,
    transcript: &Transcript,
    translate: bool,
    translator: Option<&str>,
    settings: &Settings,
) -> String {
    let input = FingerprintInput {
        version: FINGERPRINT_VERSION,
        lang: language.code(),
        video_name: video
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        video_bytes: fs::metadata(video).map(|m| m.len()).unwrap_or(0),
        source_language: transcript.language.as_deref(),
        segments: &transcript.segments,
        translate,
        translator: if translate { translator } else { None },
        merge: &settings.merge,
        profiler: &settings.profiler,
        synthesis: &settings.synthesis,
        fit: &settings.fit,
        timeline: &settings.timeline,
        loudness: &settings.loudness,
        captions: &settings.captions,
        mux: &settings.mux,
    };

    // serialization of plain data cannot fail; fall back to the debug form anyway
    let json =
        serde_json::to_string(&input).unwrap_or_else(|_| format!("{:?}", transcript.segments));

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn transcript(text: &str) -> Transcript {
        Transcript {
            language: Some("en".to_string()),
            segments: vec![RawSegment::new(0.0, 1.0, text)],
        }
    }

    fn fingerprint(language: DubLanguage, transcript: &Transcript, settings: &Settings) -> String {
        job_fingerprint(
            Path::new("missing.mp4"),
            language,
            transcript,
            true,
            None,
            settings,
        )
    }

    #[test]
    fn stable_for_same_inputs() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        fs::write(&video, b"video").unwrap();
        let settings = Settings::default();
        let t = transcript("hello");

        let a = job_fingerprint(&video, DubLanguage::Hindi, &t, true, Some("http"), &settings);
        let b = job_fingerprint(&video, DubLanguage::Hindi, &t, true, Some("http"), &settings);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn changes_with_language_segments_or_settings() {
        let settings = Settings::default();
        let base = fingerprint(DubLanguage::Hindi, &transcript("hello"), &settings);

        assert_ne!(
            base,
            fingerprint(DubLanguage::Spanish, &transcript("hello"), &settings)
        );
        assert_ne!(
            base,
            fingerprint(DubLanguage::Hindi, &transcript("hullo"), &settings)
        );

        let mut tweaked = Settings::default();
        tweaked.fit.max_tempo = 1.5;
        assert_ne!(
            base,
            fingerprint(DubLanguage::Hindi, &transcript("hello"), &tweaked)
        );
    }

    #[test]
    fn changes_with_translator_or_source_language() {
        let settings = Settings::default();
        let video = Path::new("missing.mp4");
        let t = transcript("hello");
        let untranslated = job_fingerprint(video, DubLanguage::Hindi, &t, true, None, &settings);
        let translated =
            job_fingerprint(video, DubLanguage::Hindi, &t, true, Some("http@a"), &settings);
        let other_endpoint =
            job_fingerprint(video, DubLanguage::Hindi, &t, true, Some("http@b"), &settings);

        assert_ne!(untranslated, translated);
        assert_ne!(translated, other_endpoint);

        let mut spanish_source = t.clone();
        spanish_source.language = Some("es".to_string());
        assert_ne!(
            untranslated,
            job_fingerprint(video, DubLanguage::Hindi, &spanish_source, true, None, &settings)
        );
    }

    #[test]
    fn translator_ignored_when_not_translating() {
        let settings = Settings::default();
        let video = Path::new("missing.mp4");
        let t = transcript("hello");

        assert_eq!(
            job_fingerprint(video, DubLanguage::English, &t, false, None, &settings),
            job_fingerprint(video, DubLanguage::English, &t, false, Some("http@a"), &settings)
        );
    }
}
