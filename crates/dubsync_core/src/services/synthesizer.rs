//! Text-to-speech boundary and the process-based backends.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::media::{MediaError, ToolRunner};
use crate::models::{DubLanguage, SpeakerClass};

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Synthesizer produced no file at {0}")]
    MissingOutput(PathBuf),

    #[error("Synthesized clip {path} is {bytes} bytes (minimum {min})")]
    TooSmall { path: PathBuf, bytes: u64, min: u64 },

    #[error("Synthesized clip decoded to no audio")]
    EmptyAudio,
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// One rendering request.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    /// Backend-specific voice id (used by neural backends).
    pub voice: &'a str,
    /// Signed speech-rate change in percent (`+10` = 10% faster).
    pub rate_percent: i32,
    pub language: DubLanguage,
    pub speaker: SpeakerClass,
}

/// Renders text to an audio file.
pub trait Synthesizer: Send + Sync {
    fn name(&self) -> &str;

    fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> SynthesisResult<()>;

    /// Output file extension this backend writes.
    fn extension(&self) -> &str {
        "wav"
    }
}

/// Neural voices through the `edge-tts` command.
pub struct EdgeTtsSynthesizer {
    runner: ToolRunner,
    command: String,
}

impl EdgeTtsSynthesizer {
    pub fn new(runner: ToolRunner, command: impl Into<String>) -> Self {
        Self {
            runner,
            command: command.into(),
        }
    }

    pub fn args(request: &SynthesisRequest<'_>, output: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            request.voice.to_string(),
            format!("--rate={:+}%", request.rate_percent),
            format!("--text={}", request.text),
            "--write-media".to_string(),
            output.display().to_string(),
        ]
    }
}

impl Synthesizer for EdgeTtsSynthesizer {
    fn name(&self) -> &str {
        "edge-tts"
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> SynthesisResult<()> {
        self.runner.run(&self.command, &Self::args(request, output))?;
        Ok(())
    }

    fn extension(&self) -> &str {
        "mp3"
    }
}

/// Offline formant synthesis through `espeak-ng`.
///
/// Ignores neural voice ids; picks a gendered variant of the language voice.
pub struct EspeakSynthesizer {
    runner: ToolRunner,
    command: String,
}

/// espeak-ng default speaking speed in words per minute.
const ESPEAK_BASE_WPM: f64 = 175.0;

impl EspeakSynthesizer {
    pub fn new(runner: ToolRunner, command: impl Into<String>) -> Self {
        Self {
            runner,
            command: command.into(),
        }
    }

    pub fn words_per_minute(rate_percent: i32) -> u32 {
        let wpm = ESPEAK_BASE_WPM * (1.0 + rate_percent as f64 / 100.0);
        wpm.round().clamp(80.0, 450.0) as u32
    }

    pub fn voice_name(language: DubLanguage, speaker: SpeakerClass) -> String {
        match speaker {
            SpeakerClass::Male => format!("{}+m3", language.code()),
            SpeakerClass::Female => format!("{}+f3", language.code()),
            SpeakerClass::Unknown => language.code().to_string(),
        }
    }

    pub fn args(request: &SynthesisRequest<'_>, output: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            Self::voice_name(request.language, request.speaker),
            "-s".to_string(),
            Self::words_per_minute(request.rate_percent).to_string(),
            "-w".to_string(),
            output.display().to_string(),
            "--stdin".to_string(),
        ]
    }
}

impl Synthesizer for EspeakSynthesizer {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> SynthesisResult<()> {
        self.runner.run_piped(
            &self.command,
            &Self::args(request, output),
            Some(request.text.as_bytes()),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rate_percent: i32) -> SynthesisRequest<'static> {
        SynthesisRequest {
            text: "-hola",
            voice: "es-ES-ElviraNeural",
            rate_percent,
            language: DubLanguage::Spanish,
            speaker: SpeakerClass::Female,
        }
    }

    #[test]
    fn edge_tts_args_sign_rate() {
        let args = EdgeTtsSynthesizer::args(&request(0), Path::new("out.mp3"));
        assert_eq!(
            args,
            vec![
                "--voice",
                "es-ES-ElviraNeural",
                "--rate=+0%",
                "--text=-hola",
                "--write-media",
                "out.mp3"
            ]
        );
        let args = EdgeTtsSynthesizer::args(&request(30), Path::new("out.mp3"));
        assert_eq!(args[2], "--rate=+30%");
    }

    #[test]
    fn espeak_speed_follows_rate() {
        assert_eq!(EspeakSynthesizer::words_per_minute(0), 175);
        assert_eq!(EspeakSynthesizer::words_per_minute(40), 245);
        assert_eq!(EspeakSynthesizer::words_per_minute(-90), 80);
    }

    #[test]
    fn espeak_voice_variants() {
        assert_eq!(
            EspeakSynthesizer::voice_name(DubLanguage::Hindi, SpeakerClass::Male),
            "hi+m3"
        );
        assert_eq!(
            EspeakSynthesizer::voice_name(DubLanguage::English, SpeakerClass::Unknown),
            "en"
        );
        let args = EspeakSynthesizer::args(&request(10), Path::new("o.wav"));
        assert_eq!(args, vec!["-v", "es+f3", "-s", "193", "-w", "o.wav", "--stdin"]);
    }
}
