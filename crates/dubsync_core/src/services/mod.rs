//! External collaborators: recognizer, translator and speech synthesizers.
//!
//! Each is a trait so the pipeline can be driven by real services or test
//! doubles. Heavy services are constructed once and shared by `Arc`.

mod recognizer;
mod strategy;
mod synthesizer;
mod translator;

pub use recognizer::{Recognizer, RecognizerError, RecognizerResult, TranscriptFileRecognizer};
pub use strategy::{StrategyChain, StrategyExhausted, StrategySuccess};
pub use synthesizer::{
    EdgeTtsSynthesizer, EspeakSynthesizer, SynthesisError, SynthesisRequest, SynthesisResult,
    Synthesizer,
};
pub use translator::{HttpTranslator, TranslationError, TranslationResult, Translator};
