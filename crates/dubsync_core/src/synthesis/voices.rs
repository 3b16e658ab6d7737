//! Voice lookup per language and speaker class.

use std::collections::BTreeMap;

use crate::config::VoiceSet;
use crate::models::{DubLanguage, SpeakerClass};

/// Built-in neural voice table.
pub fn default_voices(language: DubLanguage) -> VoiceSet {
    let (male, female, default) = match language {
        DubLanguage::Hindi => ("hi-IN-MadhurNeural", "hi-IN-SwaraNeural", "hi-IN-SwaraNeural"),
        DubLanguage::English => ("en-US-GuyNeural", "en-US-JennyNeural", "en-US-AriaNeural"),
        DubLanguage::Spanish => ("es-ES-AlvaroNeural", "es-ES-ElviraNeural", "es-MX-DaliaNeural"),
    };
    VoiceSet {
        male: male.to_string(),
        female: female.to_string(),
        default: default.to_string(),
    }
}

/// Pick the voice for a speaker; `unknown` gets the language default.
///
/// Entries in `overrides` (keyed by language code) replace the built-in set.
pub fn select_voice(
    language: DubLanguage,
    speaker: SpeakerClass,
    overrides: &BTreeMap<String, VoiceSet>,
) -> String {
    let voices = overrides
        .get(language.code())
        .cloned()
        .unwrap_or_else(|| default_voices(language));

    match speaker {
        SpeakerClass::Male => voices.male,
        SpeakerClass::Female => voices.female,
        SpeakerClass::Unknown => voices.default,
    }
}
