//! Core enums used throughout the pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse speaker class derived from the median source pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerClass {
    Male,
    Female,
    /// Ambiguous pitch or no confident voiced window.
    #[default]
    Unknown,
}

impl std::fmt::Display for SpeakerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeakerClass::Male => write!(f, "male"),
            SpeakerClass::Female => write!(f, "female"),
            SpeakerClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Error returned when a language code is not one we can dub into.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported lang: '{0}'")]
pub struct UnsupportedLanguage(pub String);

/// Target languages the dub pipeline supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DubLanguage {
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
}

impl DubLanguage {
    /// ISO 639-1 code used in paths, config keys and translator requests.
    pub fn code(&self) -> &'static str {
        match self {
            DubLanguage::Hindi => "hi",
            DubLanguage::English => "en",
            DubLanguage::Spanish => "es",
        }
    }

    /// All supported languages.
    pub fn all() -> &'static [DubLanguage] {
        &[DubLanguage::Hindi, DubLanguage::English, DubLanguage::Spanish]
    }

    /// Whether a recognizer-detected language code refers to this language.
    ///
    /// Recognizers report codes like `en`, `EN` or `en-US`.
    pub fn matches_code(&self, code: &str) -> bool {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        primary == self.code()
    }
}

impl FromStr for DubLanguage {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        DubLanguage::all()
            .iter()
            .copied()
            .find(|lang| lang.code() == code)
            .ok_or(UnsupportedLanguage(code))
    }
}

impl std::fmt::Display for DubLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Burned-in caption look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    /// Outlined text, no box.
    #[default]
    Plain,
    /// Bold face with a heavier outline.
    Bold,
    /// Text on a translucent opaque box.
    Boxed,
    /// Enlarged outlined text.
    Large,
}

impl std::fmt::Display for CaptionStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionStyle::Plain => write!(f, "plain"),
            CaptionStyle::Bold => write!(f, "bold"),
            CaptionStyle::Boxed => write!(f, "boxed"),
            CaptionStyle::Large => write!(f, "large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_languages() {
        assert_eq!("hi".parse::<DubLanguage>().unwrap(), DubLanguage::Hindi);
        assert_eq!(" ES ".parse::<DubLanguage>().unwrap(), DubLanguage::Spanish);
        assert_eq!(
            "fr".parse::<DubLanguage>(),
            Err(UnsupportedLanguage("fr".to_string()))
        );
    }

    #[test]
    fn matches_regional_codes() {
        assert!(DubLanguage::English.matches_code("en-US"));
        assert!(DubLanguage::English.matches_code("EN"));
        assert!(!DubLanguage::English.matches_code("es"));
    }

    #[test]
    fn serializes_as_codes() {
        let json = serde_json::to_string(&DubLanguage::Hindi).unwrap();
        assert_eq!(json, "\"hi\"");
        let class: SpeakerClass = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(class, SpeakerClass::Female);
    }
}
