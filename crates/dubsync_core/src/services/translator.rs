//! Machine translation boundary.
//!
//! Translation is best-effort: callers fall back to the source text when
//! a translator errors.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::TranslationSettings;
use crate::models::DubLanguage;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Translator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Translator unavailable: {0}")]
    Unavailable(String),
}

pub type TranslationResult<T> = Result<T, TranslationError>;

/// Translates text into a target language.
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    /// Distinguishes translators whose output may differ, for job fingerprints.
    fn identity(&self) -> String {
        self.name().to_string()
    }

    fn translate(&self, text: &str, target: DubLanguage) -> TranslationResult<String>;
}

/// Client for a LibreTranslate-compatible HTTP endpoint.
pub struct HttpTranslator {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(settings: &TranslationSettings) -> TranslationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("dubsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn request_body(&self, text: &str, target: DubLanguage) -> Value {
        let mut body = json!({
            "q": text,
            "source": "auto",
            "target": target.code(),
            "format": "text",
        });
        if let Some(key) = &self.api_key {
            body["api_key"] = Value::String(key.clone());
        }
        body
    }
}

impl Translator for HttpTranslator {
    fn name(&self) -> &str {
        "http"
    }

    fn identity(&self) -> String {
        format!("{}@{}", self.name(), self.endpoint)
    }

    fn translate(&self, text: &str, target: DubLanguage) -> TranslationResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(text, target))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranslationError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: TranslateResponse = response.json()?;
        Ok(parsed.translated_text.trim().to_string())
    }
}
