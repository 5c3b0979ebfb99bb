//! Data models and configuration
//!
//! Defines the canonical image representation handed to the inference
//! service, the bilingual prompt result it returns, and the environment
//! backed configuration used to compose the application.

use crate::{Error, Result};
use base64::Engine as _;
use serde::Serialize;
use std::time::Duration;

/// Opaque reference used only to render a local preview of the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRef {
    /// File path or URL the image was acquired from.
    pub source: String,
    /// Pixel dimensions, when the bytes could be probed.
    pub dimensions: Option<(u32, u32)>,
}

/// Normalized in-memory image: base64 payload plus media type.
///
/// The payload is never empty and the media type is always populated; the
/// only way to build one is [`CanonicalImage::from_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    payload: String,
    media_type: String,
    display: DisplayRef,
}

impl CanonicalImage {
    pub fn from_bytes(bytes: &[u8], media_type: &str, display: DisplayRef) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::EmptyImage(display.source));
        }
        let media_type = media_type.trim();
        if media_type.is_empty() {
            return Err(Error::UnsupportedMediaType(format!(
                "no media type for {}",
                display.source
            )));
        }

        Ok(Self {
            payload: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_ascii_lowercase(),
            display,
        })
    }

    /// Base64 (standard alphabet, padded) encoding of the image bytes.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn display(&self) -> &DisplayRef {
        &self.display
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.payload)?)
    }
}

/// The two reconstruction prompts produced for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptResult {
    english: String,
    arabic: String,
}

impl PromptResult {
    /// Builds a result, rejecting blank prompts in either language.
    pub fn new(english: String, arabic: String) -> Result<Self> {
        if english.trim().is_empty() {
            return Err(Error::MalformedResponse(
                "`english` prompt is empty".to_string(),
            ));
        }
        if arabic.trim().is_empty() {
            return Err(Error::MalformedResponse(
                "`arabic` prompt is empty".to_string(),
            ));
        }
        Ok(Self { english, arabic })
    }

    pub fn english(&self) -> &str {
        &self.english
    }

    pub fn arabic(&self) -> &str {
        &self.arabic
    }
}

// Configuration
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub analysis_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let timeout = |key: &str, default_secs| parse_timeout(key, non_empty(key), default_secs);

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            gemini_model: non_empty("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: non_empty("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            analysis_timeout: timeout("ANALYSIS_TIMEOUT_SECS", 60)?,
            fetch_timeout: timeout("FETCH_TIMEOUT_SECS", 30)?,
        })
    }

    /// The service credential, required before any analysis client exists.
    pub fn api_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            Error::Configuration(
                "GEMINI_API_KEY is not set. Add it to the environment or a .env file.".to_string(),
            )
        })
    }
}

fn parse_timeout(key: &str, value: Option<String>, default_secs: u64) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default_secs));
    };

    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::Configuration(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, value
        ))),
    }
}
