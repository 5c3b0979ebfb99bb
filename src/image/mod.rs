//! Image acquisition
//!
//! Normalizes a user-supplied image, either a local file or a remote URL,
//! into a [`CanonicalImage`] ready for analysis.

pub mod loader;
pub mod mock;

pub use loader::ImageLoader;
pub use mock::MockImageLoader;

use crate::models::CanonicalImage;
use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// A validated, non-empty image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    File(PathBuf),
    Url(String),
}

impl ImageInput {
    pub fn file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidInput("No image file was selected.".to_string()));
        }
        Ok(Self::File(path))
    }

    /// Accepts absolute `http`/`https` URLs only.
    pub fn url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("Please enter an image URL.".to_string()));
        }

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::InvalidInput(format!("'{}' is not a valid URL: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "Only http and https URLs are supported, got '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self::Url(parsed.to_string()))
    }

    /// Treats anything that looks like an http(s) URL as one, everything
    /// else as a file path.
    pub fn detect(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::url(trimmed)
        } else {
            Self::file(trimmed)
        }
    }
}

impl fmt::Display for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageInput::File(path) => write!(f, "{}", path.display()),
            ImageInput::Url(url) => f.write_str(url),
        }
    }
}

#[async_trait]
pub trait ImageAcquirer: Send + Sync {
    async fn from_local_file(&self, path: &Path) -> Result<CanonicalImage>;
    async fn from_remote_url(&self, url: &str) -> Result<CanonicalImage>;

    async fn acquire(&self, input: &ImageInput) -> Result<CanonicalImage> {
        match input {
            ImageInput::File(path) => self.from_local_file(path).await,
            ImageInput::Url(url) => self.from_remote_url(url).await,
        }
    }
}
