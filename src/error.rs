//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Every failure a submission can hit maps to one variant here, and each
//! variant knows the short message the presentation layer shows for it.

use crate::session::SessionStatus;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read image file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch image from {url}: {failure}")]
    Fetch { url: String, failure: FetchFailure },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Inference service returned no content")]
    EmptyResponse,

    #[error("Malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("Inference service error: {0}")]
    AiProvider(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Image is empty: {0}")]
    EmptyImage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("An analysis is already in progress")]
    SubmissionInFlight,

    #[error("Invalid session transition: cannot {event} while {status}")]
    InvalidTransition {
        status: SessionStatus,
        event: &'static str,
    },

    #[error("Payload decoding error: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Why a remote image could not be fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The host refused direct access (401/403/451).
    #[error("access blocked by remote host (status {0})")]
    Blocked(u16),

    /// The host answered with something other than an image, usually an
    /// HTML hotlink or login page.
    #[error("remote resource is not an image ({0})")]
    NotAnImage(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchFailure {
    /// Blocked and non-image responses are fixed by downloading the image
    /// by hand, not by retrying.
    pub fn suggests_manual_download(&self) -> bool {
        matches!(self, FetchFailure::Blocked(_) | FetchFailure::NotAnImage(_))
    }
}

impl Error {
    /// Short, user-presentable description of this error.
    ///
    /// Diagnostic detail (status codes, parse errors, response bodies) stays
    /// in the `Display` impl and goes to the logs only.
    pub fn user_message(&self) -> String {
        match self {
            Error::Read { .. } => "Could not read the image file.".to_string(),
            Error::Fetch { failure, .. } if failure.suggests_manual_download() => {
                "The image could not be loaded because the site blocks direct access. \
                 Please download the image and upload it manually."
                    .to_string()
            }
            Error::Fetch { .. } => {
                "Could not load the image from this URL. Check the address and your connection."
                    .to_string()
            }
            Error::Configuration(detail) => format!("Configuration missing: {}", detail),
            Error::EmptyResponse | Error::MalformedResponse(_) | Error::AiProvider(_) => {
                "Analysis failed. Please try again.".to_string()
            }
            Error::UnsupportedMediaType(_) => "Please choose an image file.".to_string(),
            Error::EmptyImage(_) => "The selected image is empty.".to_string(),
            Error::InvalidInput(detail) => detail.clone(),
            Error::SubmissionInFlight => {
                "An analysis is already running. Please wait for it to finish.".to_string()
            }
            Error::InvalidTransition { .. } | Error::Decode(_) => {
                "Something went wrong during analysis.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
