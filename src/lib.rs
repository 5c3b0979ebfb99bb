//! Reverse prompt generator - turns an image into text-to-image prompts
//!
//! Takes an image from a local file or a URL, asks a multimodal model to
//! describe how to recreate it, and returns the resulting prompt in English
//! and Arabic. A single analysis session tracks each request from submission
//! to result.

pub mod ai;
pub mod app;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod session;

pub use error::{Error, FetchFailure, Result};
