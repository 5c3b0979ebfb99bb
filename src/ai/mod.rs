//! AI service integration for image analysis
//!
//! Sends a canonical image to a multimodal model and gets back a pair of
//! text-to-image prompts (English and Arabic) that reconstruct it.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiAnalysisClient;
pub use mock::{MockAnalysisClient, MockAnalysisResponse};

use crate::models::{CanonicalImage, PromptResult};
use crate::Result;
use async_trait::async_trait;

/// One terminal outcome per call; implementations never retry.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, image: &CanonicalImage) -> Result<PromptResult>;
}
