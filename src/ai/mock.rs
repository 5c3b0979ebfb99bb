use super::AnalysisService;
use crate::models::{CanonicalImage, PromptResult};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted outcome for one [`MockAnalysisClient`] call.
#[derive(Debug, Clone)]
pub enum MockAnalysisResponse {
    Prompts { english: String, arabic: String },
    Empty,
    Malformed(String),
    Unavailable(String),
}

impl MockAnalysisResponse {
    fn into_result(self) -> Result<PromptResult> {
        match self {
            MockAnalysisResponse::Prompts { english, arabic } => PromptResult::new(english, arabic),
            MockAnalysisResponse::Empty => Err(Error::EmptyResponse),
            MockAnalysisResponse::Malformed(detail) => Err(Error::MalformedResponse(detail)),
            MockAnalysisResponse::Unavailable(detail) => Err(Error::AiProvider(detail)),
        }
    }
}

#[derive(Clone)]
pub struct MockAnalysisClient {
    responses: Arc<Mutex<Vec<MockAnalysisResponse>>>,
    seen_media_types: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockAnalysisClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            seen_media_types: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_prompts(self, english: &str, arabic: &str) -> Self {
        self.with_response(MockAnalysisResponse::Prompts {
            english: english.to_string(),
            arabic: arabic.to_string(),
        })
    }

    pub fn with_response(self, response: MockAnalysisResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Media types of every image analyzed so far, in call order.
    pub fn get_seen_media_types(&self) -> Vec<String> {
        self.seen_media_types.lock().unwrap().clone()
    }
}

impl Default for MockAnalysisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisClient {
    async fn analyze(&self, image: &CanonicalImage) -> Result<PromptResult> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.seen_media_types
            .lock()
            .unwrap()
            .push(image.media_type().to_string());

        let response = {
            let responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses[(count - 1) % responses.len()].clone())
            }
        };

        match response {
            Some(response) => response.into_result(),
            None => PromptResult::new(
                format!("A detailed {} photograph", image.media_type()),
                "صورة فوتوغرافية مفصلة".to_string(),
            ),
        }
    }
}
