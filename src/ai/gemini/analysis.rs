use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, GenerationConfig, InlineData, Part, Schema};
use crate::ai::AnalysisService;
use crate::models::{CanonicalImage, Config, PromptResult};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct AnalysisRequest {
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: Option<GenerationConfig>,
}

/// Exact shape the model must return inside its text part.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PromptPayload {
    english: String,
    arabic: String,
}

pub struct GeminiAnalysisClient {
    http: GeminiHttpClient,
}

impl GeminiAnalysisClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(60),
                client,
            )?,
        })
    }

    /// Builds a client from loaded configuration, validating the credential.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let http = GeminiHttpClient::new_with_client(
            api_key,
            config.gemini_model.clone(),
            config.analysis_timeout,
            client,
        )?
        .with_base_url(config.gemini_base_url.clone());

        Ok(Self { http })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    fn build_request(image: &CanonicalImage) -> AnalysisRequest {
        AnalysisRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: prompts::ANALYSIS_SYSTEM.to_string(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.media_type().to_string(),
                            data: image.payload().to_string(),
                        },
                    },
                    Part::Text {
                        text: prompts::ANALYSIS_USER.to_string(),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(Schema::object(vec![
                    ("english", Schema::string(prompts::ENGLISH_FIELD_DESCRIPTION)),
                    ("arabic", Schema::string(prompts::ARABIC_FIELD_DESCRIPTION)),
                ])),
            }),
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let candidate = response.candidates.first()?;
        let text = candidate.content.as_ref().and_then(|content| {
            content.parts.iter().find_map(|p| match p {
                Part::Text { text } if !text.trim().is_empty() => Some(text.clone()),
                _ => None,
            })
        });

        if text.is_none() {
            tracing::warn!(
                "Gemini candidate carried no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }
        text
    }

    fn parse_prompts(text: &str) -> Result<PromptResult> {
        let payload: PromptPayload = serde_json::from_str(text).map_err(|e| {
            tracing::error!("Gemini returned a response outside the schema: {}\nText: {}", e, text);
            Error::MalformedResponse(format!("Failed to parse prompt JSON: {}", e))
        })?;

        PromptResult::new(payload.english, payload.arabic)
    }
}

#[async_trait]
impl AnalysisService for GeminiAnalysisClient {
    async fn analyze(&self, image: &CanonicalImage) -> Result<PromptResult> {
        tracing::debug!(
            "Analyzing {} image ({} base64 chars) via Gemini model {}",
            image.media_type(),
            image.payload().len(),
            self.http.model()
        );

        let request = Self::build_request(image);
        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        let text = Self::extract_text(&response).ok_or(Error::EmptyResponse)?;
        let result = Self::parse_prompts(&text)?;

        tracing::info!(
            "Gemini analysis complete ({} chars English, {} chars Arabic)",
            result.english().chars().count(),
            result.arabic().chars().count()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use crate::models::DisplayRef;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    fn make_client(server: &MockServer) -> GeminiAnalysisClient {
        GeminiAnalysisClient::new("test-key".to_string(), DEFAULT_MODEL.to_string())
            .unwrap()
            .with_base_url(server.uri())
    }

    fn jpeg_image() -> CanonicalImage {
        CanonicalImage::from_bytes(
            &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
            "image/jpeg",
            DisplayRef {
                source: "photo.jpg".to_string(),
                dimensions: None,
            },
        )
        .unwrap()
    }

    async fn mount_text(server: &MockServer, text: &str) {
        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(test_support::text_response(text)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_analyze_parses_both_prompts() {
        let server = MockServer::start().await;
        mount_text(
            &server,
            r#"{"english": "A misty harbor at dawn, 35mm film", "arabic": "ميناء ضبابي عند الفجر"}"#,
        )
        .await;

        let result = make_client(&server).analyze(&jpeg_image()).await.unwrap();

        assert_eq!(result.english(), "A misty harbor at dawn, 35mm film");
        assert_eq!(result.arabic(), "ميناء ضبابي عند الفجر");
    }

    #[tokio::test]
    async fn test_request_carries_inline_image_and_schema() {
        let server = MockServer::start().await;
        let image = jpeg_image();

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": image.payload() } },
                        { "text": prompts::ANALYSIS_USER }
                    ]
                }],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {
                        "type": "OBJECT",
                        "properties": {
                            "english": { "type": "STRING" },
                            "arabic": { "type": "STRING" }
                        },
                        "required": ["english", "arabic"]
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(test_support::text_response(
                r#"{"english": "e", "arabic": "ع"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        make_client(&server).analyze(&image).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_arabic_is_malformed() {
        let server = MockServer::start().await;
        mount_text(&server, r#"{"english": "A lone tree in snow"}"#).await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_text_is_malformed() {
        let server = MockServer::start().await;
        mount_text(&server, "Here is your prompt: a lone tree in snow").await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_extra_fields_are_malformed() {
        let server = MockServer::start().await;
        mount_text(
            &server,
            r#"{"english": "tree", "arabic": "شجرة", "french": "arbre"}"#,
        )
        .await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_blank_prompt_is_malformed() {
        let server = MockServer::start().await;
        mount_text(&server, r#"{"english": "tree", "arabic": ""}"#).await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_response() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[tokio::test]
    async fn test_safety_stop_without_content_is_empty_response() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[tokio::test]
    async fn test_api_error_returns_ai_provider_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_non_envelope_body_is_malformed() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = make_client(&server).analyze(&jpeg_image()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network_call() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = GeminiAnalysisClient::new("  ".to_string(), DEFAULT_MODEL.to_string())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration(_)));

        let config = Config::from_vars(|key| {
            (key == "GEMINI_BASE_URL").then(|| server.uri())
        })
        .unwrap();
        let err = GeminiAnalysisClient::from_config(&config, reqwest::Client::new())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_strips_models_prefix_from_model_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(test_support::text_response(
                r#"{"english": "e", "arabic": "ع"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            GeminiAnalysisClient::new("test-key".to_string(), "models/gemini-2.5-pro".to_string())
                .unwrap()
                .with_base_url(server.uri());
        assert_eq!(client.model(), "gemini-2.5-pro");

        client.analyze(&jpeg_image()).await.unwrap();
    }
}
