use crate::models::DEFAULT_GEMINI_BASE_URL;
use crate::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Lightweight Gemini REST client for `generateContent` calls.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` may be given with or without the `models/` path prefix; the
    /// prefix is stripped. A blank `api_key` is a configuration error and no
    /// client is built.
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "Gemini API key is empty".to_string(),
            ));
        }

        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Calls Gemini's `generateContent` endpoint.
    ///
    /// Transport failures and non-2xx statuses surface as
    /// [`Error::AiProvider`]; a 2xx body that is not the expected envelope is
    /// a contract violation and surfaces as [`Error::MalformedResponse`].
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                Error::AiProvider(format!("Failed to reach Gemini: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read Gemini response body: {}", e);
            Error::AiProvider(format!("Failed to read Gemini response: {}", e))
        })?;

        if !status.is_success() {
            tracing::error!("Gemini API error (status {}): {}", status, body);
            return Err(Error::AiProvider(format!(
                "Gemini API error (status {}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::MalformedResponse(format!("Failed to parse Gemini response: {}", e))
        })
    }
}
