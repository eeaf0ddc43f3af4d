use super::types::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse};
use super::ReadmeGenerator;
use crate::config::Config;
use crate::error::{ReadmeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const GEMINI_API_TIMEOUT: u64 = 120;

/// Text returned when the model answers with no text at all
pub const EMPTY_RESPONSE_FALLBACK: &str = "Error generating README";

/// Client for the Google generative-language `generateContent` endpoint
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Creates a client for `model` at `base_url`
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(GEMINI_API_TIMEOUT))
            .build()?;

        if api_key.is_none() {
            warn!("GOOGLE_API_KEY is not set, README generation will fail");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// Creates a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.gemini_api_base, &config.model, config.google_api_key.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ReadmeGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ReadmeError::Config("GOOGLE_API_KEY is not configured".to_string()))?;

        info!("Requesting README from {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| ReadmeError::Llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(ApiErrorBody { error }) => match error.status {
                    Some(code) if !error.message.is_empty() => format!("{} ({})", error.message, code),
                    _ if !error.message.is_empty() => error.message,
                    _ => status.to_string(),
                },
                Err(_) => status.to_string(),
            };
            return Err(ReadmeError::Llm(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ReadmeError::Llm(format!("Invalid response: {}", e)))?;

        let text = body.text();
        debug!("Model returned {} chars", text.len());

        if text.is_empty() {
            warn!(
                "Model returned no text (finish reason: {})",
                body.finish_reason().unwrap_or("unknown")
            );
            return Ok(EMPTY_RESPONSE_FALLBACK.to_string());
        }
        Ok(text)
    }
}
