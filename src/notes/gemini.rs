//! Gemini API summarizer adapter

use super::{SummarizationBackend, SummarizationError};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Gemini API base URL
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// Request types for Gemini API

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Option<Content>,
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

// Response types for Gemini API

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Gemini API summarizer
pub struct GeminiSummarizer {
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiSummarizer {
    /// Create a new Gemini summarizer for `model`
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration, temperature: f32) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: API_BASE_URL.to_string(),
            temperature,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Point the summarizer at a different API base
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the API URL
    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Build the request body
    fn build_request(&self, system: &str, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![TextPart {
                    text: system.to_string(),
                }],
            }),
            generation_config: Some(GenerationConfig {
                temperature: self.temperature,
            }),
        }
    }

    /// Extract text from response
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let parts: Vec<&str> = response
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(""))
        }
    }
}

#[async_trait]
impl SummarizationBackend for GeminiSummarizer {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, system, prompt), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> std::result::Result<String, SummarizationError> {
        let body = self.build_request(system, prompt);

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizationError(format!("Request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SummarizationError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SummarizationError(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(SummarizationError(error.message));
        }

        let text = Self::extract_text(&response)
            .ok_or_else(|| SummarizationError("Empty response from Gemini".to_string()))?;

        debug!(chars = text.len(), "Received completion");
        Ok(text)
    }
}
