//! Hugging Face hosted inference transcription backend.
//!
//! The hosted endpoint loads models on demand. While a model is cold it
//! answers with a JSON error such as
//! `{"error": "Model openai/whisper-large-v3 is currently loading", "estimated_time": 20.0}`,
//! usually with a 503 status. [`classify_response`] is the only place that
//! knows this shape.

use super::{BackendReply, ModelLoading, TranscriptionBackend};
use crate::audio_source::AudioPayload;
use crate::error::{Result, TranscriptionError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Hosted inference base URL.
const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models";

/// Hugging Face inference API transcriber.
pub struct HuggingFaceBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl HuggingFaceBackend {
    /// Create a backend for `model` authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Point the backend at a different inference server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the API URL
    fn api_url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl TranscriptionBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, payload), fields(model = %self.model))]
    async fn submit(
        &self,
        payload: &AudioPayload,
    ) -> std::result::Result<BackendReply, TranscriptionError> {
        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, payload.content_type())
            .body(payload.bytes().to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscriptionError::backend(format!(
                        "Request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    TranscriptionError::backend(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionError::backend(format!("HTTP {}: failed to read body: {}", status, e)))?;

        debug!(status = status.as_u16(), bytes = body.len(), "Inference API replied");
        classify_response(status.as_u16(), &body)
    }
}

/// Classify a raw inference API response.
///
/// A loading error is recognised whatever the status code. Any other
/// non-2xx status, or an undecodable body, is a backend error carrying the
/// raw body.
pub fn classify_response(
    status: u16,
    body: &str,
) -> std::result::Result<BackendReply, TranscriptionError> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(loading) = parsed.as_ref().and_then(loading_state) {
        return Ok(BackendReply::Loading(loading));
    }

    if !(200..300).contains(&status) {
        return Err(TranscriptionError::backend(format!(
            "HTTP {}: {}",
            status,
            body.trim()
        )));
    }

    let json = parsed.ok_or_else(|| {
        TranscriptionError::backend(format!("Undecodable response body: {}", body.trim()))
    })?;

    if let Some(text) = json.get("text").and_then(Value::as_str) {
        return Ok(BackendReply::Transcript(text.to_string()));
    }

    if let Some(message) = json.get("error").and_then(error_message) {
        return Err(TranscriptionError::backend(message));
    }

    Err(TranscriptionError::unrecognized(body.trim()))
}

fn loading_state(json: &Value) -> Option<ModelLoading> {
    let message = json.get("error").and_then(error_message)?;
    if !message.to_lowercase().contains("loading") {
        return None;
    }

    let estimated_wait = json
        .get("estimated_time")
        .and_then(Value::as_f64)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX));

    Some(ModelLoading {
        estimated_wait,
        message,
    })
}

/// The API reports errors either as a string or as a list of strings.
fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
