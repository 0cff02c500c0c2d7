//! Transcription module for Notewise.
//!
//! Backends submit a payload and classify the raw reply; [`TranscriptionClient`]
//! owns the retry policy applied when a hosted model is still cold.
//!
//! # Backends
//!
//! - **Hugging Face** (default): hosted inference endpoint. May answer with a
//!   "model is currently loading" error on the first request.
//! - **OpenAI**: speech-to-text API. Never reports a loading state.

mod client;
mod huggingface;
mod openai;

pub use client::{RetryPolicy, TranscriptionClient, MAX_RETRIES};
pub use huggingface::HuggingFaceBackend;
pub use openai::OpenAiBackend;

use crate::audio_source::AudioPayload;
use crate::config::{TranscriptionProvider, TranscriptionSettings};
use crate::error::{Result, TranscriptionError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A backend's report that its model is not warm yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLoading {
    /// Wait suggested by the backend, if it gave one.
    pub estimated_wait: Option<Duration>,
    /// The backend's own message.
    pub message: String,
}

/// A classified, non-terminal backend reply.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    /// The backend returned transcript text (possibly empty).
    Transcript(String),
    /// The backend is cold-starting and the request should be retried.
    Loading(ModelLoading),
}

/// Successful result of a transcription run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    /// Transcript text, exactly as the backend returned it.
    Text(String),
    /// The backend succeeded but the transcript is empty or whitespace.
    EmptyTranscript,
}

impl TranscriptionOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            TranscriptionOutcome::Text(text) => Some(text),
            TranscriptionOutcome::EmptyTranscript => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TranscriptionOutcome::EmptyTranscript)
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Send a payload once and classify the reply.
    async fn submit(
        &self,
        payload: &AudioPayload,
    ) -> std::result::Result<BackendReply, TranscriptionError>;
}

/// Create the backend selected in the settings.
pub fn create_backend(
    settings: &TranscriptionSettings,
    api_key: &str,
) -> Result<Arc<dyn TranscriptionBackend>> {
    let model = settings.model();
    let backend: Arc<dyn TranscriptionBackend> = match settings.provider {
        TranscriptionProvider::HuggingFace => {
            let mut backend = HuggingFaceBackend::new(api_key, &model, settings.timeout())?;
            if let Some(endpoint) = &settings.endpoint {
                backend = backend.with_endpoint(endpoint);
            }
            Arc::new(backend)
        }
        TranscriptionProvider::OpenAi => Arc::new(OpenAiBackend::new(
            api_key,
            &model,
            settings.endpoint.as_deref(),
            settings.timeout(),
        )?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let text = TranscriptionOutcome::Text("hi".into());
        assert_eq!(text.text(), Some("hi"));
        assert!(!text.is_empty());
        assert!(TranscriptionOutcome::EmptyTranscript.is_empty());
        assert_eq!(TranscriptionOutcome::EmptyTranscript.text(), None);
    }

    #[test]
    fn test_create_backend_per_provider() {
        let mut settings = TranscriptionSettings::default();
        let backend = create_backend(&settings, "hf_key").unwrap();
        assert_eq!(backend.name(), "huggingface");
        assert_eq!(backend.model(), "openai/whisper-large-v3");

        settings.provider = TranscriptionProvider::OpenAi;
        let backend = create_backend(&settings, "sk-key").unwrap();
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.model(), "whisper-1");
    }
}
