//! OpenAI speech-to-text backend.

use super::{BackendReply, TranscriptionBackend};
use crate::audio_source::AudioPayload;
use crate::error::{Result, TranscriptionError};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct OpenAiBackend {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    /// Create a backend for `model`, optionally against a custom API base.
    pub fn new(
        api_key: &str,
        model: &str,
        api_base: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key, api_base, timeout)?,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, payload), fields(model = %self.model))]
    async fn submit(
        &self,
        payload: &AudioPayload,
    ) -> std::result::Result<BackendReply, TranscriptionError> {
        debug!("Transcribing {} with {}", payload.display_name(), self.model);

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                payload.display_name().to_string(),
                payload.bytes().to_vec(),
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| TranscriptionError::backend(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| TranscriptionError::backend(format!("{} API error: {}", self.model, e)))?;

        Ok(BackendReply::Transcript(response.text))
    }
}
