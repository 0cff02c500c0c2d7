//! OpenAI chat-completions summarizer.

use super::{SummarizationBackend, SummarizationError};
use crate::error::Result;
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Summarizer backed by the OpenAI chat completions API.
pub struct OpenAiSummarizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiSummarizer {
    pub fn new(
        api_key: &str,
        model: &str,
        api_base: Option<&str>,
        timeout: Duration,
        temperature: f32,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key, api_base, timeout)?,
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl SummarizationBackend for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
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
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| SummarizationError(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| SummarizationError(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| SummarizationError(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            SummarizationError(format!("Failed to generate notes: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SummarizationError("Empty response from LLM".to_string()))?;

        debug!(chars = content.len(), "Received completion");
        Ok(content)
    }
}
