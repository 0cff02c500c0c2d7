//! Study-note generation.
//!
//! Turns a transcript into markdown study notes (summary, quiz, flashcards)
//! through a text-generation backend. The notes are display-only; nothing
//! downstream parses them.

mod gemini;
mod openai;

pub use crate::error::SummarizationError;
pub use gemini::GeminiSummarizer;
pub use openai::OpenAiSummarizer;

use crate::config::{NotesSettings, Prompts, SummarizationProvider, SummarizationSettings};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Notice returned instead of notes when the transcript has no content.
pub const NO_CONTENT_NOTICE: &str =
    "No speech was detected in the audio, so no study notes were generated.";

/// Generated study notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyNotes {
    /// Markdown text, expected to hold summary, quiz and flashcard sections.
    pub content: String,
    /// Model that produced the notes. `None` for the no-content notice.
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl StudyNotes {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: Some(model.into()),
            generated_at: Utc::now(),
        }
    }

    /// The fixed notice used for empty transcripts.
    pub fn no_content() -> Self {
        Self {
            content: NO_CONTENT_NOTICE.to_string(),
            model: None,
            generated_at: Utc::now(),
        }
    }

    /// Whether these are real generated notes rather than the no-content notice.
    pub fn is_generated(&self) -> bool {
        self.model.is_some()
    }
}

/// Trait for text-generation services.
#[async_trait]
pub trait SummarizationBackend: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Generate text for a system instruction and a user prompt.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> std::result::Result<String, SummarizationError>;
}

/// Builds the notes prompt and calls the summarization backend.
#[derive(Clone)]
pub struct NotesGenerator {
    backend: Arc<dyn SummarizationBackend>,
    prompts: Prompts,
    quiz_questions: u32,
    flashcards: u32,
}

impl NotesGenerator {
    pub fn new(backend: Arc<dyn SummarizationBackend>, prompts: Prompts, settings: &NotesSettings) -> Self {
        Self {
            backend,
            prompts,
            quiz_questions: settings.quiz_questions,
            flashcards: settings.flashcards,
        }
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Render the user prompt for a transcript.
    pub fn build_prompt(&self, transcript: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("quiz_questions".to_string(), self.quiz_questions.to_string());
        vars.insert("flashcards".to_string(), self.flashcards.to_string());

        self.prompts.render_with_custom(&self.prompts.notes.user, &vars)
    }

    /// Generate study notes for a transcript.
    ///
    /// Blank transcripts short-circuit to [`StudyNotes::no_content`] without
    /// calling the backend. Backend failures are returned, never retried.
    #[instrument(skip(self, transcript), fields(backend = self.backend.name(), chars = transcript.len()))]
    pub async fn generate(
        &self,
        transcript: &str,
    ) -> std::result::Result<StudyNotes, SummarizationError> {
        if transcript.trim().is_empty() {
            info!("Transcript is empty, skipping note generation");
            return Ok(StudyNotes::no_content());
        }

        let prompt = self.build_prompt(transcript);
        debug!(prompt_chars = prompt.len(), "Requesting study notes");

        let content = self
            .backend
            .complete(&self.prompts.notes.system, &prompt)
            .await?;

        if content.trim().is_empty() {
            return Err(SummarizationError(format!(
                "{} returned an empty response",
                self.backend.model()
            )));
        }

        Ok(StudyNotes::new(content, self.backend.model()))
    }
}

/// Create the summarization backend selected in the settings.
pub fn create_summarizer(
    settings: &SummarizationSettings,
    api_key: &str,
) -> Result<Arc<dyn SummarizationBackend>> {
    let model = settings.model();
    let backend: Arc<dyn SummarizationBackend> = match settings.provider {
        SummarizationProvider::OpenAi => Arc::new(OpenAiSummarizer::new(
            api_key,
            &model,
            settings.endpoint.as_deref(),
            settings.timeout(),
            settings.temperature,
        )?),
        SummarizationProvider::Gemini => {
            let mut backend = GeminiSummarizer::new(api_key, &model, settings.timeout(), settings.temperature)?;
            if let Some(endpoint) = &settings.endpoint {
                backend = backend.with_endpoint(endpoint);
            }
            Arc::new(backend)
        }
    };
    Ok(backend)
}
