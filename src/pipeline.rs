//! Pipeline orchestrator for Notewise.
//!
//! Coordinates the whole run: audio resolution, transcription with the
//! cold-start retry, then study-note generation.

use crate::audio_source::{AudioInput, AudioResolver};
use crate::config::{Credentials, Prompts, Settings};
use crate::error::{Result, SummarizationError};
use crate::notes::{create_summarizer, NotesGenerator, StudyNotes};
use crate::progress::{PipelineEvent, ProgressReporter};
use crate::transcription::{create_backend, RetryPolicy, TranscriptionClient, TranscriptionOutcome};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The main orchestrator for the Notewise pipeline.
pub struct NotesPipeline {
    resolver: AudioResolver,
    transcriber: TranscriptionClient,
    notes: NotesGenerator,
}

impl NotesPipeline {
    /// Build the pipeline from settings and resolved credentials.
    pub fn from_settings(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let backend = create_backend(&settings.transcription, &credentials.transcription)?;
        info!(
            "Using {} transcription ({})",
            settings.transcription.provider,
            backend.model()
        );
        let transcriber =
            TranscriptionClient::new(backend, RetryPolicy::from_settings(&settings.transcription));

        let summarizer = create_summarizer(&settings.summarization, &credentials.summarization)?;
        info!(
            "Using {} summarization ({})",
            settings.summarization.provider,
            summarizer.model()
        );
        let notes = NotesGenerator::new(summarizer, prompts, &settings.notes);

        Ok(Self {
            resolver: AudioResolver::new(&settings.audio)?,
            transcriber,
            notes,
        })
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        resolver: AudioResolver,
        transcriber: TranscriptionClient,
        notes: NotesGenerator,
    ) -> Self {
        Self {
            resolver,
            transcriber,
            notes,
        }
    }

    pub fn transcriber(&self) -> &TranscriptionClient {
        &self.transcriber
    }

    pub fn notes(&self) -> &NotesGenerator {
        &self.notes
    }

    /// Resolve the audio and transcribe it, without generating notes.
    ///
    /// Returns the payload's display name alongside the outcome.
    #[instrument(skip(self, input, progress), fields(input = %input.describe()))]
    pub async fn transcribe_input(
        &self,
        input: AudioInput,
        progress: &dyn ProgressReporter,
    ) -> Result<(String, TranscriptionOutcome)> {
        progress.report(PipelineEvent::FetchingAudio {
            source: input.describe(),
        });
        let payload = self.resolver.resolve(input).await?;

        let name = payload.display_name().to_string();
        progress.report(PipelineEvent::AudioReady {
            name: name.clone(),
            content_type: payload.content_type().to_string(),
            bytes: payload.len(),
        });

        let outcome = self.transcriber.transcribe(payload, progress).await?;
        Ok((name, outcome))
    }

    /// Run the full pipeline.
    ///
    /// Source and transcription failures end the run. A summarization
    /// failure does not: the transcript is returned with `notes` set to the
    /// error.
    #[instrument(skip(self, input, progress))]
    pub async fn run(
        &self,
        input: AudioInput,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineOutput> {
        let request_id = Uuid::new_v4();
        info!(%request_id, "Starting pipeline for {}", input.describe());

        let (source_name, transcript) = self.transcribe_input(input, progress).await?;

        let notes = match &transcript {
            TranscriptionOutcome::EmptyTranscript => Ok(StudyNotes::no_content()),
            TranscriptionOutcome::Text(text) => {
                progress.report(PipelineEvent::GeneratingNotes {
                    model: self.notes.model().to_string(),
                });
                match self.notes.generate(text).await {
                    Ok(notes) => {
                        progress.report(PipelineEvent::NotesReady {
                            chars: notes.content.len(),
                        });
                        Ok(notes)
                    }
                    Err(e) => {
                        warn!(%request_id, "Note generation failed: {}", e);
                        progress.report(PipelineEvent::NotesFailed {
                            detail: e.to_string(),
                        });
                        Err(e)
                    }
                }
            }
        };

        Ok(PipelineOutput {
            request_id,
            source_name,
            transcript,
            notes,
        })
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub request_id: Uuid,
    /// Display name of the audio that was transcribed.
    pub source_name: String,
    pub transcript: TranscriptionOutcome,
    pub notes: std::result::Result<StudyNotes, SummarizationError>,
}

impl PipelineOutput {
    /// Transcript text, empty for an empty transcript.
    pub fn transcript_text(&self) -> &str {
        self.transcript.text().unwrap_or_default()
    }

    /// Serializable view of the run.
    pub fn report(&self) -> NotesReport {
        let (notes, notes_error) = match &self.notes {
            Ok(notes) => (Some(notes.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };

        NotesReport {
            request_id: self.request_id,
            source: self.source_name.clone(),
            transcript: self.transcript_text().to_string(),
            empty_transcript: self.transcript.is_empty(),
            notes,
            notes_error,
        }
    }
}

/// JSON shape of a finished run, shared by the CLI and the HTTP API.
#[derive(Debug, Clone, Serialize)]
pub struct NotesReport {
    pub request_id: Uuid,
    pub source: String,
    pub transcript: String,
    pub empty_transcript: bool,
    pub notes: Option<StudyNotes>,
    pub notes_error: Option<String>,
}
