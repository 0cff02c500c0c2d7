//! Transcribe command implementation.

use crate::audio_source::AudioInput;
use crate::cli::preflight::{self, Operation};
use crate::cli::{ConsoleReporter, Output};
use crate::config::Settings;
use crate::pipeline::NotesPipeline;
use crate::transcription::TranscriptionOutcome;
use anyhow::Result;

/// Run the transcribe command.
pub async fn run_transcribe(input: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let input = AudioInput::parse(input)?;

    // Pre-flight checks
    let credentials = match preflight::check(Operation::Transcribe, &settings, Some(&input)) {
        Ok(credentials) => credentials,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'notewise doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let pipeline = NotesPipeline::from_settings(&settings, &credentials)?;

    Output::info(&format!("Transcribing: {}", input.describe()));
    let reporter = ConsoleReporter::new();
    let result = pipeline.transcribe_input(input, &reporter).await;
    reporter.finish();

    match result {
        Ok((name, outcome)) => {
            write_transcript(&outcome, output.as_deref())?;
            match outcome {
                TranscriptionOutcome::Text(text) => {
                    Output::success(&format!("Transcription complete ({} characters)", text.len()));
                }
                TranscriptionOutcome::EmptyTranscript => {
                    Output::warning(&format!("No speech detected in '{}'", name));
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to transcribe: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Write the transcript. An empty transcript still creates the output file.
fn write_transcript(outcome: &TranscriptionOutcome, output: Option<&str>) -> Result<()> {
    match outcome {
        TranscriptionOutcome::Text(text) => super::write_output(text, output),
        TranscriptionOutcome::EmptyTranscript if output.is_some() => super::write_output("", output),
        TranscriptionOutcome::EmptyTranscript => Ok(()),
    }
}
