//! Notes command implementation.

use crate::audio_source::AudioInput;
use crate::cli::preflight::{self, Operation};
use crate::cli::{ConsoleReporter, NotesFormat, Output};
use crate::config::Settings;
use crate::pipeline::{NotesPipeline, PipelineOutput};
use anyhow::Result;

/// Run the notes command.
pub async fn run_notes(
    input: &str,
    output: Option<String>,
    format: NotesFormat,
    settings: Settings,
) -> Result<()> {
    let input = AudioInput::parse(input)?;

    // Pre-flight checks
    let credentials = match preflight::check(Operation::Notes, &settings, Some(&input)) {
        Ok(credentials) => credentials,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'notewise doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let pipeline = NotesPipeline::from_settings(&settings, &credentials)?;

    Output::info(&format!("Processing: {}", input.describe()));
    let reporter = ConsoleReporter::new();
    let result = pipeline.run(input, &reporter).await;
    reporter.finish();

    let run = match result {
        Ok(run) => run,
        Err(e) => {
            Output::error(&format!("Failed to process: {}", e));
            return Err(e.into());
        }
    };

    let rendered = match format {
        NotesFormat::Markdown => render_markdown(&run),
        NotesFormat::Json => serde_json::to_string_pretty(&run.report())?,
    };

    super::write_output(&rendered, output.as_deref())?;

    match &run.notes {
        Ok(notes) if notes.is_generated() => Output::success("Study notes generated."),
        Ok(_) => Output::warning("No speech detected, so no notes were generated."),
        Err(e) => Output::warning(&format!(
            "Transcript saved, but notes could not be generated: {}",
            e
        )),
    }

    Ok(())
}

/// Render a run as a markdown document: notes first, transcript below.
fn render_markdown(run: &PipelineOutput) -> String {
    let notes = match &run.notes {
        Ok(notes) => notes.content.trim().to_string(),
        Err(e) => format!("_Notes could not be generated: {}_", e),
    };

    let transcript = if run.transcript.is_empty() {
        "_No speech detected._".to_string()
    } else {
        run.transcript_text().trim().to_string()
    };

    format!(
        "# Study notes: {}\n\n{}\n\n---\n\n## Transcript\n\n{}\n",
        run.source_name, notes, transcript
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizationError;
    use crate::notes::{StudyNotes, NO_CONTENT_NOTICE};
    use crate::transcription::TranscriptionOutcome;
    use uuid::Uuid;

    fn run(
        transcript: TranscriptionOutcome,
        notes: std::result::Result<StudyNotes, SummarizationError>,
    ) -> PipelineOutput {
        PipelineOutput {
            request_id: Uuid::new_v4(),
            source_name: "lecture.mp3".to_string(),
            transcript,
            notes,
        }
    }

    #[test]
    fn test_markdown_puts_notes_before_transcript() {
        let doc = render_markdown(&run(
            TranscriptionOutcome::Text("cells divide".to_string()),
            Ok(StudyNotes::new("## Summary\n- mitosis", "gpt-4o")),
        ));

        assert!(doc.starts_with("# Study notes: lecture.mp3"));
        let notes_at = doc.find("## Summary").unwrap();
        let transcript_at = doc.find("## Transcript").unwrap();
        assert!(notes_at < transcript_at);
        assert!(doc.contains("cells divide"));
    }

    #[test]
    fn test_markdown_keeps_transcript_when_notes_fail() {
        let doc = render_markdown(&run(
            TranscriptionOutcome::Text("photosynthesis".to_string()),
            Err(SummarizationError("rate limited".to_string())),
        ));

        assert!(doc.contains("_Notes could not be generated: rate limited_"));
        assert!(doc.contains("photosynthesis"));
    }

    #[test]
    fn test_markdown_for_empty_transcript() {
        let doc = render_markdown(&run(
            TranscriptionOutcome::EmptyTranscript,
            Ok(StudyNotes::no_content()),
        ));

        assert!(doc.contains(NO_CONTENT_NOTICE));
        assert!(doc.contains("_No speech detected._"));
    }
}
