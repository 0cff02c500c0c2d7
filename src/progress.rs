//! Pipeline progress events.
//!
//! Each stage reports its state transitions as discrete [`PipelineEvent`]s so
//! a display surface can show progress (e.g. "retrying in 20s") rather than
//! only the final result.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// A single observable step in a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Audio is being obtained from its source.
    FetchingAudio { source: String },
    /// Audio payload is ready.
    AudioReady {
        name: String,
        content_type: String,
        bytes: usize,
    },
    /// A transcription request is being sent. `attempt` starts at 1.
    Submitting { attempt: u32 },
    /// The backend is still loading its model; the request will be retried.
    ModelLoading { wait_secs: f64, message: String },
    /// Transcription produced text.
    Transcribed { chars: usize },
    /// Transcription succeeded but contained no speech.
    EmptyTranscript,
    /// Transcription failed terminally.
    TranscriptionFailed { detail: String },
    /// Study notes are being generated.
    GeneratingNotes { model: String },
    /// Study notes are ready.
    NotesReady { chars: usize },
    /// Study note generation failed.
    NotesFailed { detail: String },
}

impl std::fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineEvent::FetchingAudio { source } => write!(f, "Fetching audio from {}", source),
            PipelineEvent::AudioReady { name, bytes, .. } => {
                write!(f, "Loaded '{}' ({} bytes)", name, bytes)
            }
            PipelineEvent::Submitting { attempt: 1 } => write!(f, "Transcribing audio"),
            PipelineEvent::Submitting { attempt } => {
                write!(f, "Transcribing audio (attempt {})", attempt)
            }
            PipelineEvent::ModelLoading { wait_secs, .. } => {
                write!(f, "Model is loading, retrying in {:.0} seconds", wait_secs)
            }
            PipelineEvent::Transcribed { chars } => {
                write!(f, "Transcription complete ({} characters)", chars)
            }
            PipelineEvent::EmptyTranscript => write!(f, "No speech detected in the audio"),
            PipelineEvent::TranscriptionFailed { detail } => {
                write!(f, "Transcription failed: {}", detail)
            }
            PipelineEvent::GeneratingNotes { model } => {
                write!(f, "Generating study notes with {}", model)
            }
            PipelineEvent::NotesReady { chars } => {
                write!(f, "Study notes ready ({} characters)", chars)
            }
            PipelineEvent::NotesFailed { detail } => write!(f, "Note generation failed: {}", detail),
        }
    }
}

/// Receives pipeline events as they happen.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: PipelineEvent);
}

/// Discards all events.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: PipelineEvent) {}
}

/// Forwards events into a tokio channel.
///
/// Events sent after the receiver is dropped are discarded.
pub struct ChannelReporter {
    tx: UnboundedSender<PipelineEvent>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory, in order.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_retry_notice() {
        let event = PipelineEvent::ModelLoading {
            wait_secs: 20.0,
            message: "Model is currently loading".to_string(),
        };
        assert_eq!(event.to_string(), "Model is loading, retrying in 20 seconds");
        assert_eq!(
            PipelineEvent::Submitting { attempt: 2 }.to_string(),
            "Transcribing audio (attempt 2)"
        );
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let json = serde_json::to_value(PipelineEvent::Submitting { attempt: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"event": "submitting", "attempt": 1}));
    }

    #[tokio::test]
    async fn test_channel_reporter_forwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let reporter = ChannelReporter::new(tx);
        reporter.report(PipelineEvent::EmptyTranscript);
        drop(reporter);

        assert_eq!(rx.recv().await, Some(PipelineEvent::EmptyTranscript));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.report(PipelineEvent::Submitting { attempt: 1 });
        reporter.report(PipelineEvent::Transcribed { chars: 5 });

        assert_eq!(
            reporter.events(),
            vec![
                PipelineEvent::Submitting { attempt: 1 },
                PipelineEvent::Transcribed { chars: 5 },
            ]
        );
    }
}
