//! Transcription client with cold-start retry handling.

use super::{BackendReply, ModelLoading, TranscriptionBackend, TranscriptionOutcome};
use crate::audio_source::AudioPayload;
use crate::config::TranscriptionSettings;
use crate::error::TranscriptionError;
use crate::progress::{PipelineEvent, ProgressReporter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Retries allowed after a "model loading" reply.
pub const MAX_RETRIES: u32 = 1;

/// How long to wait before retrying a cold backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Used when the backend does not suggest a wait.
    pub default_wait: Duration,
    /// Upper bound on any wait.
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&TranscriptionSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &TranscriptionSettings) -> Self {
        Self {
            default_wait: secs(settings.default_wait_secs),
            max_wait: secs(settings.max_wait_secs),
        }
    }

    /// Wait to apply for a given loading reply.
    pub fn wait_for(&self, loading: &ModelLoading) -> Duration {
        loading
            .estimated_wait
            .unwrap_or(self.default_wait)
            .min(self.max_wait)
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

enum State {
    Submitting,
    Backoff(Duration),
    Succeeded(String),
    Failed(TranscriptionError),
}

/// Submits audio to a backend and applies the single-retry cold-start policy.
///
/// The returned future is cancel-safe: dropping it while backing off means
/// the retry is never sent.
#[derive(Clone)]
pub struct TranscriptionClient {
    backend: Arc<dyn TranscriptionBackend>,
    policy: RetryPolicy,
}

impl TranscriptionClient {
    pub fn new(backend: Arc<dyn TranscriptionBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &dyn TranscriptionBackend {
        self.backend.as_ref()
    }

    /// Transcribe a payload, reporting each state transition.
    #[instrument(
        skip(self, payload, progress),
        fields(backend = self.backend.name(), model = self.backend.model(), bytes = payload.len())
    )]
    pub async fn transcribe(
        &self,
        payload: AudioPayload,
        progress: &dyn ProgressReporter,
    ) -> Result<TranscriptionOutcome, TranscriptionError> {
        let mut attempt = 0u32;
        let mut state = State::Submitting;

        loop {
            state = match state {
                State::Submitting => {
                    attempt += 1;
                    progress.report(PipelineEvent::Submitting { attempt });
                    debug!(attempt, "Submitting audio");

                    match self.backend.submit(&payload).await {
                        Ok(BackendReply::Transcript(text)) => State::Succeeded(text),
                        Ok(BackendReply::Loading(loading)) if attempt <= MAX_RETRIES => {
                            let wait = self.policy.wait_for(&loading);
                            info!(
                                "Model is loading, retrying in {:.1}s: {}",
                                wait.as_secs_f64(),
                                loading.message
                            );
                            progress.report(PipelineEvent::ModelLoading {
                                wait_secs: wait.as_secs_f64(),
                                message: loading.message,
                            });
                            State::Backoff(wait)
                        }
                        Ok(BackendReply::Loading(loading)) => {
                            State::Failed(TranscriptionError::backend(format!(
                                "Model still loading after {} attempts: {}",
                                attempt, loading.message
                            )))
                        }
                        Err(e) => State::Failed(e),
                    }
                }
                State::Backoff(wait) => {
                    tokio::time::sleep(wait).await;
                    State::Submitting
                }
                State::Succeeded(text) => {
                    if text.trim().is_empty() {
                        info!("Backend returned an empty transcript");
                        progress.report(PipelineEvent::EmptyTranscript);
                        return Ok(TranscriptionOutcome::EmptyTranscript);
                    }
                    info!(chars = text.len(), attempts = attempt, "Transcription complete");
                    progress.report(PipelineEvent::Transcribed { chars: text.len() });
                    return Ok(TranscriptionOutcome::Text(text));
                }
                State::Failed(error) => {
                    warn!("Transcription failed: {}", error);
                    progress.report(PipelineEvent::TranscriptionFailed {
                        detail: error.to_string(),
                    });
                    return Err(error);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::progress::{NoopReporter, RecordingReporter};
    use crate::testing::ScriptedTranscriber;
    use std::time::Instant;

    fn payload() -> AudioPayload {
        AudioPayload::new(vec![0u8; 10], "audio/wav", Some("clip.wav".into()))
    }

    fn policy(default_ms: u64) -> RetryPolicy {
        RetryPolicy {
            default_wait: Duration::from_millis(default_ms),
            max_wait: Duration::from_secs(5),
        }
    }

    fn client(backend: &Arc<ScriptedTranscriber>, policy: RetryPolicy) -> TranscriptionClient {
        TranscriptionClient::new(backend.clone(), policy)
    }

    #[tokio::test]
    async fn test_first_reply_text_is_returned_verbatim() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![ScriptedTranscriber::text(
            " The mitochondria is the powerhouse. ",
        )]));

        let outcome = client(&backend, policy(10))
            .transcribe(payload(), &NoopReporter)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TranscriptionOutcome::Text(" The mitochondria is the powerhouse. ".into())
        );
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_once_after_reported_wait() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![
            ScriptedTranscriber::loading(Some(Duration::from_millis(80))),
            ScriptedTranscriber::text("warm now"),
        ]));
        let reporter = RecordingReporter::new();

        let started = Instant::now();
        let outcome = client(&backend, policy(5_000))
            .transcribe(payload(), &reporter)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(80));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(outcome, TranscriptionOutcome::Text("warm now".into()));
        assert_eq!(backend.calls(), 2);

        let events = reporter.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], PipelineEvent::Submitting { attempt: 1 });
        assert!(matches!(
            events[1],
            PipelineEvent::ModelLoading { wait_secs, .. } if (wait_secs - 0.08).abs() < 1e-9
        ));
        assert_eq!(events[2], PipelineEvent::Submitting { attempt: 2 });
        assert_eq!(events[3], PipelineEvent::Transcribed { chars: 8 });
    }

    #[tokio::test]
    async fn test_uses_default_wait_when_backend_gives_none() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![
            ScriptedTranscriber::loading(None),
            ScriptedTranscriber::text("ok"),
        ]));

        let started = Instant::now();
        let outcome = client(&backend, policy(60))
            .transcribe(payload(), &NoopReporter)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(outcome, TranscriptionOutcome::Text("ok".into()));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_loading_reply_is_a_backend_error() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![
            ScriptedTranscriber::loading(Some(Duration::from_millis(5))),
            ScriptedTranscriber::loading(Some(Duration::from_millis(5))),
            ScriptedTranscriber::text("never reached"),
        ]));

        let err = client(&backend, policy(5))
            .transcribe(payload(), &NoopReporter)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::BackendError);
        assert!(err.detail.contains("still loading"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_transcripts_are_empty_outcomes() {
        for text in ["", "   ", "\n\t "] {
            let backend = Arc::new(ScriptedTranscriber::new(vec![ScriptedTranscriber::text(text)]));
            let reporter = RecordingReporter::new();

            let outcome = client(&backend, policy(5))
                .transcribe(payload(), &reporter)
                .await
                .unwrap();

            assert_eq!(outcome, TranscriptionOutcome::EmptyTranscript);
            assert_eq!(reporter.events().last(), Some(&PipelineEvent::EmptyTranscript));
        }
    }

    #[tokio::test]
    async fn test_backend_failures_keep_their_detail() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![Err(
            TranscriptionError::unrecognized(r#"{"foo":"bar"}"#),
        )]));

        let err = client(&backend, policy(5))
            .transcribe(payload(), &NoopReporter)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::UnrecognizedResponse);
        assert_eq!(err.detail, r#"{"foo":"bar"}"#);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_wait_is_capped() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![
            ScriptedTranscriber::loading(Some(Duration::from_secs(3_600))),
            ScriptedTranscriber::text("done"),
        ]));
        let capped = RetryPolicy {
            default_wait: Duration::from_millis(5),
            max_wait: Duration::from_millis(20),
        };

        let started = Instant::now();
        client(&backend, capped)
            .transcribe(payload(), &NoopReporter)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_dropping_during_backoff_skips_the_retry() {
        let backend = Arc::new(ScriptedTranscriber::new(vec![
            ScriptedTranscriber::loading(Some(Duration::from_secs(30))),
            ScriptedTranscriber::text("too late"),
        ]));
        let client = client(&backend, policy(5));

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            client.transcribe(payload(), &NoopReporter),
        )
        .await;

        assert!(result.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = TranscriptionSettings {
            default_wait_secs: 7.5,
            max_wait_secs: -1.0,
            ..Default::default()
        };
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.default_wait, Duration::from_millis(7_500));
        assert_eq!(policy.max_wait, Duration::ZERO);

        let loading = ModelLoading {
            estimated_wait: None,
            message: String::new(),
        };
        assert_eq!(RetryPolicy::default().wait_for(&loading), Duration::from_secs(20));
    }

    #[test]
    fn test_policy_saturates_oversized_waits() {
        let settings = TranscriptionSettings {
            default_wait_secs: 1e30,
            max_wait_secs: 30.0,
            ..Default::default()
        };
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.default_wait, Duration::MAX);

        let loading = ModelLoading {
            estimated_wait: Some(Duration::MAX),
            message: String::new(),
        };
        assert_eq!(policy.wait_for(&loading), Duration::from_secs(30));
    }
}
