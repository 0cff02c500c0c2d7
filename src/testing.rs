//! Scripted backends shared by unit tests.

use crate::audio_source::AudioPayload;
use crate::error::TranscriptionError;
use crate::notes::{SummarizationBackend, SummarizationError};
use crate::transcription::{BackendReply, ModelLoading, TranscriptionBackend};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Reply = Result<BackendReply, TranscriptionError>;

/// Transcription backend that plays back a fixed list of replies.
pub struct ScriptedTranscriber {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<AudioPayload>>,
}

impl ScriptedTranscriber {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Reply {
        Ok(BackendReply::Transcript(text.to_string()))
    }

    pub fn loading(wait: Option<Duration>) -> Reply {
        Ok(BackendReply::Loading(ModelLoading {
            estimated_wait: wait,
            message: "Model openai/whisper-large-v3 is currently loading".to_string(),
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<AudioPayload> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionBackend for ScriptedTranscriber {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-asr"
    }

    async fn submit(&self, payload: &AudioPayload) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(payload.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TranscriptionError::backend("script exhausted")))
    }
}

/// Summarization backend that records prompts and returns a fixed reply.
pub struct ScriptedSummarizer {
    reply: Result<String, String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedSummarizer {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// `(system, user)` prompt pairs received so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummarizationBackend for ScriptedSummarizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-llm"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, SummarizationError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        self.reply.clone().map_err(SummarizationError)
    }
}
