//! Audio source abstraction for Notewise.
//!
//! Resolves a single in-memory [`AudioPayload`] from an upload, a local file,
//! or a remote locator such as a YouTube URL. Audio is never decoded here; the
//! bytes are forwarded to the transcription backend as-is.

mod local;
mod youtube;

pub use local::{content_type_for_path, LocalSource};
pub use youtube::{ResolvedStream, YoutubeSource};

use crate::config::AudioSettings;
use crate::error::{NotewiseError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Content type assigned when a source does not report a usable one.
pub const FALLBACK_CONTENT_TYPE: &str = "audio/mpeg";

/// Raw audio bytes plus their declared content type.
///
/// A payload is consumed by exactly one transcription call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    bytes: Vec<u8>,
    content_type: String,
    name: Option<String>,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>, name: Option<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Name to show users and to send as a file name to upload-style APIs.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("audio.mp3")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Error for audio that would exceed `max_bytes`.
pub(crate) fn too_large(size: u64, max_bytes: usize) -> NotewiseError {
    NotewiseError::InvalidInput(format!(
        "Audio is at least {} bytes, larger than the {} byte limit",
        size, max_bytes
    ))
}

/// Where the audio for a request comes from.
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Bytes supplied directly by the caller.
    Upload(AudioPayload),
    /// Audio file on the local filesystem.
    LocalFile(PathBuf),
    /// Remote locator (YouTube URL or video ID).
    Remote(String),
}

impl AudioInput {
    /// Classify a command-line style input string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(NotewiseError::InvalidInput("Empty input".to_string()));
        }

        let path = Path::new(input);
        if path.is_file() {
            return Ok(AudioInput::LocalFile(path.to_path_buf()));
        }

        if YoutubeSource::new().can_handle(input) {
            return Ok(AudioInput::Remote(input.to_string()));
        }

        Err(NotewiseError::InvalidInput(format!(
            "Not a YouTube URL or an existing audio file: {}",
            input
        )))
    }

    /// Short human-readable description for logs and progress output.
    pub fn describe(&self) -> String {
        match self {
            AudioInput::Upload(payload) => format!("upload '{}'", payload.display_name()),
            AudioInput::LocalFile(path) => format!("file '{}'", path.display()),
            AudioInput::Remote(locator) => format!("remote '{}'", locator),
        }
    }
}

/// Trait for audio source providers.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check if this source can handle the given locator.
    fn can_handle(&self, locator: &str) -> bool;

    /// Fetch the full audio content for a locator.
    async fn fetch(&self, locator: &str) -> Result<AudioPayload>;
}

/// Turns any [`AudioInput`] into a payload ready for transcription.
pub struct AudioResolver {
    local: LocalSource,
    remote: Box<dyn AudioSource>,
    max_bytes: usize,
}

impl AudioResolver {
    pub fn new(settings: &AudioSettings) -> Result<Self> {
        let remote = YoutubeSource::with_timeout(Duration::from_secs(settings.download_timeout_secs))?
            .with_max_bytes(settings.max_audio_bytes);
        Ok(Self::with_remote(Box::new(remote), settings.max_audio_bytes))
    }

    /// Build a resolver with a custom remote source.
    pub fn with_remote(remote: Box<dyn AudioSource>, max_bytes: usize) -> Self {
        Self {
            local: LocalSource::with_max_bytes(max_bytes),
            remote,
            max_bytes,
        }
    }

    #[instrument(skip(self, input), fields(input = %input.describe()))]
    pub async fn resolve(&self, input: AudioInput) -> Result<AudioPayload> {
        let payload = match input {
            AudioInput::Upload(payload) => payload,
            AudioInput::LocalFile(path) => {
                let locator = path.to_string_lossy();
                self.local.fetch(&locator).await?
            }
            AudioInput::Remote(locator) => {
                if !self.remote.can_handle(&locator) {
                    return Err(NotewiseError::InvalidInput(format!(
                        "{} source cannot handle: {}",
                        self.remote.name(),
                        locator
                    )));
                }
                self.remote.fetch(&locator).await?
            }
        };

        if payload.is_empty() {
            return Err(NotewiseError::SourceUnavailable(format!(
                "No audio data in {}",
                payload.display_name()
            )));
        }

        if payload.len() > self.max_bytes {
            return Err(too_large(payload.len() as u64, self.max_bytes));
        }

        debug!(
            bytes = payload.len(),
            content_type = payload.content_type(),
            "Audio payload ready"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRemote(Vec<u8>);

    #[async_trait]
    impl AudioSource for FixedRemote {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn can_handle(&self, locator: &str) -> bool {
            locator.starts_with("fixed://")
        }

        async fn fetch(&self, _locator: &str) -> Result<AudioPayload> {
            Ok(AudioPayload::new(self.0.clone(), FALLBACK_CONTENT_TYPE, None))
        }
    }

    #[tokio::test]
    async fn test_upload_passes_through_verbatim() {
        let resolver = AudioResolver::with_remote(Box::new(FixedRemote(vec![1])), 1024);
        let upload = AudioPayload::new(vec![9; 10], "audio/wav", None);

        let payload = resolver.resolve(AudioInput::Upload(upload.clone())).await.unwrap();
        assert_eq!(payload, upload);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_audio() {
        let resolver = AudioResolver::with_remote(Box::new(FixedRemote(Vec::new())), 4);

        let err = resolver
            .resolve(AudioInput::Remote("fixed://x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, NotewiseError::SourceUnavailable(_)));

        let big = AudioPayload::new(vec![0; 5], "audio/wav", None);
        let err = resolver.resolve(AudioInput::Upload(big)).await.unwrap_err();
        assert!(matches!(err, NotewiseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_local_files_are_checked_before_reading() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), [0u8; 10]).unwrap();

        let resolver = AudioResolver::with_remote(Box::new(FixedRemote(vec![1])), 4);
        let err = resolver
            .resolve(AudioInput::LocalFile(file.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, NotewiseError::InvalidInput(ref msg) if msg.contains("4 byte limit")));
    }

    #[tokio::test]
    async fn test_remote_must_be_handled() {
        let resolver = AudioResolver::with_remote(Box::new(FixedRemote(vec![1])), 1024);
        let err = resolver
            .resolve(AudioInput::Remote("ftp://elsewhere".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, NotewiseError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_input() {
        assert!(matches!(
            AudioInput::parse("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            AudioInput::Remote(_)
        ));

        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        assert!(matches!(
            AudioInput::parse(file.path().to_str().unwrap()).unwrap(),
            AudioInput::LocalFile(_)
        ));

        assert!(AudioInput::parse("").is_err());
        assert!(AudioInput::parse("/definitely/not/here.mp3").is_err());
    }
}
