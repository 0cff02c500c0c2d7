//! Local file source implementation.

use super::{AudioPayload, AudioSource};
use crate::error::{NotewiseError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Supported audio file extensions and their content types.
const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("mpga", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("mp4", "audio/mp4"),
    ("aac", "audio/aac"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/ogg"),
    ("webm", "audio/webm"),
];

/// Content type for a path, based on its extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    AUDIO_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, content_type)| *content_type)
}

/// Local file source for audio files.
pub struct LocalSource {
    max_bytes: usize,
}

impl LocalSource {
    pub fn new() -> Self {
        Self::with_max_bytes(usize::MAX)
    }

    /// Refuse files larger than `max_bytes` without reading them.
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSource for LocalSource {
    fn name(&self) -> &'static str {
        "local"
    }

    fn can_handle(&self, locator: &str) -> bool {
        let path = Path::new(locator);
        path.is_file() && content_type_for_path(path).is_some()
    }

    async fn fetch(&self, locator: &str) -> Result<AudioPayload> {
        let path = Path::new(locator);

        if !path.is_file() {
            return Err(NotewiseError::SourceUnavailable(format!(
                "File not found: {}",
                locator
            )));
        }

        let content_type = content_type_for_path(path).ok_or_else(|| {
            NotewiseError::InvalidInput(format!("Not a recognized audio file: {}", locator))
        })?;

        let size = tokio::fs::metadata(path).await?.len();
        if size > self.max_bytes as u64 {
            return Err(super::too_large(size, self.max_bytes));
        }

        let bytes = tokio::fs::read(path).await?;
        debug!(bytes = bytes.len(), "Read local audio file");

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());

        Ok(AudioPayload::new(bytes, content_type, name))
    }
}
