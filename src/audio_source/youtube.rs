//! YouTube source implementation.
//!
//! `yt-dlp` resolves a video to its best audio-only stream; the stream itself
//! is then downloaded into memory over HTTP.

use super::{AudioPayload, AudioSource, FALLBACK_CONTENT_TYPE};
use crate::error::{NotewiseError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// An audio-only stream resolved from a video page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    /// Direct media URL.
    pub url: String,
    /// Video title, if reported.
    pub title: Option<String>,
    /// Container extension of the stream (e.g. `webm`, `m4a`).
    pub ext: Option<String>,
    /// Headers yt-dlp expects to be sent with the download.
    pub http_headers: HashMap<String, String>,
}

impl ResolvedStream {
    /// Parse the output of `yt-dlp --dump-json`.
    pub fn from_ytdlp_json(json_str: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
            NotewiseError::SourceUnavailable(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        let url = json["url"]
            .as_str()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                NotewiseError::SourceUnavailable("yt-dlp did not report an audio stream".to_string())
            })?
            .to_string();

        let http_headers = json["http_headers"]
            .as_object()
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            url,
            title: json["title"].as_str().map(|s| s.to_string()),
            ext: json["ext"].as_str().map(|s| s.to_string()),
            http_headers,
        })
    }

    /// File name presented to the transcription backend.
    pub fn file_name(&self) -> String {
        match (&self.title, &self.ext) {
            (Some(title), Some(ext)) => format!("{}.{}", title, ext),
            (None, Some(ext)) => format!("audio.{}", ext),
            _ => "audio.mp3".to_string(),
        }
    }
}

/// YouTube audio source.
pub struct YoutubeSource {
    video_id_regex: Regex,
    client: reqwest::Client,
    max_bytes: usize,
}

impl YoutubeSource {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a source whose downloads are bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    fn with_client(client: reqwest::Client) -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex");

        Self {
            video_id_regex,
            client,
            max_bytes: usize::MAX,
        }
    }

    /// Abort downloads that grow past `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Extract video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let input = input.trim();

        // Absolute URLs are matched structurally, anything else by pattern
        if let Ok(url) = Url::parse(input) {
            return video_id_from_url(&url);
        }

        let caps = self.video_id_regex.captures(input)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Resolve a video ID to its best audio-only stream using yt-dlp.
    #[instrument(skip(self))]
    pub async fn resolve_stream(&self, video_id: &str) -> Result<ResolvedStream> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--no-download",
                "--no-playlist",
                "--no-warnings",
                "-f",
                "bestaudio/best",
                &url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NotewiseError::ToolNotFound("yt-dlp".to_string())
                } else {
                    NotewiseError::SourceUnavailable(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NotewiseError::SourceUnavailable(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        ResolvedStream::from_ytdlp_json(&String::from_utf8_lossy(&output.stdout))
    }

    /// Download a resolved stream into memory, stopping at the size limit.
    #[instrument(skip(self, stream), fields(title = ?stream.title))]
    pub async fn download(&self, stream: &ResolvedStream) -> Result<AudioPayload> {
        let mut request = self.client.get(&stream.url);
        for (name, value) in &stream.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request.send().await.map_err(|e| {
            NotewiseError::SourceUnavailable(format!("Audio download failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotewiseError::SourceUnavailable(format!(
                "Audio download returned HTTP {}",
                status
            )));
        }

        // Stream hosts often answer with a generic type; only trust audio/*.
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_lowercase())
            .filter(|v| v.starts_with("audio/"))
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        let declared = response.content_length();
        if let Some(len) = declared.filter(|len| *len > self.max_bytes as u64) {
            return Err(super::too_large(len, self.max_bytes));
        }

        let mut bytes = Vec::with_capacity(declared.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            NotewiseError::SourceUnavailable(format!("Audio download interrupted: {}", e))
        })? {
            let size = bytes.len() + chunk.len();
            if size > self.max_bytes {
                return Err(super::too_large(size as u64, self.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(NotewiseError::SourceUnavailable(
                "Audio download returned no data".to_string(),
            ));
        }

        debug!(bytes = bytes.len(), %content_type, "Downloaded audio stream");
        Ok(AudioPayload::new(bytes, content_type, Some(stream.file_name())))
    }
}

fn video_id_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host);

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next()?.to_string(),
        "youtube.com" | "music.youtube.com" if url.path() == "/watch" => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?,
        "youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next()? {
                "embed" | "shorts" | "v" | "live" => segments.next()?.to_string(),
                _ => return None,
            }
        }
        _ => return None,
    };

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSource for YoutubeSource {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn can_handle(&self, locator: &str) -> bool {
        self.extract_video_id(locator).is_some()
    }

    async fn fetch(&self, locator: &str) -> Result<AudioPayload> {
        let video_id = self.extract_video_id(locator).ok_or_else(|| {
            NotewiseError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", locator))
        })?;

        let stream = self.resolve_stream(&video_id).await?;
        info!(
            "Resolved audio stream for '{}'",
            stream.title.as_deref().unwrap_or(&video_id)
        );

        self.download(&stream).await
    }
}
