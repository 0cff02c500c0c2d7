//! Configuration settings for Notewise.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub summarization: SummarizationSettings,
    pub notes: NotesSettings,
    pub prompts: PromptSettings,
    pub server: ServerSettings,
}

/// Audio acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Largest payload accepted for transcription, in bytes.
    pub max_audio_bytes: usize,
    /// Timeout for downloading a remote audio stream.
    pub download_timeout_secs: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            max_audio_bytes: 25 * 1024 * 1024,
            download_timeout_secs: 600,
        }
    }
}

/// Transcription provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// Hosted Hugging Face inference endpoint (may cold-start).
    #[default]
    HuggingFace,
    /// OpenAI speech-to-text API.
    OpenAi,
}

impl TranscriptionProvider {
    /// Environment variable holding this provider's credential.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            TranscriptionProvider::HuggingFace => "HF_API_TOKEN",
            TranscriptionProvider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            TranscriptionProvider::HuggingFace => "openai/whisper-large-v3",
            TranscriptionProvider::OpenAi => "whisper-1",
        }
    }
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(TranscriptionProvider::HuggingFace),
            "openai" | "whisper" => Ok(TranscriptionProvider::OpenAi),
            _ => Err(format!("Unknown transcription provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionProvider::HuggingFace => write!(f, "huggingface"),
            TranscriptionProvider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Transcription provider (huggingface, openai).
    pub provider: TranscriptionProvider,
    /// Model to use. Defaults per provider when unset.
    pub model: Option<String>,
    /// Base URL override for the provider's API.
    pub endpoint: Option<String>,
    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Wait used when a loading backend does not report `estimated_time`.
    pub default_wait_secs: f64,
    /// Upper bound on a backend-reported wait.
    pub max_wait_secs: f64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::HuggingFace,
            model: None,
            endpoint: None,
            api_key: None,
            timeout_secs: 300,
            default_wait_secs: 20.0,
            max_wait_secs: 120.0,
        }
    }
}

impl TranscriptionSettings {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Summarization provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// Google Gemini generateContent.
    Gemini,
}

impl SummarizationProvider {
    /// Environment variable holding this provider's credential.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            SummarizationProvider::OpenAi => "OPENAI_API_KEY",
            SummarizationProvider::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            SummarizationProvider::OpenAi => "gpt-4o",
            SummarizationProvider::Gemini => "gemini-1.5-flash",
        }
    }
}

impl std::str::FromStr for SummarizationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(SummarizationProvider::OpenAi),
            "gemini" | "google" => Ok(SummarizationProvider::Gemini),
            _ => Err(format!("Unknown summarization provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SummarizationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummarizationProvider::OpenAi => write!(f, "openai"),
            SummarizationProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Summarization service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationSettings {
    /// Summarization provider (openai, gemini).
    pub provider: SummarizationProvider,
    /// Model to use. Defaults per provider when unset.
    pub model: Option<String>,
    /// Base URL override for the provider's API.
    pub endpoint: Option<String>,
    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for SummarizationSettings {
    fn default() -> Self {
        Self {
            provider: SummarizationProvider::OpenAi,
            model: None,
            endpoint: None,
            api_key: None,
            timeout_secs: 120,
            temperature: 0.7,
        }
    }
}

impl SummarizationSettings {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Shape of the generated study notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesSettings {
    /// Number of multiple-choice quiz questions to request.
    pub quiz_questions: u32,
    /// Number of term/definition flashcards to request.
    pub flashcards: u32,
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self {
            quiz_questions: 5,
            flashcards: 10,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::NotewiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notewise")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_provider() {
        let settings = Settings::default();
        assert_eq!(settings.transcription.model(), "openai/whisper-large-v3");
        assert_eq!(settings.summarization.model(), "gpt-4o");
        assert_eq!(settings.notes.quiz_questions, 5);
        assert_eq!(settings.notes.flashcards, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [transcription]
            provider = "openai"
            default_wait_secs = 5.0

            [summarization]
            provider = "gemini"
            model = "gemini-2.0-flash"
            "#,
        )
        .unwrap();

        assert_eq!(settings.transcription.provider, TranscriptionProvider::OpenAi);
        assert_eq!(settings.transcription.model(), "whisper-1");
        assert_eq!(settings.transcription.default_wait_secs, 5.0);
        assert_eq!(settings.transcription.timeout_secs, 300);
        assert_eq!(settings.summarization.model(), "gemini-2.0-flash");
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("hf".parse::<TranscriptionProvider>(), Ok(TranscriptionProvider::HuggingFace));
        assert_eq!("OpenAI".parse::<SummarizationProvider>(), Ok(SummarizationProvider::OpenAi));
        assert!("azure".parse::<TranscriptionProvider>().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.notes.flashcards = 3;
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.notes.flashcards, 3);
    }
}
