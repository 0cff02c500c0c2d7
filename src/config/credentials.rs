//! API credential resolution.
//!
//! Credentials are resolved once at startup. Adapters receive the resolved
//! keys through their constructors and never read the environment themselves.

use super::Settings;
use crate::error::{NotewiseError, Result};

/// API keys for the configured transcription and summarization providers.
#[derive(Clone)]
pub struct Credentials {
    pub transcription: String,
    pub summarization: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("transcription", &"<redacted>")
            .field("summarization", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials from the settings, falling back to environment variables.
    pub fn resolve(settings: &Settings) -> Result<Self> {
        Self::resolve_with(settings, |name| std::env::var(name).ok())
    }

    /// Resolve credentials using a custom variable lookup.
    pub fn resolve_with<F>(settings: &Settings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();

        let transcription = pick(
            settings.transcription.api_key.as_deref(),
            settings.transcription.provider.api_key_env(),
            &lookup,
        );
        if transcription.is_none() {
            missing.push(format!(
                "{} (transcription provider '{}')",
                settings.transcription.provider.api_key_env(),
                settings.transcription.provider
            ));
        }

        let summarization = pick(
            settings.summarization.api_key.as_deref(),
            settings.summarization.provider.api_key_env(),
            &lookup,
        );
        if summarization.is_none() {
            missing.push(format!(
                "{} (summarization provider '{}')",
                settings.summarization.provider.api_key_env(),
                settings.summarization.provider
            ));
        }

        match (transcription, summarization) {
            (Some(transcription), Some(summarization)) => Ok(Self {
                transcription,
                summarization,
            }),
            _ => Err(NotewiseError::Config(format!(
                "Missing API credentials: {}. Set them in the environment or in the config file.",
                missing.join(", ")
            ))),
        }
    }

    /// Resolve only the transcription key, for runs that never summarize.
    pub fn resolve_transcription(settings: &Settings) -> Result<String> {
        let provider = settings.transcription.provider;
        pick(
            settings.transcription.api_key.as_deref(),
            provider.api_key_env(),
            &|name: &str| std::env::var(name).ok(),
        )
        .ok_or_else(|| {
            NotewiseError::Config(format!(
                "Missing API credentials: {} (transcription provider '{}'). Set it in the environment or in the config file.",
                provider.api_key_env(),
                provider
            ))
        })
    }
}

fn pick<F>(configured: Option<&str>, env_name: &str, lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    configured
        .map(str::to_string)
        .or_else(|| lookup(env_name))
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
