//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::audio_source::AudioInput;
use crate::config::{Credentials, Settings};
use crate::error::{NotewiseError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Transcription needs the transcription key, and yt-dlp for remote input.
    Transcribe,
    /// Notes need both keys, and yt-dlp for remote input.
    Notes,
    /// The server needs both keys. yt-dlp is only needed for URL requests.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns the resolved credentials if all checks pass, or an error
/// describing what's missing.
pub fn check(
    operation: Operation,
    settings: &Settings,
    input: Option<&AudioInput>,
) -> Result<Credentials> {
    if matches!(input, Some(AudioInput::Remote(_))) {
        check_tool("yt-dlp")?;
    }

    match operation {
        // Transcript-only runs never talk to the summarizer.
        Operation::Transcribe => Ok(Credentials {
            transcription: Credentials::resolve_transcription(settings)?,
            summarization: String::new(),
        }),
        Operation::Notes | Operation::Serve => Credentials::resolve(settings),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(NotewiseError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(NotewiseError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(NotewiseError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
