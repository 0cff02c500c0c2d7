//! Notewise - Lecture Audio to Study Notes
//!
//! A CLI tool and HTTP service that transcribes lectures and videos and turns
//! the transcript into study notes: a summary, a quiz and flashcards.
//!
//! # Overview
//!
//! Notewise allows you to:
//! - Transcribe uploaded audio, local files and YouTube videos
//! - Ride out hosted models that are still loading, with a single timed retry
//! - Generate markdown study notes from the transcript
//! - Follow each step of a run as it happens
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings, credentials and prompt templates
//! - `audio_source` - Audio payloads from uploads, local files and YouTube
//! - `transcription` - Speech-to-text backends and the retry policy
//! - `notes` - Study-note generation
//! - `progress` - Pipeline events for display surfaces
//! - `pipeline` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use notewise::audio_source::AudioInput;
//! use notewise::config::{Credentials, Settings};
//! use notewise::pipeline::NotesPipeline;
//! use notewise::progress::NoopReporter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::resolve(&settings)?;
//!     let pipeline = NotesPipeline::from_settings(&settings, &credentials)?;
//!
//!     let input = AudioInput::parse("lecture.mp3")?;
//!     let output = pipeline.run(input, &NoopReporter).await?;
//!     println!("{}", output.transcript_text());
//!
//!     Ok(())
//! }
//! ```

pub mod audio_source;
pub mod cli;
pub mod config;
pub mod error;
pub mod notes;
pub mod openai;
pub mod pipeline;
pub mod progress;
pub mod transcription;

#[cfg(test)]
mod testing;

pub use error::{NotewiseError, Result};
