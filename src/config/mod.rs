//! Configuration module for Notewise.
//!
//! Handles loading settings, resolving credentials and managing prompt templates.

mod credentials;
mod prompts;
mod settings;

pub use credentials::Credentials;
pub use prompts::{NotesPrompts, Prompts};
pub use settings::{
    AudioSettings, NotesSettings, PromptSettings, ServerSettings, Settings,
    SummarizationProvider, SummarizationSettings, TranscriptionProvider, TranscriptionSettings,
};
