//! CLI module for Notewise.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{ConsoleReporter, Output};

use clap::{Parser, Subcommand, ValueEnum};

/// Notewise - Lecture Audio to Study Notes
///
/// Transcribes lectures, podcasts and YouTube videos and turns them into
/// study notes with a summary, a quiz and flashcards.
#[derive(Parser, Debug)]
#[command(name = "notewise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe audio and generate study notes
    Notes {
        /// YouTube URL/ID, or local audio file path
        input: String,

        /// Write the notes to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = NotesFormat::Markdown)]
        format: NotesFormat,
    },

    /// Transcribe audio without generating notes
    Transcribe {
        /// YouTube URL/ID, or local audio file path
        input: String,

        /// Write the transcript to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Output format for the `notes` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesFormat {
    /// Transcript and notes as a markdown document
    Markdown,
    /// Transcript, notes and metadata as JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
