//! CLI output formatting utilities.
//!
//! Status lines go to stderr so transcripts and notes written to stdout can
//! be piped.

use crate::progress::{PipelineEvent, ProgressReporter};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        eprintln!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        eprintln!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Shows pipeline events on a terminal spinner.
///
/// Retry notices and failures are printed as their own lines so they stay
/// visible after the spinner moves on.
pub struct ConsoleReporter {
    spinner: ProgressBar,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            spinner: Output::spinner("Starting..."),
        }
    }

    /// Stop the spinner and clear its line.
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::ModelLoading { .. } | PipelineEvent::EmptyTranscript => {
                self.spinner
                    .println(format!("{} {}", style(">>").yellow().bold(), event));
            }
            PipelineEvent::TranscriptionFailed { .. } | PipelineEvent::NotesFailed { .. } => {
                self.spinner
                    .println(format!("{} {}", style(">>").red().bold(), event));
            }
            PipelineEvent::AudioReady { .. } | PipelineEvent::Transcribed { .. } => {
                self.spinner
                    .println(format!("{} {}", style(">>").green().bold(), event));
            }
            _ => {}
        }
        self.spinner.set_message(event.to_string());
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
