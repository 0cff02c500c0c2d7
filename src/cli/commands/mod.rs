//! CLI command implementations.

mod config;
mod doctor;
mod notes;
mod serve;
mod transcribe;

pub use config::run_config;
pub use doctor::run_doctor;
pub use notes::run_notes;
pub use serve::run_serve;
pub use transcribe::run_transcribe;

use crate::cli::Output;
use crate::config::Settings;

/// Write command output to a file, or to stdout when no path is given.
fn write_output(content: &str, path: Option<&str>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let path = Settings::expand_path(path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
            Output::info(&format!("Wrote {}", path.display()));
        }
        None => println!("{}", content),
    }
    Ok(())
}
