//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks against the config file at `config_path`.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Notewise Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // yt-dlp is only needed for YouTube input
    println!("{}", style("External Tools").bold());
    let ytdlp = check_tool("yt-dlp", install_hint_ytdlp());
    ytdlp.print();
    checks.push(ytdlp);

    println!();

    // Check API keys
    println!("{}", style("API Configuration").bold());
    let transcription = &settings.transcription;
    let api_checks = [
        check_api_key(
            transcription.provider.api_key_env(),
            transcription.api_key.as_deref(),
            std::env::var(transcription.provider.api_key_env()).ok(),
        ),
        check_api_key(
            settings.summarization.provider.api_key_env(),
            settings.summarization.api_key.as_deref(),
            std::env::var(settings.summarization.provider.api_key_env()).ok(),
        ),
    ];
    for check in api_checks {
        check.print();
        checks.push(check);
    }

    println!();

    // Models and retry behaviour
    println!("{}", style("Providers").bold());
    Output::kv(
        "Transcription",
        &format!("{} ({})", transcription.provider, transcription.model()),
    );
    Output::kv(
        "Model loading",
        &format!(
            "one retry, default wait {}s, capped at {}s",
            transcription.default_wait_secs, transcription.max_wait_secs
        ),
    );
    Output::kv(
        "Summarization",
        &format!(
            "{} ({})",
            settings.summarization.provider,
            settings.summarization.model()
        ),
    );

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    if let Some(dir) = &settings.prompts.custom_dir {
        let prompts_check = check_prompts_dir(dir);
        prompts_check.print();
        checks.push(prompts_check);
    }

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Notewise.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Notewise is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::warning(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::warning(name, "not found (YouTube input unavailable)", hint)
        }
        Err(e) => CheckResult::warning(name, &format!("error: {}", e), hint),
    }
}

/// Check one provider key. A value in the config file wins over the environment.
fn check_api_key(env_name: &str, configured: Option<&str>, env_value: Option<String>) -> CheckResult {
    let hint = format!("Set with: export {}='...'", env_name);

    let (key, origin) = match (configured, env_value) {
        (Some(key), _) if !key.trim().is_empty() => (key.trim().to_string(), "config file"),
        (_, Some(key)) if !key.trim().is_empty() => (key.trim().to_string(), "environment"),
        (_, Some(_)) => return CheckResult::error(env_name, "empty", &hint),
        _ => return CheckResult::error(env_name, "not set", &hint),
    };

    CheckResult::ok(
        env_name,
        &format!("configured from {} ({})", origin, mask_key(&key)),
    )
}

/// Show only the ends of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.is_file() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: notewise config edit",
        )
    }
}

/// Check the custom prompt directory.
fn check_prompts_dir(dir: &str) -> CheckResult {
    let path = Settings::expand_path(dir);
    if path.join("notes.toml").exists() {
        CheckResult::ok("Custom prompts", &format!("{}", path.display()))
    } else {
        CheckResult::warning(
            "Custom prompts",
            &format!("{} has no notes.toml", path.display()),
            "Built-in prompts will be used",
        )
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
