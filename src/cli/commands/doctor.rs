//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::api_key_var;
use crate::cli::Output;
use crate::config::instruction::{candidate_paths, find_planner_instruction};
use crate::config::{ModelProvider, Settings};
use console::style;
use std::path::Path;

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

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Copilot Doctor");
    println!();
    println!("Checking configuration...\n");

    let cwd = std::env::current_dir()?;
    let mut checks = Vec::new();

    println!("{}", style("Model").bold());
    let model_checks = vec![
        CheckResult::ok(
            "Provider",
            &format!(
                "{} (agents: {}, drafts: {})",
                settings.model.provider, settings.model.agent_model, settings.model.draft_model
            ),
        ),
        check_api_key(settings.model.provider, std::env::var(api_key_var(settings.model.provider)).ok()),
    ];
    for check in &model_checks {
        check.print();
    }
    checks.extend(model_checks);

    println!();

    println!("{}", style("Session store").bold());
    let db_check = check_database(&settings.session_db_path(&cwd));
    db_check.print();
    checks.push(db_check);

    println!();

    println!("{}", style("Course inputs").bold());
    let planner_check = check_planner_instruction(settings, &cwd);
    planner_check.print();
    checks.push(planner_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Copilot.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Copilot is ready to use.");
    }

    Ok(())
}

/// Check the provider API key value.
fn check_api_key(provider: ModelProvider, value: Option<String>) -> CheckResult {
    let var = api_key_var(provider);
    let hint = format!("Set with: export {}='...'", var);

    match value {
        Some(key) if key.is_empty() => CheckResult::error(var, "empty", &hint),
        Some(key) if key.chars().count() > 12 => {
            CheckResult::ok(var, &format!("configured ({})", mask_key(&key)))
        }
        Some(_) => CheckResult::warning(var, "set but looks too short", "Double-check the key"),
        None => CheckResult::error(var, "not set", &hint),
    }
}

/// First and last four characters of a secret.
fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(4).collect();
    let mut tail: Vec<char> = key.chars().rev().take(4).collect();
    tail.reverse();
    format!("{}...{}", head, tail.into_iter().collect::<String>())
}

/// Check the session database file.
fn check_database(path: &Path) -> CheckResult {
    if path.exists() {
        let size = std::fs::metadata(path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        CheckResult::ok("Database", &format!("{} ({})", path.display(), size))
    } else {
        CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", path.display()),
            "Database will be created on the first 'copilot run'",
        )
    }
}

/// Check that the planner instruction file can be found.
fn check_planner_instruction(settings: &Settings, cwd: &Path) -> CheckResult {
    let configured = &settings.pipeline.planner_instruction_paths;
    match find_planner_instruction(configured, cwd) {
        Some(path) => CheckResult::ok("Planner instructions", &format!("{}", path.display())),
        None => {
            let searched = candidate_paths(configured, cwd).len();
            CheckResult::warning(
                "Planner instructions",
                &format!("not found ({} locations searched)", searched),
                "Place planner_agent_instruction.txt in the working directory",
            )
        }
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: copilot config set model.provider gemini",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_checks() {
        let missing = check_api_key(ModelProvider::Gemini, None);
        assert_eq!(missing.status, CheckStatus::Error);
        assert_eq!(missing.name, "GEMINI_API_KEY");

        let ok = check_api_key(ModelProvider::OpenAi, Some("sk-abcdefghijklmnop".to_string()));
        assert_eq!(ok.status, CheckStatus::Ok);
        assert!(ok.message.contains("sk-a...mnop"));

        let short = check_api_key(ModelProvider::Gemini, Some("abc".to_string()));
        assert_eq!(short.status, CheckStatus::Warning);
    }

    #[test]
    fn test_mask_key_multibyte() {
        assert_eq!(mask_key("ké€y-0123456789-ñ€€é"), "ké€y...ñ€€é");

        let ok = check_api_key(ModelProvider::Gemini, Some("€€€€€€€€€€€€€".to_string()));
        assert_eq!(ok.status, CheckStatus::Ok);
        assert!(ok.message.contains("€€€€...€€€€"));
    }

    #[test]
    fn test_planner_instruction_check() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().join("x").join("y");
        std::fs::create_dir_all(&cwd).unwrap();
        let settings = Settings::default();

        assert_eq!(check_planner_instruction(&settings, &cwd).status, CheckStatus::Warning);

        std::fs::write(cwd.join("planner_agent_instruction.txt"), "spec").unwrap();
        assert_eq!(check_planner_instruction(&settings, &cwd).status, CheckStatus::Ok);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
