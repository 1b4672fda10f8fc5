//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
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

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a session listing row.
    pub fn session_info(id: &str, created: &str, events: usize, keys: &[String]) {
        let keys = if keys.is_empty() {
            "no state".to_string()
        } else {
            keys.join(", ")
        };
        println!(
            "  {} {} ({}, {} events, {})",
            style("*").cyan(),
            style(id).bold(),
            style(created).dim(),
            events,
            keys
        );
    }

    /// Print a pipeline step.
    pub fn step(index: usize, label: &str, output_key: Option<&str>) {
        let target = output_key
            .map(|k| format!(" -> {}", style(k).cyan()))
            .unwrap_or_default();
        println!("  {:>2}. {}{}", index, label, target);
    }

    /// Print a preview block with a dimmed ellipsis.
    pub fn preview(text: &str) {
        println!("{}{}", text, style("...").dim());
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
