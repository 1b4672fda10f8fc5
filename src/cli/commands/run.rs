//! Run command: execute a pipeline preset.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::generator::Level;
use crate::orchestrator::{Orchestrator, RunOverrides};
use crate::pipeline::Preset;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the run command.
pub async fn run_pipeline(
    preset: &str,
    message: &str,
    interactive: bool,
    mut overrides: RunOverrides,
    settings: Settings,
) -> Result<()> {
    let preset: Preset = preset.parse()?;

    if let Err(e) = preflight::check(Operation::Generate, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'copilot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if interactive {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        ask_preferences(&mut stdin.lock(), &mut stdout, &settings, &mut overrides)?;
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Running {}...", preset));
    let result = orchestrator.run_preset(preset, message, &overrides).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Pipeline failed: {}", e));
            return Err(e.into());
        }
    };

    Output::header("Run complete");
    Output::kv(
        "Session",
        &format!(
            "{}{}",
            report.session_id,
            if report.created { " (new)" } else { "" }
        ),
    );
    Output::kv("Steps", &report.steps.to_string());
    Output::kv("Saved", &report.saved_keys.join(", "));

    match &report.preview {
        Some(preview) => {
            Output::header(&format!("{} (preview)", report.preview_key));
            Output::preview(preview);
        }
        None => Output::info(&format!("No {} yet.", report.preview_key)),
    }

    Ok(())
}

/// Ask for course preferences, keeping defaults on empty answers.
pub fn ask_preferences<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    settings: &Settings,
    overrides: &mut RunOverrides,
) -> io::Result<()> {
    let course = &settings.course;

    let level_default = overrides.level.clone().unwrap_or_else(|| course.level.clone());
    let level = prompt(input, out, "Difficulty (Beginner/Intermediate/Advanced)", &level_default)?;
    overrides.level = Some(Level::normalize(&level).to_string());

    let weeks_default = overrides.duration_weeks.unwrap_or(course.duration_weeks);
    let weeks = prompt(input, out, "Duration in weeks", &weeks_default.to_string())?;
    overrides.duration_weeks = Some(match weeks.parse::<u32>() {
        Ok(w) if w > 0 => w,
        _ => {
            Output::warning(&format!("Invalid duration '{}', using {}", weeks, weeks_default));
            weeks_default
        }
    });

    let style_default = overrides
        .teaching_style
        .clone()
        .unwrap_or_else(|| course.teaching_style.clone());
    let teaching_style = prompt(input, out, "Teaching style", &style_default)?;
    overrides.teaching_style = Some(teaching_style);

    Ok(())
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
    default: &str,
) -> io::Result<String> {
    write!(out, "{} {} ", style(question).bold(), style(format!("[{}]", default)).dim())?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();

    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_answers_keep_defaults() {
        let mut input = Cursor::new("\n\n\n");
        let mut out = Vec::new();
        let mut overrides = RunOverrides::default();

        ask_preferences(&mut input, &mut out, &Settings::default(), &mut overrides).unwrap();

        assert_eq!(overrides.level.as_deref(), Some("Beginner"));
        assert_eq!(overrides.duration_weeks, Some(4));
        assert_eq!(
            overrides.teaching_style.as_deref(),
            Some(crate::generator::DEFAULT_TEACHING_STYLE)
        );
    }

    #[test]
    fn test_answers_are_normalized() {
        let mut input = Cursor::new("adv\n0\nProject-based\n");
        let mut out = Vec::new();
        let mut overrides = RunOverrides::default();

        ask_preferences(&mut input, &mut out, &Settings::default(), &mut overrides).unwrap();

        assert_eq!(overrides.level.as_deref(), Some("Advanced"));
        assert_eq!(overrides.duration_weeks, Some(4));
        assert_eq!(overrides.teaching_style.as_deref(), Some("Project-based"));
        assert!(String::from_utf8(out).unwrap().contains("Duration in weeks"));
    }
}
