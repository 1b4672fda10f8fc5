//! Lookup of the planner instruction file spliced into the planner prompt.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the instructor-provided course design specification.
pub const PLANNER_INSTRUCTION_FILE: &str = "planner_agent_instruction.txt";

/// Text used in place of the instructions when no file can be found.
pub const MISSING_INSTRUCTION_PLACEHOLDER: &str = "Planner instruction file not found. Please ensure planner_agent_instruction.txt exists in the current directory or one of its parents.";

/// Candidate locations for the planner instruction file, in search order.
///
/// Configured paths come first. Each may name the file itself or a directory
/// containing it.
pub fn candidate_paths(configured: &[String], cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for entry in configured {
        let path = PathBuf::from(shellexpand::tilde(entry).to_string());
        if path.extension().is_some() {
            candidates.push(path);
        } else {
            candidates.push(path.join(PLANNER_INSTRUCTION_FILE));
        }
    }

    candidates.push(cwd.join(PLANNER_INSTRUCTION_FILE));
    candidates.push(cwd.join("Inputs and Outputs").join(PLANNER_INSTRUCTION_FILE));
    if let Some(parent) = cwd.parent() {
        candidates.push(parent.join(PLANNER_INSTRUCTION_FILE));
        if let Some(grandparent) = parent.parent() {
            candidates.push(grandparent.join(PLANNER_INSTRUCTION_FILE));
        }
    }

    candidates
}

/// Find the first existing planner instruction file.
pub fn find_planner_instruction(configured: &[String], cwd: &Path) -> Option<PathBuf> {
    candidate_paths(configured, cwd)
        .into_iter()
        .find(|p| p.is_file())
}

/// Read the planner instructions, substituting a placeholder when the file is
/// missing or unreadable. Never fails.
pub fn read_planner_instruction(configured: &[String], cwd: &Path) -> String {
    let Some(path) = find_planner_instruction(configured, cwd) else {
        warn!("{} not found, continuing with placeholder", PLANNER_INSTRUCTION_FILE);
        return MISSING_INSTRUCTION_PLACEHOLDER.to_string();
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            debug!("Loaded planner instructions from {:?} ({} bytes)", path, content.len());
            content
        }
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            format!("Error reading planner instruction file: {}", e)
        }
    }
}
