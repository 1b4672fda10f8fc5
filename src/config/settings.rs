//! Configuration settings for Copilot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub database: DatabaseSettings,
    pub model: ModelSettings,
    pub session: SessionSettings,
    pub pipeline: PipelineSettings,
    pub course: CourseSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.copilot".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Session database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database URL (`sqlite:///<path>`). `DATABASE_URL` takes precedence.
    pub url: Option<String>,
    /// File name searched for when no URL is configured.
    pub filename: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            filename: "my_agent_data.db".to_string(),
        }
    }
}

/// Model provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Google Gemini `generateContent` API (default).
    #[default]
    Gemini,
    /// OpenAI chat completions.
    OpenAi,
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ModelProvider::Gemini),
            "openai" => Ok(ModelProvider::OpenAi),
            _ => Err(format!("Unknown model provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelProvider::Gemini => write!(f, "gemini"),
            ModelProvider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider backing every agent and the module generator.
    pub provider: ModelProvider,
    /// Model used by pipeline agents.
    pub agent_model: String,
    /// Model used by the module draft generator.
    pub draft_model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Override for the provider base URL (useful for proxies).
    pub base_url: Option<String>,
    /// Sampling temperature for pipeline agents. Provider default when unset.
    pub agent_temperature: Option<f32>,
    /// Response length cap for pipeline agents.
    pub agent_max_output_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Gemini,
            agent_model: "gemini-2.0-flash".to_string(),
            draft_model: "gemini-2.0-flash".to_string(),
            timeout_seconds: 300,
            base_url: None,
            agent_temperature: None,
            agent_max_output_tokens: None,
        }
    }
}

/// Identity used when looking up or creating sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub app_name: String,
    pub user_id: String,
    pub user_name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            app_name: "AI Copilot for Instructors".to_string(),
            user_id: "instructor".to_string(),
            user_name: "Instructor".to_string(),
        }
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Iterations of the content refinement loop.
    pub refinement_iterations: usize,
    /// Iterations of the deep week-by-week content loop.
    pub deep_iterations: usize,
    /// Extra locations searched for `planner_agent_instruction.txt`.
    pub planner_instruction_paths: Vec<String>,
    /// Character budget of the session dump handed to the deep content agent.
    pub dump_max_chars: usize,
    /// State key previewed after a run.
    pub preview_key: String,
    /// Number of characters shown in the preview.
    pub preview_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            refinement_iterations: 2,
            deep_iterations: 5,
            planner_instruction_paths: Vec::new(),
            dump_max_chars: crate::session::DEFAULT_MAX_CHARS,
            preview_key: "deep_course_content".to_string(),
            preview_chars: 400,
        }
    }
}

/// Defaults for course preferences collected from the instructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSettings {
    pub level: String,
    pub duration_weeks: u32,
    pub teaching_style: String,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            level: "Beginner".to_string(),
            duration_weeks: 4,
            teaching_style: crate::generator::DEFAULT_TEACHING_STYLE.to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CopilotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("copilot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Database URL, with the `DATABASE_URL` environment variable taking precedence.
    pub fn database_url(&self) -> Option<String> {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| self.database.url.clone())
    }

    /// SQLite file backing the session store.
    ///
    /// An existing file in `cwd`, the data directory or the parent of `cwd`
    /// is reused; otherwise a new one is placed in `cwd`.
    pub fn session_db_path(&self, cwd: &Path) -> PathBuf {
        let mut search = vec![cwd.to_path_buf(), self.data_dir()];
        if let Some(parent) = cwd.parent() {
            search.push(parent.to_path_buf());
        }
        crate::session::resolve_database_path(
            self.database_url().as_deref(),
            &self.database.filename,
            &search,
            cwd,
        )
    }
}
