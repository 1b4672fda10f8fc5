//! Configuration module for Copilot.
//!
//! Handles loading application settings, prompt templates and the planner
//! instruction file.

pub mod instruction;
mod prompts;
mod settings;

pub use prompts::{AgentPrompts, ModulePrompts, Prompts};
pub use settings::{
    CourseSettings, DatabaseSettings, GeneralSettings, ModelProvider, ModelSettings,
    PipelineSettings, PromptSettings, SessionSettings, Settings,
};
