//! Copilot - AI course design assistant for instructors
//!
//! A CLI and library that helps instructors turn a course specification into
//! plans, week-by-week content, module drafts and quizzes.
//!
//! # Overview
//!
//! Copilot allows you to:
//! - Generate a schema-validated module draft (objectives, lessons,
//!   exercises, quiz) in a single model call, optionally aligned to a PDF
//! - Run multi-agent course pipelines whose outputs persist in a SQLite session
//! - Dump a stored session back out as bounded text
//!
//! # Architecture
//!
//! - `config` - Settings, prompt templates and the planner instruction file
//! - `llm` - Model backends behind the `ContentModel` trait (Gemini, OpenAI)
//! - `generator` - Single-pass module draft generation and validation
//! - `session` - SQLite session store and the session dump reader
//! - `agent` - Agent definitions and single-agent execution
//! - `pipeline` - Stage machine and named presets
//! - `orchestrator` - Session resolution and pipeline runs
//!
//! # Example
//!
//! ```rust,no_run
//! use copilot::config::Settings;
//! use copilot::orchestrator::{Orchestrator, RunOverrides};
//! use copilot::pipeline::Preset;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator
//!         .run_preset(Preset::FullCourse, "Generate the course content.", &RunOverrides::default())
//!         .await?;
//!     println!("Saved {:?} in session {}", report.saved_keys, report.session_id);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod session;

pub use error::{CopilotError, Result};
