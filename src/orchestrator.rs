//! Run driver for Copilot.
//!
//! Resolves the session to work in, builds the requested pipeline, runs it,
//! and reports what ended up in session state.

use crate::agent::{AgentRunner, PipelineContext};
use crate::config::instruction::read_planner_instruction;
use crate::config::{Prompts, Settings};
use crate::error::{CopilotError, Result};
use crate::generator::{Level, ModuleGenerator, ModuleRequest};
use crate::llm::{create_model, ContentModel};
use crate::pipeline::{build_preset, Preset, PresetInputs};
use crate::session::{
    DumpOptions, Event, Session, SessionDump, SessionDumpReader, SqliteSessionStore, State,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-run choices that override configured defaults.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub level: Option<String>,
    pub duration_weeks: Option<u32>,
    pub teaching_style: Option<String>,
    /// Work in this session instead of the most recent one.
    pub session_id: Option<String>,
    /// Always start a fresh session.
    pub new_session: bool,
}

impl RunOverrides {
    fn has_preferences(&self) -> bool {
        self.level.is_some() || self.duration_weeks.is_some() || self.teaching_style.is_some()
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub preset: String,
    pub session_id: String,
    /// A new session was created for this run.
    pub created: bool,
    pub steps: usize,
    /// Output keys present in session state after the run.
    pub saved_keys: Vec<String>,
    pub preview_key: String,
    /// Leading characters of the preview key's value, if it exists.
    pub preview: Option<String>,
}

/// The main orchestrator for Copilot runs.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    model: Arc<dyn ContentModel>,
    store: Arc<SqliteSessionStore>,
    db_path: Option<PathBuf>,
    cwd: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator from configuration.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let model = create_model(&settings)?;
        let cwd = std::env::current_dir()?;
        let db_path = settings.session_db_path(&cwd);
        let store = Arc::new(SqliteSessionStore::open(&db_path)?);

        info!("Using {} model {}", model.provider(), settings.model.agent_model);

        Ok(Self {
            settings,
            prompts,
            model,
            store,
            db_path: Some(db_path),
            cwd,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        model: Arc<dyn ContentModel>,
        store: Arc<SqliteSessionStore>,
        db_path: Option<PathBuf>,
        cwd: PathBuf,
    ) -> Self {
        Self {
            settings,
            prompts,
            model,
            store,
            db_path,
            cwd,
        }
    }

    pub fn store(&self) -> Arc<SqliteSessionStore> {
        self.store.clone()
    }

    /// Generator for single-pass module drafts.
    pub fn module_generator(&self) -> ModuleGenerator {
        ModuleGenerator::new(
            self.model.clone(),
            &self.settings.model.draft_model,
            &self.prompts,
        )
    }

    /// Generate a module draft.
    pub async fn generate_module(&self, request: &ModuleRequest) -> Result<Value> {
        self.module_generator().generate(request).await
    }

    /// Dump a session from the backing database file.
    pub fn dump_session(&self, session_id: Option<&str>, options: &DumpOptions) -> Result<SessionDump> {
        let path = self
            .db_path
            .as_ref()
            .ok_or_else(|| CopilotError::Session("session store is not file-backed".to_string()))?;
        SessionDumpReader::new(path).dump(session_id, Some(&self.settings.session.app_name), options)
    }

    /// Run a preset pipeline and report the saved outputs.
    #[instrument(skip(self, message, overrides))]
    pub async fn run_preset(
        &self,
        preset: Preset,
        message: &str,
        overrides: &RunOverrides,
    ) -> Result<RunReport> {
        let (session, created) = self.resolve_session(overrides)?;
        let invocation_id = Uuid::new_v4().to_string();
        let mut ctx = PipelineContext::new(session, &invocation_id, message);

        if !message.trim().is_empty() {
            let event = Event::text(&ctx.session.id, &invocation_id, "user", "user", message);
            self.store.append_event(&event)?;
            ctx.session.events.push(event);
        }

        let inputs = PresetInputs {
            planner_instructions: if preset.uses_planner() {
                read_planner_instruction(&self.settings.pipeline.planner_instruction_paths, &self.cwd)
            } else {
                String::new()
            },
        };

        let pipeline = build_preset(preset, &self.settings, &self.prompts, &inputs);
        let output_keys: Vec<String> = pipeline
            .plan()
            .iter()
            .filter_map(|step| step.agent.output_key.clone())
            .collect();

        let mut runner = AgentRunner::new(self.model.clone(), self.store.clone())
            .with_variables(self.prompts.variables.clone());
        if let Some(path) = &self.db_path {
            runner = runner.with_session_dump(
                SessionDumpReader::new(path),
                self.settings.pipeline.dump_max_chars,
            );
        }

        pipeline.run(&runner, &mut ctx).await?;

        let session = self
            .store
            .get_session(&ctx.session.app_name, &ctx.session.user_id, &ctx.session.id)?
            .ok_or_else(|| CopilotError::SessionNotFound(ctx.session.id.clone()))?;

        let mut saved_keys: Vec<String> = Vec::new();
        for key in output_keys {
            if session.state.contains_key(&key) && !saved_keys.contains(&key) {
                saved_keys.push(key);
            }
        }

        let preview_key = self.settings.pipeline.preview_key.clone();
        let preview = session
            .state_text(&preview_key)
            .map(|text| text.chars().take(self.settings.pipeline.preview_chars).collect());

        info!("Run finished: {} steps, saved {:?}", ctx.steps, saved_keys);

        Ok(RunReport {
            preset: preset.name().to_string(),
            session_id: session.id,
            created,
            steps: ctx.steps,
            saved_keys,
            preview_key,
            preview,
        })
    }

    /// Find the session to run in, creating one seeded with the instructor's
    /// identity and course preferences when needed.
    fn resolve_session(&self, overrides: &RunOverrides) -> Result<(Session, bool)> {
        let app = &self.settings.session.app_name;
        let user = &self.settings.session.user_id;

        let existing = match (&overrides.session_id, overrides.new_session) {
            (Some(id), _) => Some(
                self.store
                    .get_session(app, user, id)?
                    .ok_or_else(|| CopilotError::SessionNotFound(id.clone()))?,
            ),
            (None, true) => None,
            (None, false) => self.store.latest_session(app, user)?,
        };

        match existing {
            Some(mut session) => {
                info!("Reusing session {}", session.id);
                if overrides.has_preferences() {
                    let delta = self.preferences(overrides);
                    session.state = self.store.update_state(app, user, &session.id, &delta)?;
                }
                Ok((session, false))
            }
            None => {
                let mut state = self.preferences(overrides);
                state.insert("user_name".to_string(), json!(self.settings.session.user_name));
                state.insert("user_id".to_string(), json!(user));
                let session = self.store.create_session(app, user, state)?;
                Ok((session, true))
            }
        }
    }

    fn preferences(&self, overrides: &RunOverrides) -> State {
        let course = &self.settings.course;
        let level = overrides.level.as_deref().unwrap_or(&course.level);
        let style = overrides
            .teaching_style
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&course.teaching_style);

        let mut state = State::new();
        state.insert("level".to_string(), json!(Level::normalize(level).as_str()));
        state.insert(
            "duration_weeks".to_string(),
            json!(overrides.duration_weeks.unwrap_or(course.duration_weeks)),
        );
        state.insert("teaching_style".to_string(), json!(style));
        state
    }
}
