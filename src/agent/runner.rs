//! Runs one agent against a session.

use super::AgentSpec;
use crate::error::Result;
use crate::llm::{ContentModel, GenerationRequest, Part};
use crate::session::{DumpOptions, Event, Session, SessionDumpReader, SqliteSessionStore, State};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const FALLBACK_USER_MESSAGE: &str = "Proceed with your task.";

/// Text produced by the most recent agent.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub author: String,
    pub text: String,
}

/// Mutable state threaded through a pipeline run.
#[derive(Debug)]
pub struct PipelineContext {
    pub session: Session,
    pub invocation_id: String,
    /// Message the run was started with.
    pub user_message: String,
    pub last_output: Option<AgentOutput>,
    /// Agent executions so far.
    pub steps: usize,
}

impl PipelineContext {
    pub fn new(session: Session, invocation_id: &str, user_message: &str) -> Self {
        Self {
            session,
            invocation_id: invocation_id.to_string(),
            user_message: user_message.to_string(),
            last_output: None,
            steps: 0,
        }
    }
}

/// Executes agents: render, call the model, record the result.
pub struct AgentRunner {
    model: Arc<dyn ContentModel>,
    store: Arc<SqliteSessionStore>,
    dump_reader: Option<SessionDumpReader>,
    dump_max_chars: usize,
    variables: HashMap<String, String>,
}

impl AgentRunner {
    pub fn new(model: Arc<dyn ContentModel>, store: Arc<SqliteSessionStore>) -> Self {
        Self {
            model,
            store,
            dump_reader: None,
            dump_max_chars: crate::session::DEFAULT_MAX_CHARS,
            variables: HashMap::new(),
        }
    }

    /// Enable session dump grounding for agents that ask for it.
    pub fn with_session_dump(mut self, reader: SessionDumpReader, max_chars: usize) -> Self {
        self.dump_reader = Some(reader);
        self.dump_max_chars = max_chars;
        self
    }

    /// Config variables available to every instruction.
    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Run a single agent and return its text.
    #[instrument(skip(self, spec, ctx), fields(agent = %spec.name))]
    pub async fn run(&self, spec: &AgentSpec, ctx: &mut PipelineContext) -> Result<String> {
        let instruction = spec.render_instruction(&ctx.session.state, &self.variables);

        let mut request = GenerationRequest::new(&spec.model, &instruction)
            .with_web_search(spec.web_search);
        if let Some(t) = spec.temperature {
            request = request.with_temperature(t);
        }
        if let Some(max) = spec.max_output_tokens {
            request = request.with_max_output_tokens(max);
        }

        for part in self.user_parts(spec, ctx) {
            request = request.with_part(part);
        }

        info!("Running agent {} (step {})", spec.name, ctx.steps + 1);
        let text = self.model.generate(request).await?;
        debug!("Agent {} returned {} chars", spec.name, text.len());

        let session = &ctx.session;
        let event = Event::text(&session.id, &ctx.invocation_id, &spec.name, "model", &text);
        self.store.append_event(&event)?;
        ctx.session.events.push(event);

        if let Some(key) = &spec.output_key {
            let mut delta = State::new();
            delta.insert(key.clone(), Value::String(text.clone()));
            let session = &ctx.session;
            let merged =
                self.store
                    .update_state(&session.app_name, &session.user_id, &session.id, &delta)?;
            ctx.session.state = merged;
            debug!("Saved output to state key {}", key);
        }

        ctx.last_output = Some(AgentOutput {
            author: spec.name.clone(),
            text: text.clone(),
        });
        ctx.steps += 1;

        Ok(text)
    }

    fn user_parts(&self, spec: &AgentSpec, ctx: &PipelineContext) -> Vec<Part> {
        let mut parts = Vec::new();

        if !ctx.user_message.trim().is_empty() {
            parts.push(Part::text(ctx.user_message.clone()));
        }

        if let Some(prev) = &ctx.last_output {
            parts.push(Part::text(format!("[{}] said:\n{}", prev.author, prev.text)));
        }

        if spec.include_session_dump {
            if let Some(dump) = self.session_dump(ctx) {
                parts.push(Part::text(format!("Session history:\n{}", dump)));
            }
        }

        if parts.is_empty() {
            parts.push(Part::text(FALLBACK_USER_MESSAGE));
        }

        parts
    }

    fn session_dump(&self, ctx: &PipelineContext) -> Option<String> {
        let Some(reader) = &self.dump_reader else {
            warn!("Session dump requested but no database file is configured");
            return None;
        };

        let options = DumpOptions {
            max_chars: self.dump_max_chars,
            ..DumpOptions::default()
        };

        match reader.dump(Some(&ctx.session.id), Some(&ctx.session.app_name), &options) {
            Ok(dump) => {
                if dump.truncated {
                    debug!("Session dump truncated to {} chars", dump.chars);
                }
                Some(dump.dump)
            }
            Err(e) => {
                warn!("Could not read session dump: {}", e);
                None
            }
        }
    }
}
