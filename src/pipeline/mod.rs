//! Multi-agent pipelines as an explicit stage machine.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. A loop stage repeats its
//! body a fixed number of times: there is no exit criterion, so a three
//! iteration loop always runs three times. Before anything executes the
//! stage tree is flattened into a [`Step`] plan, which is also what
//! `copilot presets` prints.

mod presets;

pub use presets::{build_preset, Preset, PresetInputs};

use crate::agent::{AgentRunner, AgentSpec, PipelineContext};
use crate::error::{CopilotError, Result};
use serde::Serialize;
use tracing::{info, instrument};

/// One node in a pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stage {
    Agent(AgentSpec),
    Loop {
        name: String,
        body: Vec<Stage>,
        max_iterations: usize,
    },
}

/// A single agent execution in a flattened plan.
#[derive(Debug, Clone)]
pub struct Step<'a> {
    pub agent: &'a AgentSpec,
    /// Position inside enclosing loops, e.g. `content_refinement 2/2`.
    pub label: String,
}

/// Named, ordered composition of stages.
#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    pub name: String,
    pub description: String,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: &str, description: &str, stages: Vec<Stage>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            stages,
        }
    }

    /// Check structural constraints.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(CopilotError::Pipeline(format!(
                "pipeline {} has no stages",
                self.name
            )));
        }
        validate_stages(&self.stages)
    }

    /// Flatten the stage tree into the exact sequence of agent runs.
    pub fn plan(&self) -> Vec<Step<'_>> {
        let mut steps = Vec::new();
        flatten(&self.stages, "", &mut steps);
        steps
    }

    /// Execute every step in order against the context.
    ///
    /// The first failing step aborts the run. Outputs already written to
    /// state by earlier steps stay persisted.
    #[instrument(skip(self, runner, ctx), fields(pipeline = %self.name))]
    pub async fn run(&self, runner: &AgentRunner, ctx: &mut PipelineContext) -> Result<()> {
        self.validate()?;
        let plan = self.plan();
        let total = plan.len();

        info!("Running pipeline {} ({} steps)", self.name, total);

        for (index, step) in plan.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, total, step.label);
            runner.run(step.agent, ctx).await.map_err(|e| {
                CopilotError::Pipeline(format!("{} failed at {}: {}", self.name, step.label, e))
            })?;
        }

        Ok(())
    }
}

fn validate_stages(stages: &[Stage]) -> Result<()> {
    for stage in stages {
        if let Stage::Loop {
            name,
            body,
            max_iterations,
        } = stage
        {
            if *max_iterations == 0 {
                return Err(CopilotError::Pipeline(format!(
                    "loop {} must run at least once",
                    name
                )));
            }
            if body.is_empty() {
                return Err(CopilotError::Pipeline(format!("loop {} has an empty body", name)));
            }
            validate_stages(body)?;
        }
    }
    Ok(())
}

fn flatten<'a>(stages: &'a [Stage], prefix: &str, steps: &mut Vec<Step<'a>>) {
    for stage in stages {
        match stage {
            Stage::Agent(spec) => steps.push(Step {
                agent: spec,
                label: format!("{}{}", prefix, spec.name),
            }),
            Stage::Loop {
                name,
                body,
                max_iterations,
            } => {
                for i in 1..=*max_iterations {
                    let inner = format!("{}{} {}/{} > ", prefix, name, i, max_iterations);
                    flatten(body, &inner, steps);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedModel;
    use crate::session::{SqliteSessionStore, State};
    use std::sync::Arc;

    fn agent(name: &str, key: &str) -> Stage {
        Stage::Agent(AgentSpec::new(name, "m", "go").with_output_key(key))
    }

    fn sample() -> Pipeline {
        Pipeline::new(
            "sample",
            "plan then refine",
            vec![
                agent("planner", "course_plan"),
                Stage::Loop {
                    name: "refine".to_string(),
                    body: vec![agent("writer", "course_content")],
                    max_iterations: 3,
                },
            ],
        )
    }

    #[test]
    fn test_plan_unrolls_loops() {
        let pipeline = sample();
        let labels: Vec<String> = pipeline.plan().into_iter().map(|s| s.label).collect();

        assert_eq!(
            labels,
            vec![
                "planner",
                "refine 1/3 > writer",
                "refine 2/3 > writer",
                "refine 3/3 > writer",
            ]
        );
    }

    #[test]
    fn test_zero_iteration_loop_rejected() {
        let pipeline = Pipeline::new(
            "bad",
            "",
            vec![Stage::Loop {
                name: "never".to_string(),
                body: vec![agent("writer", "x")],
                max_iterations: 0,
            }],
        );
        assert!(pipeline.validate().is_err());
        assert!(Pipeline::new("empty", "", vec![]).validate().is_err());
    }

    #[tokio::test]
    async fn test_loop_runs_exactly_n_times() {
        let store = Arc::new(SqliteSessionStore::in_memory().unwrap());
        let session = store.create_session("app", "u", State::new()).unwrap();
        let model = Arc::new(ScriptedModel::new(["plan", "v1", "v2", "v3", "unused"]));
        let runner = AgentRunner::new(model.clone(), store.clone());
        let mut ctx = PipelineContext::new(session, "inv", "start");

        sample().run(&runner, &mut ctx).await.unwrap();

        assert_eq!(model.call_count(), 4);
        assert_eq!(ctx.steps, 4);
        assert_eq!(ctx.session.state["course_plan"], "plan");
        assert_eq!(ctx.session.state["course_content"], "v3");

        let stored = store.get_session("app", "u", &ctx.session.id).unwrap().unwrap();
        let authors: Vec<&str> = stored.events.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(authors, vec!["planner", "writer", "writer", "writer"]);
    }

    #[tokio::test]
    async fn test_failure_names_the_step() {
        let store = Arc::new(SqliteSessionStore::in_memory().unwrap());
        let session = store.create_session("app", "u", State::new()).unwrap();
        let model = Arc::new(ScriptedModel::new(["plan", "v1"]));
        let runner = AgentRunner::new(model, store.clone());
        let mut ctx = PipelineContext::new(session, "inv", "start");

        let err = sample().run(&runner, &mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("refine 2/3 > writer"));

        // Earlier outputs stay persisted.
        let stored = store.get_session("app", "u", &ctx.session.id).unwrap().unwrap();
        assert_eq!(stored.state_text("course_content").as_deref(), Some("v1"));
    }
}
