//! Named pipeline configurations.

use super::{Pipeline, Stage};
use crate::agent::AgentSpec;
use crate::config::{Prompts, Settings};
use crate::error::CopilotError;
use serde::Serialize;
use std::collections::HashMap;

/// Named pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Planner, then the refinement loop, then the deep content loop.
    FullCourse,
    /// Deep content loop only, over existing `course_content`.
    DeepContent,
    Planner,
    Quiz,
    Textbooks,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::FullCourse,
        Preset::DeepContent,
        Preset::Planner,
        Preset::Quiz,
        Preset::Textbooks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::FullCourse => "full-course",
            Preset::DeepContent => "deep-content",
            Preset::Planner => "planner",
            Preset::Quiz => "quiz",
            Preset::Textbooks => "textbooks",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::FullCourse => {
                "Course planning, content generation, and deep week-by-week content creation"
            }
            Preset::DeepContent => "Deep week-by-week content from existing course content",
            Preset::Planner => "Course plan with curated resources",
            Preset::Quiz => "Quiz from the generated course content",
            Preset::Textbooks => "Textbook recommendations for a topic",
        }
    }

    /// Whether the planner instruction file is read for this preset.
    pub fn uses_planner(&self) -> bool {
        matches!(self, Preset::FullCourse | Preset::Planner)
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Preset {
    type Err = CopilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s.trim().to_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                CopilotError::InvalidInput(format!(
                    "unknown preset '{}' (expected one of: {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Values resolved outside the pipeline before it is built.
#[derive(Debug, Clone, Default)]
pub struct PresetInputs {
    /// Contents of the planner instruction file (or its placeholder).
    pub planner_instructions: String,
}

/// Build the pipeline for a preset.
pub fn build_preset(
    preset: Preset,
    settings: &Settings,
    prompts: &Prompts,
    inputs: &PresetInputs,
) -> Pipeline {
    let model = settings.model.agent_model.as_str();
    let iterations = &settings.pipeline;

    let stages = match preset {
        Preset::FullCourse => vec![
            Stage::Agent(planner(model, prompts, inputs)),
            refinement_loop(model, prompts, iterations.refinement_iterations),
            deep_loop(model, prompts, iterations.deep_iterations),
        ],
        Preset::DeepContent => vec![deep_loop(model, prompts, iterations.deep_iterations)],
        Preset::Planner => vec![Stage::Agent(planner(model, prompts, inputs))],
        Preset::Quiz => vec![Stage::Agent(quiz(model, prompts))],
        Preset::Textbooks => vec![Stage::Agent(textbook_searcher(model, prompts))],
    };
    let stages = stages
        .into_iter()
        .map(|stage| apply_sampling(stage, settings))
        .collect();

    Pipeline::new(preset.name(), preset.description(), stages)
}

/// Apply the configured agent sampling settings to every agent in a stage.
fn apply_sampling(stage: Stage, settings: &Settings) -> Stage {
    match stage {
        Stage::Agent(mut spec) => {
            if let Some(t) = settings.model.agent_temperature {
                spec = spec.with_temperature(t);
            }
            if let Some(max) = settings.model.agent_max_output_tokens {
                spec = spec.with_max_output_tokens(max);
            }
            Stage::Agent(spec)
        }
        Stage::Loop {
            name,
            body,
            max_iterations,
        } => Stage::Loop {
            name,
            body: body.into_iter().map(|s| apply_sampling(s, settings)).collect(),
            max_iterations,
        },
    }
}

fn planner(model: &str, prompts: &Prompts, inputs: &PresetInputs) -> AgentSpec {
    let mut vars = HashMap::new();
    vars.insert(
        "planner_instructions".to_string(),
        inputs.planner_instructions.clone(),
    );
    let instruction = Prompts::render(&prompts.agents.planner, &vars);

    AgentSpec::new("course_planner", model, &instruction)
        .with_description("Turns the course specification into a detailed plan with curated resources")
        .with_web_search(true)
        .with_output_key("course_plan")
}

fn refinement_loop(model: &str, prompts: &Prompts, iterations: usize) -> Stage {
    let generator = AgentSpec::new("content_generator", model, &prompts.agents.content_generator)
        .with_description("Writes the educational content for each module of the course plan")
        .with_web_search(true)
        .with_inputs(&["course_plan"])
        .with_output_key("course_content");

    Stage::Loop {
        name: "content_refinement".to_string(),
        body: vec![Stage::Agent(generator)],
        max_iterations: iterations,
    }
}

fn deep_loop(model: &str, prompts: &Prompts, iterations: usize) -> Stage {
    let creator = AgentSpec::new("deep_content_creator", model, &prompts.agents.deep_content)
        .with_description("Expands course content into teachable week-by-week lessons")
        .with_web_search(true)
        .with_session_dump(true)
        .with_inputs(&["course_content"])
        .with_output_key("deep_course_content");

    Stage::Loop {
        name: "deep_content".to_string(),
        body: vec![Stage::Agent(creator)],
        max_iterations: iterations,
    }
}

fn quiz(model: &str, prompts: &Prompts) -> AgentSpec {
    AgentSpec::new("quiz_generator", model, &prompts.agents.quiz)
        .with_description("Writes a level-appropriate quiz from the course content")
        .with_inputs(&["course_plan", "deep_course_content", "course_content"])
        .with_output_key("quiz")
}

fn textbook_searcher(model: &str, prompts: &Prompts) -> AgentSpec {
    AgentSpec::new("textbook_searcher", model, &prompts.agents.textbook_search)
        .with_description("Finds textbooks matching the instructor's request")
        .with_web_search(true)
        .with_output_key("textbook_recommendations")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> PresetInputs {
        PresetInputs {
            planner_instructions: "Course: Data Literacy".to_string(),
        }
    }

    #[test]
    fn test_full_course_shape() {
        let settings = Settings::default();
        let pipeline = build_preset(Preset::FullCourse, &settings, &Prompts::default(), &inputs());
        let plan = pipeline.plan();

        // 1 planner + 2 refinement + 5 deep iterations
        assert_eq!(plan.len(), 8);
        assert_eq!(plan[0].agent.name, "course_planner");
        assert!(plan[0].agent.instruction.contains("Course: Data Literacy"));
        assert!(plan[0].agent.instruction.contains("{{level}}"));
        assert_eq!(plan[2].label, "content_refinement 2/2 > content_generator");
        assert_eq!(plan[7].agent.output_key.as_deref(), Some("deep_course_content"));
        assert!(plan[7].agent.include_session_dump);
    }

    #[test]
    fn test_iteration_counts_follow_settings() {
        let mut settings = Settings::default();
        settings.pipeline.deep_iterations = 3;

        let pipeline = build_preset(Preset::DeepContent, &settings, &Prompts::default(), &inputs());
        assert_eq!(pipeline.plan().len(), 3);
    }

    #[test]
    fn test_quiz_reads_content_keys() {
        let pipeline = build_preset(
            Preset::Quiz,
            &Settings::default(),
            &Prompts::default(),
            &PresetInputs::default(),
        );
        let plan = pipeline.plan();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].agent.inputs.contains(&"deep_course_content".to_string()));
        assert!(!plan[0].agent.web_search);
    }

    #[test]
    fn test_sampling_settings_reach_every_agent() {
        let mut settings = Settings::default();
        settings.model.agent_temperature = Some(0.7);
        settings.model.agent_max_output_tokens = Some(8192);

        let pipeline = build_preset(Preset::FullCourse, &settings, &Prompts::default(), &inputs());
        for step in pipeline.plan() {
            assert_eq!(step.agent.temperature, Some(0.7), "{}", step.label);
            assert_eq!(step.agent.max_output_tokens, Some(8192), "{}", step.label);
        }

        let defaults = build_preset(Preset::Quiz, &Settings::default(), &Prompts::default(), &inputs());
        assert_eq!(defaults.plan()[0].agent.temperature, None);
    }

    #[test]
    fn test_parse_preset_names() {
        assert_eq!("full-course".parse::<Preset>().unwrap(), Preset::FullCourse);
        assert_eq!(" Quiz ".parse::<Preset>().unwrap(), Preset::Quiz);
        let err = "everything".parse::<Preset>().unwrap_err();
        assert!(err.to_string().contains("deep-content"));
    }
}
