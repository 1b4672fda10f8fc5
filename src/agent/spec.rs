//! Agent definition.

use crate::config::Prompts;
use crate::session::{value_text, State};
use serde::Serialize;
use std::collections::HashMap;

/// Substituted for a declared input that is not in state yet.
pub const MISSING_INPUT: &str = "(not available yet)";

/// Declarative description of one model-backed agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSpec {
    pub name: String,
    pub description: String,
    pub model: String,
    /// Template with `{{key}}` placeholders filled from session state.
    pub instruction: String,
    /// Ground answers with the provider's web search.
    pub web_search: bool,
    /// State key receiving the agent's final text.
    pub output_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Attach a bounded dump of the current session as extra context.
    pub include_session_dump: bool,
    /// State keys the instruction reads. Missing ones render as [`MISSING_INPUT`].
    pub inputs: Vec<String>,
}

impl AgentSpec {
    pub fn new(name: &str, model: &str, instruction: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            model: model.to_string(),
            instruction: instruction.to_string(),
            web_search: false,
            output_key: None,
            temperature: None,
            max_output_tokens: None,
            include_session_dump: false,
            inputs: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_output_key(mut self, key: &str) -> Self {
        self.output_key = Some(key.to_string());
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn with_session_dump(mut self, enabled: bool) -> Self {
        self.include_session_dump = enabled;
        self
    }

    pub fn with_inputs(mut self, keys: &[&str]) -> Self {
        self.inputs = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Render the instruction against session state.
    ///
    /// State values win over config variables. Placeholders that match
    /// neither are left untouched.
    pub fn render_instruction(&self, state: &State, variables: &HashMap<String, String>) -> String {
        let mut vars = variables.clone();

        for key in &self.inputs {
            vars.insert(key.clone(), MISSING_INPUT.to_string());
        }
        for (key, value) in state {
            vars.insert(key.clone(), value_text(value));
        }

        Prompts::render(&self.instruction, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: serde_json::Value) -> State {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_render_from_state() {
        let spec = AgentSpec::new("writer", "m", "Plan: {{course_plan}} / weeks: {{duration_weeks}} / {{other}}");
        let rendered = spec.render_instruction(
            &state(json!({"course_plan": "Week 1: basics", "duration_weeks": 6})),
            &HashMap::new(),
        );

        assert_eq!(rendered, "Plan: Week 1: basics / weeks: 6 / {{other}}");
    }

    #[test]
    fn test_missing_inputs_render_placeholder() {
        let spec = AgentSpec::new("quiz", "m", "Content: {{deep_course_content}}")
            .with_inputs(&["deep_course_content"]);
        let rendered = spec.render_instruction(&State::new(), &HashMap::new());

        assert_eq!(rendered, format!("Content: {}", MISSING_INPUT));
    }

    #[test]
    fn test_state_values_are_not_rendered_again() {
        let spec = AgentSpec::new("quiz", "m", "Content: {{course_content}}");
        let st = state(json!({
            "course_content": "In Vue write {{level}} in a template",
            "level": "Advanced"
        }));

        for _ in 0..50 {
            assert_eq!(
                spec.render_instruction(&st, &HashMap::new()),
                "Content: In Vue write {{level}} in a template"
            );
        }
    }

    #[test]
    fn test_state_overrides_variables() {
        let spec = AgentSpec::new("a", "m", "{{school}} {{level}}");
        let mut vars = HashMap::new();
        vars.insert("school".to_string(), "Northside".to_string());
        vars.insert("level".to_string(), "Beginner".to_string());

        let rendered = spec.render_instruction(&state(json!({"level": "Advanced"})), &vars);
        assert_eq!(rendered, "Northside Advanced");
    }
}
