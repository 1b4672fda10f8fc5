//! Typed view of a generated module draft.

use crate::error::{CopilotError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Course difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    /// Normalize free-form input by case-insensitive prefix.
    ///
    /// `beg*` -> Beginner, `int*` -> Intermediate, `adv*` -> Advanced,
    /// anything else (including empty) -> Beginner.
    pub fn normalize(input: &str) -> Self {
        let lower = input.trim().to_lowercase();
        if lower.starts_with("beg") {
            Level::Beginner
        } else if lower.starts_with("int") {
            Level::Intermediate
        } else if lower.starts_with("adv") {
            Level::Advanced
        } else {
            Level::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMeta {
    pub title: String,
    pub level: Level,
    pub duration_weeks: u32,
    pub teaching_style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub prompt: String,
    pub expected_outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: String,
    pub question: String,
    pub choices: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

/// A module draft: lesson plan, exercises and quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub meta: DraftMeta,
    pub objectives: Vec<String>,
    pub lessons: Vec<Lesson>,
    pub exercises: Vec<Exercise>,
    pub quiz: Vec<QuizItem>,
}

impl ModuleDraft {
    /// Strictly decode a validated draft value.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| {
            CopilotError::Generation(format!("Module draft does not match the schema: {}", e))
        })
    }

    /// Count rules the model was asked to follow that the draft breaks.
    /// Not enforced; callers decide whether to surface them.
    pub fn count_warnings(&self) -> Vec<String> {
        let checks = [
            ("objectives", self.objectives.len(), 3, 6),
            ("lessons", self.lessons.len(), 4, 10),
            ("exercises", self.exercises.len(), 3, 6),
            ("quiz", self.quiz.len(), 5, 8),
        ];

        checks
            .iter()
            .filter(|(_, n, min, max)| n < min || n > max)
            .map(|(name, n, min, max)| format!("{} has {} items (expected {}-{})", name, n, min, max))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_level() {
        assert_eq!(Level::normalize("ADV"), Level::Advanced);
        assert_eq!(Level::normalize("advanced-track"), Level::Advanced);
        assert_eq!(Level::normalize(""), Level::Beginner);
        assert_eq!(Level::normalize("xyz"), Level::Beginner);
        assert_eq!(Level::normalize("  Intermediate "), Level::Intermediate);
        assert_eq!(Level::normalize("beginner"), Level::Beginner);
    }

    #[test]
    fn test_typed_view_and_warnings() {
        let value = json!({
            "meta": {"title": "Rust", "level": "Advanced", "durationWeeks": 2, "teachingStyle": "Labs"},
            "objectives": ["a", "b", "c"],
            "lessons": [{"id": "l1", "title": "Ownership", "summary": "s", "content": "c"}],
            "exercises": [{"id": "e1", "prompt": "p", "expectedOutcome": "o"}],
            "quiz": [{"id": "q1", "question": "q", "choices": ["x", "y"], "answer": "x", "explanation": "e"}]
        });

        let draft = ModuleDraft::from_value(&value).unwrap();
        assert_eq!(draft.meta.level, Level::Advanced);
        assert!(draft.lessons[0].resources.is_none());

        let warnings = draft.count_warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].starts_with("lessons has 1 items"));
    }
}
