//! Single-pass module draft generation.
//!
//! One request goes to the model with a fixed schema instruction. The reply
//! is trusted or rejected as a whole: there is no retry.

mod draft;

pub use draft::{DraftMeta, Exercise, Lesson, Level, ModuleDraft, QuizItem};

use crate::config::Prompts;
use crate::error::{CopilotError, Result};
use crate::llm::{ContentModel, GenerationRequest, Part};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Teaching style used when the instructor leaves it blank.
pub const DEFAULT_TEACHING_STYLE: &str = "Explain → Example → Exercise";

/// MIME type assumed for an attached curriculum.
pub const DEFAULT_DOCUMENT_MIME: &str = "application/pdf";

/// Top-level keys every draft must carry.
pub const REQUIRED_KEYS: [&str; 5] = ["meta", "objectives", "lessons", "exercises", "quiz"];

const RAW_PREVIEW_CHARS: usize = 500;

/// Attached curriculum document.
#[derive(Debug, Clone)]
pub struct Document {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Inputs for one module draft.
#[derive(Debug, Clone)]
pub struct ModuleRequest {
    pub title: String,
    pub level: String,
    /// Signed so untyped callers (HTTP, CLI) can be rejected instead of wrapped.
    pub duration_weeks: i64,
    pub teaching_style: String,
    pub document: Option<Document>,
}

/// Generates module drafts with one model call.
pub struct ModuleGenerator {
    model: Arc<dyn ContentModel>,
    model_name: String,
    system_instruction: String,
}

impl ModuleGenerator {
    pub fn new(model: Arc<dyn ContentModel>, model_name: &str, prompts: &Prompts) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            system_instruction: prompts.module.system.clone(),
        }
    }

    /// Generate and validate a module draft.
    ///
    /// Input is validated before any model call. The returned value is a JSON
    /// object holding all of [`REQUIRED_KEYS`].
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn generate(&self, request: &ModuleRequest) -> Result<Value> {
        let meta = build_meta(request)?;

        let mut generation = GenerationRequest::new(&self.model_name, &self.system_instruction)
            .with_part(Part::text(meta.to_string()))
            .with_temperature(0.4)
            .with_top_p(0.9);

        if let Some(doc) = request.document.as_ref().filter(|d| !d.data.is_empty()) {
            debug!("Attaching {} document ({} bytes)", doc.mime_type, doc.data.len());
            generation = generation.with_part(Part::blob(doc.mime_type.clone(), doc.data.clone()));
        }

        info!("Requesting module draft from {}", self.model.provider());
        let text = self.model.generate(generation).await?;

        parse_draft(&text)
    }
}

/// Validate inputs and build the `{"meta": ...}` user payload.
fn build_meta(request: &ModuleRequest) -> Result<Value> {
    if request.title.trim().is_empty() {
        return Err(CopilotError::InvalidInput(
            "title is required (non-empty string)".to_string(),
        ));
    }
    if request.duration_weeks <= 0 {
        return Err(CopilotError::InvalidInput(
            "duration_weeks must be a positive integer".to_string(),
        ));
    }

    let level = Level::normalize(&request.level);
    let teaching_style = if request.teaching_style.trim().is_empty() {
        DEFAULT_TEACHING_STYLE
    } else {
        request.teaching_style.as_str()
    };

    Ok(json!({
        "meta": {
            "title": request.title,
            "level": level.as_str(),
            "durationWeeks": request.duration_weeks,
            "teachingStyle": teaching_style,
        }
    }))
}

/// Strip a Markdown code fence wrapped around a JSON object.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let unfenced = trimmed.trim_matches('`');
    match unfenced.find('{') {
        Some(start) => &unfenced[start..],
        None => unfenced,
    }
}

/// Parse raw model text into a draft, checking the required keys.
pub fn parse_draft(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        CopilotError::Generation(format!(
            "Model did not return valid JSON: {}\nRaw: {}",
            e,
            preview(text)
        ))
    })?;

    let Some(object) = value.as_object() else {
        return Err(CopilotError::Generation(format!(
            "Generated JSON is not an object\nRaw: {}",
            preview(text)
        )));
    };

    if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
        return Err(CopilotError::Generation(format!(
            "Generated JSON missing required key: {}",
            missing
        )));
    }

    Ok(value)
}

fn preview(text: &str) -> String {
    text.chars().take(RAW_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedModel;

    fn draft_json() -> String {
        json!({
            "meta": {"title": "Intro to SQL", "level": "Beginner", "durationWeeks": 3, "teachingStyle": DEFAULT_TEACHING_STYLE},
            "objectives": ["Write SELECT queries", "Filter rows", "Join tables"],
            "lessons": [],
            "exercises": [],
            "quiz": []
        })
        .to_string()
    }

    fn request(title: &str, weeks: i64) -> ModuleRequest {
        ModuleRequest {
            title: title.to_string(),
            level: "int".to_string(),
            duration_weeks: weeks,
            teaching_style: String::new(),
            document: None,
        }
    }

    fn generator(model: Arc<ScriptedModel>) -> ModuleGenerator {
        ModuleGenerator::new(model, "gemini-2.0-flash", &Prompts::default())
    }

    #[tokio::test]
    async fn test_rejects_zero_weeks_without_calling_model() {
        let model = Arc::new(ScriptedModel::new([draft_json()]));
        let err = generator(model.clone())
            .generate(&request("SQL", 0))
            .await
            .unwrap_err();

        assert!(matches!(err, CopilotError::InvalidInput(_)));
        assert!(err.to_string().contains("duration_weeks"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_title_without_calling_model() {
        let model = Arc::new(ScriptedModel::new([draft_json()]));
        let err = generator(model.clone())
            .generate(&request("   ", 4))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("title"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_request_carries_normalized_meta_and_document() {
        let model = Arc::new(ScriptedModel::new([draft_json()]));
        let mut req = request("Intro to SQL", 3);
        req.document = Some(Document {
            data: b"%PDF-1.7".to_vec(),
            mime_type: DEFAULT_DOCUMENT_MIME.to_string(),
        });

        let value = generator(model.clone()).generate(&req).await.unwrap();
        assert_eq!(value["meta"]["title"], "Intro to SQL");

        let sent = &model.requests()[0];
        assert_eq!(sent.model, "gemini-2.0-flash");
        assert_eq!(sent.temperature, Some(0.4));
        assert!(!sent.web_search);
        assert!(sent.system_instruction.contains("ONLY"));
        assert_eq!(sent.parts.len(), 2);

        let Part::Text(meta) = &sent.parts[0] else {
            panic!("first part should be text");
        };
        let meta: Value = serde_json::from_str(meta).unwrap();
        assert_eq!(meta["meta"]["level"], "Intermediate");
        assert_eq!(meta["meta"]["durationWeeks"], 3);
        assert_eq!(meta["meta"]["teachingStyle"], DEFAULT_TEACHING_STYLE);
        assert!(matches!(&sent.parts[1], Part::Blob { mime_type, .. } if mime_type == "application/pdf"));
    }

    #[test]
    fn test_fenced_json_parses_like_plain() {
        let plain = draft_json();
        let fenced = format!("```json\n{}\n```", plain);

        assert_eq!(parse_draft(&fenced).unwrap(), parse_draft(&plain).unwrap());
    }

    #[test]
    fn test_missing_quiz_is_named() {
        let mut value: Value = serde_json::from_str(&draft_json()).unwrap();
        value.as_object_mut().unwrap().remove("quiz");

        let err = parse_draft(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("quiz"));
    }

    #[test]
    fn test_invalid_json_includes_preview() {
        let raw = format!("Sure! Here is your module: {}", "x".repeat(800));
        let err = parse_draft(&raw).unwrap_err().to_string();

        assert!(err.contains("Model did not return valid JSON"));
        assert!(err.contains("Sure! Here is your module"));
        assert!(!err.contains(&"x".repeat(600)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(parse_draft("[1, 2, 3]").is_err());
    }
}
