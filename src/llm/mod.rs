//! Generative model backends.
//!
//! Every agent and the module generator talk to a model through the
//! [`ContentModel`] trait, so tests can swap in a scripted fake.

#[cfg(test)]
pub(crate) mod fake;
mod gemini;
mod openai;

pub use gemini::GeminiModel;
pub use openai::{create_client_with_timeout, OpenAiModel};

use crate::config::{ModelProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One piece of user content sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Binary attachment such as a curriculum PDF.
    Blob { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn blob(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Part::Blob {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub parts: Vec<Part>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Ground the answer with the provider's web search tool.
    pub web_search: bool,
}

impl GenerationRequest {
    pub fn new(model: &str, system_instruction: &str) -> Self {
        Self {
            model: model.to_string(),
            system_instruction: system_instruction.to_string(),
            parts: Vec::new(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            web_search: false,
        }
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }
}

/// Trait for text generation.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Send one request and return the concatenated response text.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// Provider name for logs and diagnostics.
    fn provider(&self) -> &'static str;
}

/// Build the configured model backend.
pub fn create_model(settings: &Settings) -> Result<Arc<dyn ContentModel>> {
    let timeout = Duration::from_secs(settings.model.timeout_seconds);

    let model: Arc<dyn ContentModel> = match settings.model.provider {
        ModelProvider::Gemini => {
            let mut model = GeminiModel::from_env(timeout)?;
            if let Some(base_url) = &settings.model.base_url {
                model = model.with_base_url(base_url);
            }
            Arc::new(model)
        }
        ModelProvider::OpenAi => Arc::new(OpenAiModel::new(timeout)?),
    };

    Ok(model)
}
