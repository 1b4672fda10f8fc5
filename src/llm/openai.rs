//! OpenAI chat completions backend.

use super::{ContentModel, GenerationRequest, Part};
use crate::error::{CopilotError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Model backend using OpenAI chat completions.
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
}

impl OpenAiModel {
    pub fn new(timeout: Duration) -> Result<Self> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => {}
            _ => {
                return Err(CopilotError::Config(
                    "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'"
                        .to_string(),
                ))
            }
        }

        Ok(Self {
            client: create_client_with_timeout(timeout)?,
        })
    }

    /// Flatten text parts into one user message. Binary parts are unsupported.
    fn user_content(parts: &[Part]) -> Result<String> {
        let mut texts = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Part::Text(text) => texts.push(text.as_str()),
                Part::Blob { mime_type, .. } => {
                    return Err(CopilotError::InvalidInput(format!(
                        "The openai provider cannot take {} attachments; use the gemini provider",
                        mime_type
                    )))
                }
            }
        }
        Ok(texts.join("\n\n"))
    }
}

#[async_trait]
impl ContentModel for OpenAiModel {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if request.web_search {
            debug!("Web search grounding is not available with the openai provider");
        }

        let user = Self::user_content(&request.parts)?;

        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();
        if !request.system_instruction.is_empty() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system_instruction.clone())
                    .build()
                    .map_err(|e| CopilotError::Model(e.to_string()))?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| CopilotError::Model(e.to_string()))?
                .into(),
        );

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model).messages(messages);
        if let Some(temperature) = request.temperature {
            args.temperature(temperature);
        }
        if let Some(top_p) = request.top_p {
            args.top_p(top_p);
        }
        if let Some(max) = request.max_output_tokens {
            args.max_completion_tokens(max);
        }
        let chat_request = args.build().map_err(|e| CopilotError::Model(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| CopilotError::Model(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }

    fn provider(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_content_joins_text() {
        let parts = vec![Part::text("first"), Part::text("second")];
        assert_eq!(OpenAiModel::user_content(&parts).unwrap(), "first\n\nsecond");
    }

    #[test]
    fn test_user_content_rejects_blobs() {
        let parts = vec![Part::text("meta"), Part::blob("application/pdf", vec![1, 2])];
        let err = OpenAiModel::user_content(&parts).unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
    }
}
