//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::{ModelProvider, Settings};
use crate::error::{CopilotError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Module generation and pipeline runs need a model API key.
    Generate,
    /// Dumping reads the database only.
    Dump,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Generate => check_api_key(settings.model.provider),
        Operation::Dump => Ok(()),
    }
}

/// Environment variable holding the API key for a provider.
pub fn api_key_var(provider: ModelProvider) -> &'static str {
    match provider {
        ModelProvider::Gemini => "GEMINI_API_KEY",
        ModelProvider::OpenAi => "OPENAI_API_KEY",
    }
}

/// Check that the provider's API key is configured.
pub fn check_api_key(provider: ModelProvider) -> Result<()> {
    let var = api_key_var(provider);
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CopilotError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(CopilotError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dump_no_requirements() {
        assert!(check(Operation::Dump, &Settings::default()).is_ok());
    }

    #[test]
    fn test_api_key_vars() {
        assert_eq!(api_key_var(ModelProvider::Gemini), "GEMINI_API_KEY");
        assert_eq!(api_key_var(ModelProvider::OpenAi), "OPENAI_API_KEY");
    }
}
