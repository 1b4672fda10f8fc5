//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, Result};
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(config_path)?;
            Output::success(&format!("Set {} = {} in {}", key, value, config_path.display()));
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Return a copy of `settings` with the dotted `key` set to `value`.
///
/// The value is parsed to match the type already stored under the key, and
/// the result must still deserialize as [`Settings`].
pub fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut root = toml::Value::try_from(settings)
        .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| anyhow!("Key must look like section.field (e.g. model.provider)"))?;

    let existing = root
        .get(section)
        .and_then(toml::Value::as_table)
        .ok_or_else(|| anyhow!("Unknown config section: {}", section))?
        .get(field)
        .cloned();

    let parsed = match existing.as_ref() {
        Some(toml::Value::Integer(_)) => toml::Value::Integer(
            value
                .parse()
                .map_err(|_| anyhow!("{} expects an integer", key))?,
        ),
        Some(toml::Value::Float(_)) => toml::Value::Float(
            value
                .parse()
                .map_err(|_| anyhow!("{} expects a number", key))?,
        ),
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(
            value
                .parse()
                .map_err(|_| anyhow!("{} expects true or false", key))?,
        ),
        Some(toml::Value::Array(_)) => toml::Value::Array(
            value
                .split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .collect(),
        ),
        Some(toml::Value::Table(_)) => {
            return Err(anyhow!("{} is a table; set one of its entries instead", key))
        }
        Some(_) => toml::Value::String(value.to_string()),
        // Unset optional field: infer the type, falling back to a string.
        None => {
            let inferred = infer_value(value);
            let mut attempt = root.clone();
            if let Some(t) = attempt.get_mut(section).and_then(toml::Value::as_table_mut) {
                t.insert(field.to_string(), inferred);
            }
            if let Ok(settings) = attempt.try_into::<Settings>() {
                return Ok(settings);
            }
            toml::Value::String(value.to_string())
        }
    };
    if let Some(table) = root.get_mut(section).and_then(toml::Value::as_table_mut) {
        table.insert(field.to_string(), parsed);
    }

    root.try_into::<Settings>()
        .map_err(|e: toml::de::Error| anyhow!("Invalid value for {}: {}", key, e))
}

fn infer_value(value: &str) -> toml::Value {
    if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else {
        toml::Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelProvider;

    #[test]
    fn test_set_typed_values() {
        let settings = Settings::default();

        let updated = set_value(&settings, "model.provider", "openai").unwrap();
        assert_eq!(updated.model.provider, ModelProvider::OpenAi);

        let updated = set_value(&updated, "pipeline.deep_iterations", "3").unwrap();
        assert_eq!(updated.pipeline.deep_iterations, 3);
        assert_eq!(updated.model.provider, ModelProvider::OpenAi);

        let updated = set_value(&updated, "database.url", "sqlite:///./course.db").unwrap();
        assert_eq!(updated.database.url.as_deref(), Some("sqlite:///./course.db"));
    }

    #[test]
    fn test_set_unset_optional_numbers() {
        let settings = Settings::default();

        let updated = set_value(&settings, "model.agent_temperature", "0.7").unwrap();
        assert_eq!(updated.model.agent_temperature, Some(0.7));

        let updated = set_value(&updated, "model.agent_max_output_tokens", "8192").unwrap();
        assert_eq!(updated.model.agent_max_output_tokens, Some(8192));
        assert_eq!(updated.model.agent_temperature, Some(0.7));

        assert!(set_value(&settings, "model.agent_temperature", "warm").is_err());
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let settings = Settings::default();
        assert!(set_value(&settings, "pipeline.deep_iterations", "many").is_err());
        assert!(set_value(&settings, "model.provider", "bard").is_err());
        assert!(set_value(&settings, "nosection.key", "1").is_err());
        assert!(set_value(&settings, "noseparator", "1").is_err());
    }
}
