use std::path::Path;
use std::time::Duration;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub const ENV_MAX_CONCURRENT_WORKERS: &str = "AI_BULK_MAX_CONCURRENT_WORKERS";
pub const ENV_RATE_LIMIT_DELAY_SECONDS: &str = "AI_BULK_RATE_LIMIT_DELAY_SECONDS";

/// Loads a JSON or YAML config file (chosen by extension) and applies
/// environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let mut config = if is_yaml {
        load_config_from_yaml(&content)?
    } else {
        load_config_from_str(&content)?
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;
    load_config_from_value(json_value)
}

pub fn load_config_from_yaml(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_yaml::from_str(content)?;
    load_config_from_value(json_value)
}

/// Process-wide configuration when no file is given: defaults plus environment.
pub fn config_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Applies overrides using an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_MAX_CONCURRENT_WORKERS) {
        let workers = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|w| *w >= 1)
            .ok_or_else(|| ConfigError::InvalidEnv {
                name: ENV_MAX_CONCURRENT_WORKERS.to_string(),
                value: raw.clone(),
            })?;
        config.orchestrator.max_concurrent_workers = workers;
    }

    if let Some(raw) = lookup(ENV_RATE_LIMIT_DELAY_SECONDS) {
        let delay = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| Duration::try_from_secs_f64(*d).is_ok())
            .ok_or_else(|| ConfigError::InvalidEnv {
                name: ENV_RATE_LIMIT_DELAY_SECONDS.to_string(),
                value: raw.clone(),
            })?;
        config.orchestrator.rate_limit_delay_secs = delay;
    }

    Ok(())
}

fn load_config_from_value(json_value: serde_json::Value) -> Result<Config, ConfigError> {
    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.orchestrator.max_concurrent_workers == 0 {
        return Err(ConfigError::Validation {
            message: "max_concurrent_workers must be at least 1".to_string(),
        });
    }

    let delay = config.orchestrator.rate_limit_delay_secs;
    if Duration::try_from_secs_f64(delay).is_err() {
        return Err(ConfigError::Validation {
            message: format!("rate_limit_delay_secs out of range, got {}", delay),
        });
    }

    Ok(())
}
