//! Configuration loading: profile selection, TOML overrides, environment
//! variable overrides.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::profiles;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Return the profile for an environment name. Unknown names fall back to
/// development.
pub fn load(environment: &str) -> AppConfig {
    profiles::for_name(environment)
}

/// Load a profile, overlay an optional TOML file and environment variables,
/// then validate.
///
/// `env` is a variable lookup; the binary passes `|k| std::env::var(k).ok()`.
pub fn load_config<F>(
    environment: &str,
    file: Option<&Path>,
    env: F,
) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = load(environment);

    if let Some(path) = file {
        let content = fs::read_to_string(path)?;
        config = merge_toml(&config, &content)?;
        tracing::debug!(path = %path.display(), "Applied configuration file");
    }

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Deep-merge a TOML document over an existing configuration. Keys absent from
/// the document keep their current values.
pub fn merge_toml(base: &AppConfig, overlay: &str) -> Result<AppConfig, ConfigError> {
    let mut merged = toml::Value::try_from(base)?;
    let overlay: toml::Value = toml::from_str(overlay)?;
    merge_values(&mut merged, overlay);
    Ok(merged.try_into()?)
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply the recognised environment variables to `config`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = env("HOST") {
        config.listener.host = host;
    }
    if let Some(port) = env("PORT") {
        config.listener.port = parse_env("PORT", &port)?;
    }
    if let Some(url) = env("REDIS_URL") {
        config.redis.url = url;
    }
    if let Some(endpoint) = env("R2_ENDPOINT_URL") {
        config.object_store.endpoint_url = Some(endpoint);
    }
    if let Some(key) = env("R2_ACCESS_KEY_ID") {
        config.object_store.access_key_id = Some(key);
    }
    if let Some(secret) = env("R2_SECRET_ACCESS_KEY") {
        config.object_store.secret_access_key = Some(secret);
    }
    if let Some(bucket) = env("R2_BUCKET_NAME") {
        config.object_store.bucket = bucket;
    }
    if let Some(public_url) = env("R2_PUBLIC_URL") {
        config.object_store.public_url = Some(public_url);
    }
    if let Some(trust) = env("TRUST_PROXY_HEADERS") {
        config.proxy.trust_headers = parse_bool("TRUST_PROXY_HEADERS", &trust)?;
    }
    if let Some(origins) = env("CORS_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(key) = env("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
    if let Some(level) = env("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}
