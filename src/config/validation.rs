//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, windows, sizes)
//! - Validate URLs (CORS origins, Redis)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing::Level;

use crate::config::schema::{AppConfig, CacheBackend, RateLimitRule};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::new("listener.port", "must be non-zero"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be non-zero"));
    }

    check_prefix(&mut errors, "paths.api_prefix", &config.paths.api_prefix);
    check_prefix(&mut errors, "paths.static_url_path", &config.paths.static_url_path);

    check_rule(&mut errors, "rate_limit.default", &config.rate_limit.default);
    check_rule(&mut errors, "rate_limit.api", &config.rate_limit.api);
    check_rule(&mut errors, "rate_limit.auth", &config.rate_limit.auth);

    if config.uploads.max_size_bytes == 0 {
        errors.push(ValidationError::new("uploads.max_size_bytes", "must be non-zero"));
    }

    if config.observability.log_level.parse::<Level>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    for origin in &config.cors.allowed_origins {
        match url::Url::parse(origin) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' has unsupported scheme '{}'", origin, parsed.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not a valid URL: {}", origin, e),
            )),
        }
    }

    if config.cache.backend == CacheBackend::Redis {
        if let Err(e) = url::Url::parse(&config.redis.url) {
            errors.push(ValidationError::new("redis.url", format!("invalid URL: {}", e)));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_prefix(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if !value.starts_with('/') || (value.len() > 1 && value.ends_with('/')) {
        errors.push(ValidationError::new(
            field,
            format!("'{}' must start with '/' and not end with '/'", value),
        ));
    }
}

fn check_rule(errors: &mut Vec<ValidationError>, field: &str, rule: &RateLimitRule) {
    if rule.requests == 0 || rule.window_secs == 0 {
        errors.push(ValidationError::new(field, "requests and window_secs must be non-zero"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profiles;

    #[test]
    fn test_profiles_are_valid() {
        assert!(validate_config(&profiles::development()).is_ok());
        assert!(validate_config(&profiles::production()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = profiles::development();
        config.listener.port = 0;
        config.rate_limit.api.window_secs = 0;
        config.observability.log_level = "loud".to_string();
        config.cors.allowed_origins.push("ftp://files.example.com".to_string());
        config.paths.api_prefix = "api/".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.port",
                "paths.api_prefix",
                "rate_limit.api",
                "observability.log_level",
                "cors.allowed_origins",
            ]
        );
    }

    #[test]
    fn test_redis_url_ignored_for_null_backend() {
        let mut config = profiles::development();
        config.redis.url = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.cache.backend = CacheBackend::Null;
        assert!(validate_config(&config).is_ok());
    }
}
