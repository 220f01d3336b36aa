//! Named environment profiles.
//!
//! Each profile is a complete [`AppConfig`]; nothing is read from the
//! environment here.

use crate::config::schema::{
    AppConfig, Environment, ListenerConfig, ObservabilityConfig, ProxyHeadersConfig,
    RateLimitConfig, RateLimitRule, SessionConfig,
};

/// Build the profile for an environment name, falling back to development.
pub fn for_name(name: &str) -> AppConfig {
    match Environment::from_name(name) {
        Environment::Production => production(),
        Environment::Development => development(),
    }
}

pub fn development() -> AppConfig {
    AppConfig::default()
}

pub fn production() -> AppConfig {
    let mut config = AppConfig {
        environment: Environment::Production,
        listener: ListenerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        rate_limit: RateLimitConfig {
            default: RateLimitRule::new(200, 3600),
            api: RateLimitRule::new(100, 60),
            auth: RateLimitRule::new(10, 300),
            ..RateLimitConfig::default()
        },
        session: SessionConfig {
            ttl_secs: 7 * 86_400,
            cookie_secure: true,
            ..SessionConfig::default()
        },
        proxy: ProxyHeadersConfig {
            trust_headers: true,
            default_scheme: "https".to_string(),
        },
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: true,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        },
        ..AppConfig::default()
    };

    config.cache.static_max_age_secs = 31_536_000;
    config.cors.allowed_origins = vec![
        "https://marketplace.example.com".to_string(),
        "https://www.marketplace.example.com".to_string(),
    ];
    config.security_headers.strict_transport_security =
        Some("max-age=31536000; includeSubDomains".to_string());
    config
        .security_headers
        .headers
        .insert("X-Frame-Options".to_string(), "DENY".to_string());
    config.csp.connect_src = Some("'self' https://marketplace.example.com".to_string());
    config.redis.connect_timeout_ms = 3000;
    config.redis.response_timeout_ms = 3000;

    config
}
