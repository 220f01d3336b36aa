//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the web
//! application. All types derive Serde traits so a profile can be merged with
//! a TOML override file. `Default` values are the development profile.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deployment environment selecting a settings profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Resolve an environment name. Anything other than `production` is
    /// treated as development.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Root configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Profile this configuration was built from.
    pub environment: Environment,

    /// Listener configuration (bind host/port, request timeout).
    pub listener: ListenerConfig,

    /// URL layout: API prefix and static assets.
    pub paths: PathsConfig,

    /// Rate limiting per route class.
    pub rate_limit: RateLimitConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Cross-origin resource sharing.
    pub cors: CorsConfig,

    /// Fixed security response headers.
    pub security_headers: SecurityHeadersConfig,

    /// Content-Security-Policy directives.
    pub csp: CspConfig,

    pub session: SessionConfig,

    pub uploads: UploadConfig,

    /// Reverse proxy / load balancer trust.
    pub proxy: ProxyHeadersConfig,

    /// Cache and session store connection.
    pub redis: RedisConfig,

    /// S3-compatible object store connection.
    pub object_store: ObjectStoreConfig,

    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 30,
        }
    }
}

/// URL layout of the application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Prefix shared by every JSON API route (e.g., "/api").
    pub api_prefix: String,

    /// URL path static assets are served under.
    pub static_url_path: String,

    /// Directory on disk holding static assets.
    pub static_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            static_url_path: "/static".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

/// A fixed-window request threshold.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Requests allowed per window.
    pub requests: u64,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitRule {
    pub const fn new(requests: u64, window_secs: u64) -> Self {
        Self { requests, window_secs }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Threshold for HTML pages and anything unclassified.
    pub default: RateLimitRule,

    /// Threshold for routes under the API prefix.
    pub api: RateLimitRule,

    /// Threshold for the auth route group.
    pub auth: RateLimitRule,

    /// Exact paths never counted (health probes).
    pub exempt_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default: RateLimitRule::new(1000, 3600),
            api: RateLimitRule::new(500, 3600),
            auth: RateLimitRule::new(50, 300),
            exempt_paths: vec![
                "/health".to_string(),
                "/_health".to_string(),
                "/readiness".to_string(),
            ],
        }
    }
}

/// Cache backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis-backed cache, sessions and rate-limit counters.
    Redis,
    /// No backing store; every cache operation returns its sentinel.
    Null,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Default TTL for cached values in seconds.
    pub default_ttl_secs: u64,

    /// `max-age` for static assets served through the CDN, in seconds.
    pub static_max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            default_ttl_secs: 300,
            static_max_age_secs: 3600,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins granted cross-origin access (exact match).
    pub allowed_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["Content-Type", "Authorization", "X-Requested-With"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            allow_credentials: true,
        }
    }
}

/// Security header set applied to every response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// Header name to value.
    pub headers: BTreeMap<String, String>,

    /// `Strict-Transport-Security` value; production only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_transport_security: Option<String>,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        let headers = [
            ("X-Content-Type-Options", "nosniff"),
            ("X-Frame-Options", "SAMEORIGIN"),
            ("X-XSS-Protection", "1; mode=block"),
            ("Referrer-Policy", "strict-origin-when-cross-origin"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            headers,
            strict_transport_security: None,
        }
    }
}

/// Content-Security-Policy directives. Values are emitted verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CspConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_src: Option<String>,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            default_src: Some("'self'".to_string()),
            script_src: Some(
                "'self' 'unsafe-inline' https://cdn.jsdelivr.net https://cdnjs.cloudflare.com"
                    .to_string(),
            ),
            style_src: Some(
                "'self' 'unsafe-inline' https://cdn.jsdelivr.net https://fonts.googleapis.com"
                    .to_string(),
            ),
            font_src: Some("'self' https://fonts.gstatic.com".to_string()),
            img_src: Some("'self' data: https:".to_string()),
            connect_src: Some("'self'".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    pub ttl_secs: u64,

    /// Cookie carrying the session ID.
    pub cookie_name: String,

    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            cookie_name: "session_id".to_string(),
            cookie_secure: false,
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum upload body size in bytes.
    pub max_size_bytes: usize,

    /// Lowercase extensions without the dot.
    pub allowed_extensions: Vec<String>,

    /// Folder used when the caller does not name one.
    pub default_folder: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 16 * 1024 * 1024, // 16MB
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "webp", "pdf", "doc", "docx"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            default_folder: "uploads".to_string(),
        }
    }
}

/// Proxy header trust.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyHeadersConfig {
    /// Trust `X-Forwarded-*` headers from the load balancer.
    pub trust_headers: bool,

    /// Scheme reported when the load balancer did not send one.
    pub default_scheme: String,
}

impl Default for ProxyHeadersConfig {
    fn default() -> Self {
        Self {
            trust_headers: false,
            default_scheme: "http".to_string(),
        }
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Connection URL (e.g., "redis://127.0.0.1:6379/0").
    pub url: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-command response timeout in milliseconds.
    pub response_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            connect_timeout_ms: 2000,
            response_timeout_ms: 2000,
        }
    }
}

/// S3-compatible object store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Endpoint URL (e.g., "https://<account>.r2.cloudflarestorage.com").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    pub bucket: String,

    /// Public base URL objects are reachable under, if the bucket is public.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    pub connect_timeout_ms: u64,

    /// Timeout for a single operation attempt in milliseconds.
    pub operation_timeout_ms: u64,

    /// Default lifetime of presigned URLs in seconds.
    pub presign_expiry_secs: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            bucket: "marketplace-uploads".to_string(),
            public_url: None,
            connect_timeout_ms: 3000,
            operation_timeout_ms: 5000,
            presign_expiry_secs: 3600,
        }
    }
}

/// Admin route group configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token for admin routes. Empty denies every admin request.
    pub api_key: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
