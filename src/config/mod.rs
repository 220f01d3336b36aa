//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment name ("development" | "production")
//!     → profiles.rs (complete settings profile)
//!     → loader.rs (TOML overlay, environment variable overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - Unknown environment names fall back to development
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod profiles;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    AdminConfig, AppConfig, CacheBackend, CacheConfig, CorsConfig, CspConfig, Environment,
    ListenerConfig, ObjectStoreConfig, ObservabilityConfig, PathsConfig, ProxyHeadersConfig,
    RateLimitConfig, RateLimitRule, RedisConfig, SecurityHeadersConfig, SessionConfig,
    UploadConfig,
};
