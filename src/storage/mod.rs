//! External storage clients.
//!
//! # Data Flow
//! ```text
//! AppConfig
//!     → cache.rs (Redis: cache values, sessions, rate-limit counters)
//!     → object_store.rs (S3-compatible: uploads, downloads, listings, presigned URLs)
//!     → handles shared via Arc in AppState
//!
//! Every operation:
//!     handle unavailable?  → sentinel (None / false / empty)
//!     SDK call fails?      → log + sentinel
//!     otherwise            → value
//! ```
//!
//! # Design Decisions
//! - Initialization never fails; an unreachable backend yields an unavailable handle
//! - No retries or background reconnects; only an explicit health check reconnects
//! - A failed health check never takes an available handle out of service
//! - Keys are always built through [`KeyNamespace`] so namespaces cannot collide

pub mod cache;
pub mod naming;
pub mod object_store;

use thiserror::Error;

use crate::observability::metrics;

pub use cache::{CacheSettings, CacheStore, WindowCount};
pub use object_store::{ObjectStore, ObjectSummary, UploadedObject};

/// Errors raised inside a storage client. They never cross the client
/// boundary except through [`CacheStore::ping`], which the health endpoints use.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend disabled")]
    Disabled,

    #[error("storage backend unavailable")]
    Unavailable,

    #[error("storage backend not configured: {0}")]
    NotConfigured(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),
}

/// Key namespaces in the cache store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyNamespace {
    Session,
    Cache,
    RateLimit,
}

impl KeyNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyNamespace::Session => "session:",
            KeyNamespace::Cache => "cache:",
            KeyNamespace::RateLimit => "rate_limit:",
        }
    }

    /// Full store key for `key` in this namespace.
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix(), key)
    }
}

/// Convert an operation result into its sentinel form, logging the failure.
pub(crate) fn fail_soft<T>(store: &'static str, op: &'static str, result: Result<T, StorageError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(store, op, error = %e, "Storage operation failed; returning fallback");
            metrics::record_storage_fallback(store, op);
            None
        }
    }
}
