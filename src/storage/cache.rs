//! Redis-backed cache, session and rate-limit store.
//!
//! # Responsibilities
//! - Cache JSON values under `cache:` with a TTL
//! - Store sessions under `session:` with the session TTL
//! - Count requests per fixed window under `rate_limit:`
//! - Report reachability for health endpoints
//!
//! Every public operation returns a sentinel (`None`, `false`) instead of an
//! error when the store is unavailable or the command fails.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;

use crate::config::{AppConfig, CacheBackend};
use crate::observability::metrics;
use crate::storage::{fail_soft, KeyNamespace, StorageError};

const STORE: &str = "cache";

/// Connection and TTL settings for [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Connect at all. `false` for the `null` backend.
    pub enabled: bool,
    pub url: String,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    /// TTL used by [`CacheStore::set`] when the caller passes none.
    pub default_ttl_secs: u64,
    pub session_ttl_secs: u64,
}

impl CacheSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.cache.backend == CacheBackend::Redis,
            url: config.redis.url.clone(),
            connect_timeout: Duration::from_millis(config.redis.connect_timeout_ms),
            response_timeout: Duration::from_millis(config.redis.response_timeout_ms),
            default_ttl_secs: config.cache.default_ttl_secs,
            session_ttl_secs: config.session.ttl_secs,
        }
    }

    fn disabled() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            connect_timeout: Duration::from_secs(1),
            response_timeout: Duration::from_secs(1),
            default_ttl_secs: 300,
            session_ttl_secs: 86_400,
        }
    }
}

/// Counter state after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    /// Seconds until the window's counter expires.
    pub resets_in_secs: u64,
}

/// Handle to the Redis store. Unavailable when the initial connection failed
/// or the backend is disabled.
pub struct CacheStore {
    settings: CacheSettings,
    connection: ArcSwapOption<ConnectionManager>,
}

impl CacheStore {
    /// Connect to the store. Never fails; on error the handle is unavailable
    /// and a warning is logged.
    pub async fn initialize(settings: CacheSettings) -> Self {
        let store = Self {
            settings,
            connection: ArcSwapOption::empty(),
        };

        if !store.settings.enabled {
            tracing::info!("Cache backend disabled; caching, sessions and rate limits are off");
            return store;
        }

        match store.connect().await {
            Ok(manager) => {
                store.connection.store(Some(Arc::new(manager)));
                tracing::info!("Cache store connected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cache store unavailable; continuing without it");
            }
        }
        store
    }

    /// A handle that never connects.
    pub fn disabled() -> Self {
        Self {
            settings: CacheSettings::disabled(),
            connection: ArcSwapOption::empty(),
        }
    }

    /// Whether the backend is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Whether the handle currently holds a connection.
    pub fn is_available(&self) -> bool {
        self.connection.load().is_some()
    }

    pub fn session_ttl_secs(&self) -> u64 {
        self.settings.session_ttl_secs
    }

    async fn connect(&self) -> Result<ConnectionManager, StorageError> {
        let client = redis::Client::open(self.settings.url.as_str())?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(self.settings.connect_timeout)
            .set_response_timeout(self.settings.response_timeout);

        let limit = self.settings.connect_timeout;
        let mut manager = timeout(limit, client.get_connection_manager_with_config(config))
            .await
            .map_err(|_| StorageError::Timeout(limit.as_millis() as u64))??;

        let _pong: String = redis::cmd("PING").query_async(&mut manager).await?;
        Ok(manager)
    }

    /// Current connection, or `None` (counted as a fallback) when unavailable.
    fn available(&self, op: &'static str) -> Option<ConnectionManager> {
        let connection = self.connection.load_full().map(|c| (*c).clone());
        if connection.is_none() {
            tracing::debug!(op, "Cache store unavailable");
            metrics::record_storage_fallback(STORE, op);
        }
        connection
    }

    // --- cache values ---

    /// JSON-decoded value under `cache:{key}`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let conn = self.available("get")?;
        let raw = fail_soft(STORE, "get", get_raw(conn, KeyNamespace::Cache.key(key)).await)??;
        fail_soft(STORE, "get", serde_json::from_str(&raw).map_err(StorageError::from))
    }

    /// Store `value` as JSON under `cache:{key}`. `ttl` defaults to the
    /// configured cache TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        let Some(conn) = self.available("set") else {
            return false;
        };
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => return fail_soft::<()>(STORE, "set", Err(e.into())).is_some(),
        };
        let ttl = ttl
            .map(|t| t.as_secs())
            .unwrap_or(self.settings.default_ttl_secs)
            .max(1);
        fail_soft(STORE, "set", set_raw(conn, KeyNamespace::Cache.key(key), payload, ttl).await)
            .is_some()
    }

    /// Remove `cache:{key}`. `true` only if a value was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(conn) = self.available("delete") else {
            return false;
        };
        fail_soft(STORE, "delete", delete_raw(conn, KeyNamespace::Cache.key(key)).await)
            .unwrap_or(false)
    }

    // --- sessions ---

    pub async fn set_session(&self, session_id: &str, data: &serde_json::Value) -> bool {
        let Some(conn) = self.available("set_session") else {
            return false;
        };
        let payload = data.to_string();
        let key = KeyNamespace::Session.key(session_id);
        let ttl = self.settings.session_ttl_secs.max(1);
        fail_soft(STORE, "set_session", set_raw(conn, key, payload, ttl).await).is_some()
    }

    pub async fn get_session(&self, session_id: &str) -> Option<serde_json::Value> {
        let conn = self.available("get_session")?;
        let key = KeyNamespace::Session.key(session_id);
        let raw = fail_soft(STORE, "get_session", get_raw(conn, key).await)??;
        fail_soft(STORE, "get_session", serde_json::from_str(&raw).map_err(StorageError::from))
    }

    pub async fn delete_session(&self, session_id: &str) -> bool {
        let Some(conn) = self.available("delete_session") else {
            return false;
        };
        let key = KeyNamespace::Session.key(session_id);
        fail_soft(STORE, "delete_session", delete_raw(conn, key).await).unwrap_or(false)
    }

    /// Reset the TTL of an existing session. `false` if it does not exist.
    pub async fn touch_session(&self, session_id: &str) -> bool {
        let Some(conn) = self.available("touch_session") else {
            return false;
        };
        let key = KeyNamespace::Session.key(session_id);
        let ttl = self.settings.session_ttl_secs.max(1);
        fail_soft(STORE, "touch_session", expire_raw(conn, key, ttl).await).unwrap_or(false)
    }

    // --- rate limiting ---

    /// Increment the fixed-window counter for `identifier`, returning the count
    /// within the current window and the time left in it. The window starts at
    /// the first hit; a counter found without an expiry is given one.
    pub async fn increment_rate_limit(&self, identifier: &str, window_secs: u64) -> Option<WindowCount> {
        let conn = self.available("increment_rate_limit")?;
        let key = KeyNamespace::RateLimit.key(identifier);
        fail_soft(STORE, "increment_rate_limit", incr_window(conn, key, window_secs.max(1)).await)
    }

    // --- health ---

    /// Check reachability. An unavailable handle makes one reconnect attempt
    /// and becomes available if it succeeds. A failing ping does not drop an
    /// existing connection.
    pub async fn ping(&self) -> Result<(), StorageError> {
        if !self.settings.enabled {
            return Err(StorageError::Disabled);
        }

        let Some(arc) = self.connection.load_full() else {
            let manager = self.connect().await?;
            self.connection.store(Some(Arc::new(manager)));
            tracing::info!("Cache store reconnected");
            return Ok(());
        };

        let mut conn = (*arc).clone();
        let limit = self.settings.response_timeout;
        let _pong: String = timeout(limit, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|_| StorageError::Timeout(limit.as_millis() as u64))??;
        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Cache store health check failed");
                false
            }
        }
    }
}

async fn get_raw(mut conn: ConnectionManager, key: String) -> Result<Option<String>, StorageError> {
    let value: Option<String> = conn.get(&key).await?;
    Ok(value)
}

async fn set_raw(
    mut conn: ConnectionManager,
    key: String,
    payload: String,
    ttl_secs: u64,
) -> Result<(), StorageError> {
    let _: () = conn.set_ex(&key, payload, ttl_secs).await?;
    Ok(())
}

async fn delete_raw(mut conn: ConnectionManager, key: String) -> Result<bool, StorageError> {
    let removed: i64 = conn.del(&key).await?;
    Ok(removed > 0)
}

async fn expire_raw(mut conn: ConnectionManager, key: String, ttl_secs: u64) -> Result<bool, StorageError> {
    let updated: bool = conn.expire(&key, ttl_secs as i64).await?;
    Ok(updated)
}

async fn incr_window(
    mut conn: ConnectionManager,
    key: String,
    window_secs: u64,
) -> Result<WindowCount, StorageError> {
    let (count, ttl): (u64, i64) = redis::pipe()
        .atomic()
        .incr(&key, 1u64)
        .ttl(&key)
        .query_async(&mut conn)
        .await?;

    // -1: the key has no expiry, either a new window or one whose EXPIRE never landed.
    let resets_in_secs = if ttl < 0 {
        let _: bool = conn.expire(&key, window_secs as i64).await?;
        window_secs
    } else {
        (ttl as u64).clamp(1, window_secs)
    };
    Ok(WindowCount { count, resets_in_secs })
}
