//! Load balancer probes.
//!
//! `/health` and `/_health` report the cache store. A disabled cache backend
//! is not a failure; only an enabled store that does not answer a ping makes
//! the instance unhealthy. `/readiness` only says the process is serving.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use super::state::AppState;
use crate::storage::{CacheStore, StorageError};

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub async fn cache_status(cache: &CacheStore) -> Result<(), StorageError> {
    if !cache.is_enabled() {
        return Ok(());
    }
    cache.ping().await
}

pub fn health_report(status: Result<(), StorageError>) -> Response {
    match status {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": timestamp(),
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                    "timestamp": timestamp(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    health_report(cache_status(&state.cache).await)
}

pub async fn readiness() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ready",
        "timestamp": timestamp(),
    }))
}
