use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::state::AppState;

#[derive(Serialize)]
pub struct CacheStatus {
    pub enabled: bool,
    pub available: bool,
}

#[derive(Serialize)]
pub struct ObjectStoreStatus {
    pub configured: bool,
    pub available: bool,
    pub bucket: String,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub environment: &'static str,
    pub uptime_secs: u64,
    pub cache: CacheStatus,
    pub object_store: ObjectStoreStatus,
}

#[derive(Serialize)]
pub struct StorageCheck {
    pub cache: bool,
    pub object_store: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let degraded = (state.cache.is_enabled() && !state.cache.is_available())
        || (state.objects.is_configured() && !state.objects.is_available());

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if degraded { "degraded" } else { "operational" },
        environment: state.config.environment.as_str(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        cache: CacheStatus {
            enabled: state.cache.is_enabled(),
            available: state.cache.is_available(),
        },
        object_store: ObjectStoreStatus {
            configured: state.objects.is_configured(),
            available: state.objects.is_available(),
            bucket: state.objects.bucket().to_string(),
        },
    })
}

/// Run both health checks. Unavailable handles get one reconnect attempt.
pub async fn check_storage(State(state): State<AppState>) -> Json<StorageCheck> {
    let (cache, object_store) = tokio::join!(state.cache.health_check(), state.objects.health_check());
    tracing::info!(cache, object_store, "Storage check requested");
    Json(StorageCheck { cache, object_store })
}
