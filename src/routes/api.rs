//! Versioned JSON API: service status and file storage.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::response_cache::{cache_response, ResponseCache};
use crate::http::state::AppState;
use crate::security::limits::UploadPolicy;
use crate::storage::{naming, ObjectSummary, UploadedObject};

const DEFAULT_LIST_LIMIT: i32 = 100;
const MAX_LIST_LIMIT: i32 = 1000;
/// S3 presigned URLs are valid for at most 7 days.
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 3600;

/// Routes mounted under `{api_prefix}/v1`.
pub fn router(state: &AppState) -> Router<AppState> {
    let response_cache = Arc::new(ResponseCache::new(state.cache.clone()));
    let body_limit = state.config.uploads.max_size_bytes;

    Router::new()
        .route(
            "/status",
            get(status).route_layer(middleware::from_fn_with_state(response_cache, cache_response)),
        )
        .route(
            "/uploads",
            post(upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(list_files).delete(delete_file))
        .route("/files/url", get(file_url))
}

#[derive(Serialize)]
struct StoreStatus {
    enabled: bool,
    available: bool,
}

#[derive(Serialize)]
struct StatusBody {
    service: &'static str,
    version: &'static str,
    environment: &'static str,
    cache: StoreStatus,
    object_store: StoreStatus,
}

async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.as_str(),
        cache: StoreStatus {
            enabled: state.cache.is_enabled(),
            available: state.cache.is_available(),
        },
        object_store: StoreStatus {
            enabled: state.objects.is_configured(),
            available: state.objects.is_available(),
        },
    })
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: String,
    folder: Option<String>,
    /// Store under `folder/name` instead of a generated key.
    name: Option<String>,
}

async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<UploadedObject>), AppError> {
    let policy = UploadPolicy::new(&state.config.uploads);
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge {
                limit: policy.max_size_bytes(),
            }
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;
    policy.check(&params.filename, body.len())?;
    if let Some(name) = params.name.as_deref() {
        policy.check(name, body.len())?;
    }
    let folder = match params.folder.as_deref() {
        Some(folder) => {
            let folder = naming::sanitize_folder(folder);
            if folder.is_empty() {
                return Err(AppError::BadRequest("folder must name a directory".into()));
            }
            folder
        }
        None => state.config.uploads.default_folder.clone(),
    };

    if !state.objects.is_available() {
        return Err(AppError::ServiceUnavailable("object store"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| *ct != "application/octet-stream");

    let uploaded = state
        .objects
        .upload(body, &params.filename, &folder, params.name.as_deref(), content_type)
        .await
        .ok_or(AppError::ServiceUnavailable("object store"))?;

    tracing::info!(key = %uploaded.key, size = uploaded.size, "File uploaded");
    Ok((StatusCode::CREATED, Json(uploaded)))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    prefix: String,
    limit: Option<i32>,
}

#[derive(Serialize)]
struct FileList {
    available: bool,
    files: Vec<ObjectSummary>,
}

async fn list_files(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<FileList> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Json(FileList {
        available: state.objects.is_available(),
        files: state.objects.list(&params.prefix, limit).await,
    })
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
    expires: Option<u64>,
}

fn require_key(key: &str) -> Result<&str, AppError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("key must not be empty".into()));
    }
    Ok(key)
}

async fn file_url(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key = require_key(&params.key)?;
    let expires = params
        .expires
        .map(|secs| Duration::from_secs(secs.clamp(1, MAX_PRESIGN_SECS)));

    let url = state
        .objects
        .presign(key, expires)
        .await
        .ok_or(AppError::ServiceUnavailable("object store"))?;

    Ok(Json(serde_json::json!({
        "key": key,
        "url": url,
        "public_url": state.objects.public_url(key),
    })))
}

async fn delete_file(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
) -> Result<impl IntoResponse, AppError> {
    let key = require_key(&params.key)?;
    if state.objects.delete(key).await {
        tracing::info!(key = %key, "File deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::ServiceUnavailable("object store"))
    }
}
