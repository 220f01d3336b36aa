//! GET response caching in the cache store.
//!
//! Entries live under `cache:view:{path?query}` for the configured default
//! TTL. Only successful responses with a UTF-8 body of known size up to
//! [`MAX_CACHED_BODY`] are stored. Anything else, or an unavailable cache
//! store, means pass-through.

use std::sync::Arc;

use axum::body::{Body, HttpBody};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::storage::CacheStore;

/// Bodies larger than this are returned but not cached.
const MAX_CACHED_BODY: usize = 1024 * 1024;

pub const X_CACHE: &str = "x-cache";

#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, self.body).into_response();
        if let Some(ct) = self.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
            response.headers_mut().insert(header::CONTENT_TYPE, ct);
        }
        response.headers_mut().insert(X_CACHE, HeaderValue::from_static("HIT"));
        response
    }
}

pub struct ResponseCache {
    cache: Arc<CacheStore>,
}

impl ResponseCache {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self { cache }
    }

    fn key(request: &Request) -> String {
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| request.uri().path());
        format!("view:{target}")
    }
}

pub async fn cache_response(
    State(rc): State<Arc<ResponseCache>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET || !rc.cache.is_available() {
        return next.run(request).await;
    }

    let key = ResponseCache::key(&request);
    if let Some(hit) = rc.cache.get::<CachedResponse>(&key).await {
        tracing::debug!(key = %key, "Response cache hit");
        return hit.into_response();
    }

    let mut response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let cacheable = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= MAX_CACHED_BODY as u64);
    if !cacheable {
        tracing::debug!(key = %key, "Response size unbounded or over limit, not cached");
        response.headers_mut().insert(X_CACHE, HeaderValue::from_static("MISS"));
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => return AppError::Internal(format!("failed to buffer response: {e}")).into_response(),
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let entry = CachedResponse {
            status: parts.status.as_u16(),
            content_type: parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            body: text.to_string(),
        };
        rc.cache.set(&key, &entry, None).await;
    }

    parts.headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}
