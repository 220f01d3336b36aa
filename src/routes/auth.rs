//! Server-side sessions in the cache store.
//!
//! Session IDs are UUID v4 and are returned both in the body and as a cookie.
//! Identity checks are out of scope; the payload is stored as given.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::http::error::AppError;
use crate::http::state::AppState;

/// Routes mounted under `/auth`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/session/{id}", get(get_session).delete(delete_session))
        .route("/session/{id}/touch", post(touch_session))
}

fn session_cookie(config: &SessionConfig, session_id: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        config.cookie_name, session_id, config.ttl_secs
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Missing versus unreachable store.
fn session_error(state: &AppState) -> AppError {
    if state.cache.is_available() {
        AppError::NotFound
    } else {
        AppError::ServiceUnavailable("session store")
    }
}

fn parse_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| AppError::BadRequest("invalid session id".into()))
}

async fn create_session(
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> Result<Response, AppError> {
    let session_id = Uuid::new_v4().to_string();
    let data = json!({
        "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "data": payload.map(|Json(v)| v).unwrap_or(Value::Null),
    });

    if !state.cache.set_session(&session_id, &data).await {
        return Err(AppError::ServiceUnavailable("session store"));
    }

    let cookie = session_cookie(&state.config.session, &session_id);
    let mut response = (
        StatusCode::CREATED,
        Json(json!({
            "session_id": session_id,
            "expires_in": state.cache.session_ttl_secs(),
        })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    tracing::debug!(session_id = %session_id, "Session created");
    Ok(response)
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id)?;
    state
        .cache
        .get_session(&id)
        .await
        .map(Json)
        .ok_or_else(|| session_error(&state))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.cache.delete_session(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_error(&state))
    }
}

async fn touch_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.cache.touch_session(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_error(&state))
    }
}
