//! Request-level errors and uniform error rendering.
//!
//! Handlers return [`AppError`]; its `IntoResponse` only sets the status and
//! attaches an [`ErrorMarker`]. The [`render_errors`] middleware turns marked
//! responses (and bare 404/429/500s from the router or panics) into a JSON body
//! under the API prefix and a small HTML page everywhere else.

use std::any::Any;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::context::EndpointClass;
use crate::config::PathsConfig;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("The requested resource was not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("File type '{0}' is not allowed")]
    UnsupportedFileType(String),

    #[error("Too many requests, retry in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("The {0} is currently unavailable")]
    ServiceUnavailable(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => ErrorMarker::for_status(StatusCode::INTERNAL_SERVER_ERROR).message,
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }

        let mut response = status.into_response();
        if let AppError::RateLimited { retry_after } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after));
        }
        response.extensions_mut().insert(ErrorMarker {
            title: title_for(status),
            message: self.public_message(),
        });
        response
    }
}

/// Response extension asking [`render_errors`] to produce the body.
#[derive(Debug, Clone)]
pub struct ErrorMarker {
    pub title: &'static str,
    pub message: String,
}

impl ErrorMarker {
    pub fn for_status(status: StatusCode) -> Self {
        let message = match status {
            StatusCode::NOT_FOUND => "The requested resource was not found",
            StatusCode::TOO_MANY_REQUESTS => "Too many requests, please slow down",
            StatusCode::INTERNAL_SERVER_ERROR => "An unexpected error occurred",
            _ => "The request could not be completed",
        };
        Self {
            title: title_for(status),
            message: message.to_string(),
        }
    }
}

fn title_for(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Error")
}

fn is_bare_error(response: &Response) -> bool {
    matches!(
        response.status(),
        StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS | StatusCode::INTERNAL_SERVER_ERROR
    ) && !response.headers().contains_key(header::CONTENT_TYPE)
}

pub async fn render_errors(
    State(paths): State<Arc<PathsConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let class = EndpointClass::classify(request.uri().path(), &paths);
    let response = next.run(request).await;

    let marker = match response.extensions().get::<ErrorMarker>() {
        Some(marker) => marker.clone(),
        None if is_bare_error(&response) => ErrorMarker::for_status(response.status()),
        None => return response,
    };

    let status = response.status();
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);

    let body = if class == EndpointClass::Api {
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        serde_json::json!({
            "error": marker.title,
            "message": marker.message,
            "status": status.as_u16(),
        })
        .to_string()
    } else {
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        error_page(status, &marker)
    };

    Response::from_parts(parts, Body::from(body))
}

fn error_page(status: StatusCode, marker: &ErrorMarker) -> String {
    let title = escape_html(marker.title);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{code} {title}</title></head>\n\
         <body>\n<h1>{code} {title}</h1>\n<p>{message}</p>\n<p><a href=\"/\">Back to home</a></p>\n</body>\n</html>\n",
        code = status.as_u16(),
        message = escape_html(&marker.message),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Router fallback.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Handler for `CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
