use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::AppError;
use crate::http::state::AppState;

/// `Authorization: Bearer <admin.api_key>`. An empty key denies everything.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config.admin.api_key.as_str();

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if !expected.is_empty() && token_matches(token, expected) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            AppError::Unauthorized.into_response()
        }
    }
}

fn token_matches(given: &str, expected: &str) -> bool {
    constant_time_eq::constant_time_eq(given.as_bytes(), expected.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secre", "secret"));
        assert!(!token_matches("secret!", "secret"));
        assert!(!token_matches("public", "secret"));
        assert!(!token_matches("", "secret"));
    }
}
