pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::state::AppState;

/// Routes mounted under `/admin`, all behind the bearer token.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/storage/check", post(check_storage))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
