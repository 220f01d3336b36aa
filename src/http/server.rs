//! Application router and HTTP server.
//!
//! # Responsibilities
//! - Mount route groups, health probes and static files
//! - Install the middleware stack in a fixed order
//! - Serve on a listener until the shutdown future resolves
//!
//! # Middleware Order (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → Trace → ResponsePipeline
//!     → Timeout → RenderErrors → RateLimit → CatchPanic → Router
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer};

use super::error::{not_found, panic_response, render_errors};
use super::health::{health, readiness};
use super::request::{propagate_request_id_layer, set_request_id_layer};
use super::state::AppState;
use crate::config::AppConfig;
use crate::observability::tracing::http_trace_layer;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::security::{response_pipeline, ResponsePipeline};
use crate::storage::{CacheStore, ObjectStore};
use crate::{admin, routes};

/// The assembled application.
pub struct App {
    router: Router,
    state: AppState,
}

impl App {
    /// Build the router. No network I/O happens here.
    pub fn new(config: Arc<AppConfig>, cache: Arc<CacheStore>, objects: Arc<ObjectStore>) -> Self {
        Self::with_routes(config, cache, objects, Router::new())
    }

    /// Like [`App::new`], with `extra` merged in behind the full middleware stack.
    pub fn with_routes(
        config: Arc<AppConfig>,
        cache: Arc<CacheStore>,
        objects: Arc<ObjectStore>,
        extra: Router<AppState>,
    ) -> Self {
        let state = AppState::new(config, cache, objects);
        let router = Self::build_router(state.clone(), extra);
        Self { router, state }
    }

    #[allow(deprecated)]
    fn build_router(state: AppState, extra: Router<AppState>) -> Router {
        let config = state.config.clone();
        let paths = &config.paths;

        let pipeline = Arc::new(ResponsePipeline::from_config(&config));
        let limiter = Arc::new(RateLimiter::new(&config, state.cache.clone()));

        Router::new()
            .route("/", get(routes::home::index))
            .route("/health", get(health))
            .route("/_health", get(health))
            .route("/readiness", get(readiness))
            .nest(&format!("{}/v1", paths.api_prefix), routes::api::router(&state))
            .nest("/auth", routes::auth::router())
            .nest("/admin", admin::router(state.clone()))
            .nest_service(&paths.static_url_path, ServeDir::new(&paths.static_dir))
            .merge(extra)
            .fallback(not_found)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(middleware::from_fn_with_state(Arc::new(paths.clone()), render_errors))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(middleware::from_fn_with_state(pipeline, response_pipeline))
            .layer(http_trace_layer())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// A clone of the router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = self.state.config.environment.as_str(),
            cache = self.state.cache.is_available(),
            object_store = self.state.objects.is_available(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
