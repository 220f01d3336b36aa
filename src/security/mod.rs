//! Security and response-header subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → RequestContext built (method, path, origin, endpoint class)
//!     → CORS preflight answered with 204, otherwise:
//!     → rate_limit.rs (fixed window per client and route class)
//!     → Routing and handler
//!
//! Outgoing response, stages in fixed order:
//!     → headers.rs (SecurityHeaders)
//!     → csp.rs (Content-Security-Policy)
//!     → cors.rs (allow-listed origins)
//!     → cache_control.rs (static vs API caching)
//!     → headers.rs (ProxyHeaders)
//! ```
//!
//! # Design Decisions
//! - Stages run on every response regardless of status
//! - A stage writes into a scratch map; its headers are merged only on success
//! - A failing stage is logged and skipped, later stages still run

pub mod cache_control;
pub mod cors;
pub mod csp;
pub mod headers;
pub mod limits;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::{AppConfig, PathsConfig};
use crate::http::context::RequestContext;
use crate::observability::metrics;

use self::cache_control::CacheControl;
use self::cors::Cors;
use self::csp::ContentSecurityPolicy;
use self::headers::{ProxyHeaders, SecurityHeaders};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{name}': {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: InvalidHeaderValue,
    },
}

/// One response-header stage.
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write this stage's headers into `headers`, a scratch map.
    fn apply(&self, ctx: &RequestContext, headers: &mut HeaderMap) -> Result<(), StageError>;
}

pub struct ResponsePipeline {
    stages: Vec<Box<dyn ResponseStage>>,
    paths: PathsConfig,
}

impl ResponsePipeline {
    /// The standard stage order.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_stages(
            config.paths.clone(),
            vec![
                Box::new(SecurityHeaders::new(config.security_headers.clone())),
                Box::new(ContentSecurityPolicy::new(config.csp.clone())),
                Box::new(Cors::new(config.cors.clone())),
                Box::new(CacheControl::new(config.cache.static_max_age_secs)),
                Box::new(ProxyHeaders::new(config.proxy.clone())),
            ],
        )
    }

    pub fn with_stages(paths: PathsConfig, stages: Vec<Box<dyn ResponseStage>>) -> Self {
        Self { stages, paths }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    pub fn apply(&self, ctx: &RequestContext, response_headers: &mut HeaderMap) {
        for stage in &self.stages {
            let mut scratch = HeaderMap::new();
            match stage.apply(ctx, &mut scratch) {
                Ok(()) => merge_headers(response_headers, scratch),
                Err(e) => {
                    tracing::warn!(stage = stage.name(), path = %ctx.path, error = %e, "Response stage skipped");
                }
            }
        }
    }
}

/// Later stages overwrite earlier values for the same header name.
fn merge_headers(target: &mut HeaderMap, scratch: HeaderMap) {
    let mut current = None;
    for (name, value) in scratch {
        match name {
            Some(name) => {
                target.insert(name.clone(), value);
                current = Some(name);
            }
            None => {
                if let Some(name) = &current {
                    target.append(name.clone(), value);
                }
            }
        }
    }
}

/// Outermost application middleware: builds the [`RequestContext`], answers
/// preflights, runs the handler, then applies every stage.
pub async fn response_pipeline(
    State(pipeline): State<Arc<ResponsePipeline>>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let ctx = RequestContext::from_request(&request, pipeline.paths());

    let mut response = if ctx.is_preflight() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        request.extensions_mut().insert(ctx.clone());
        next.run(request).await
    };

    pipeline.apply(&ctx, response.headers_mut());
    metrics::record_request(ctx.method.as_str(), response.status().as_u16(), ctx.class.as_str(), start);
    response
}
