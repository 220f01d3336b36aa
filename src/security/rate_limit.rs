//! Fixed-window rate limiting backed by the cache store.
//!
//! Counters live under `rate_limit:{class}:{client}` and expire with their
//! window, so every instance behind the load balancer shares them. When the
//! cache store is unavailable requests are allowed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::{AppConfig, PathsConfig, RateLimitConfig, RateLimitRule};
use crate::http::context::has_prefix;
use crate::http::error::AppError;
use crate::observability::metrics;
use crate::storage::CacheStore;

/// Route class selecting the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Default,
    Api,
    Auth,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Default => "default",
            RouteClass::Api => "api",
            RouteClass::Auth => "auth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { count: u64, limit: u64 },
    Limited { retry_after: u64 },
    /// Counter unavailable; the request is let through.
    Unchecked,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    paths: PathsConfig,
    trust_proxy: bool,
    cache: Arc<CacheStore>,
}

impl RateLimiter {
    pub fn new(config: &AppConfig, cache: Arc<CacheStore>) -> Self {
        Self {
            config: config.rate_limit.clone(),
            paths: config.paths.clone(),
            trust_proxy: config.proxy.trust_headers,
            cache,
        }
    }

    /// `None` when the path is exempt.
    pub fn route_class(&self, path: &str) -> Option<RouteClass> {
        if self.config.exempt_paths.iter().any(|p| p == path)
            || has_prefix(path, &self.paths.static_url_path)
        {
            return None;
        }
        if has_prefix(path, "/auth") {
            Some(RouteClass::Auth)
        } else if has_prefix(path, &self.paths.api_prefix) {
            Some(RouteClass::Api)
        } else {
            Some(RouteClass::Default)
        }
    }

    fn rule(&self, class: RouteClass) -> RateLimitRule {
        match class {
            RouteClass::Default => self.config.default,
            RouteClass::Api => self.config.api,
            RouteClass::Auth => self.config.auth,
        }
    }

    pub async fn check(&self, class: RouteClass, client: &str) -> Decision {
        let rule = self.rule(class);
        let identifier = format!("{}:{}", class.as_str(), client);

        match self.cache.increment_rate_limit(&identifier, rule.window_secs).await {
            Some(window) if window.count > rule.requests => Decision::Limited {
                retry_after: window.resets_in_secs,
            },
            Some(window) => Decision::Allowed {
                count: window.count,
                limit: rule.requests,
            },
            None => Decision::Unchecked,
        }
    }

    pub fn client_identity(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        client_identity(headers, peer, self.trust_proxy)
    }
}

/// First `X-Forwarded-For` entry when proxy headers are trusted, otherwise
/// the socket peer, otherwise `unknown`.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(client) = forwarded {
            return client.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.config.enabled {
        return next.run(request).await;
    }
    let Some(class) = limiter.route_class(request.uri().path()) else {
        return next.run(request).await;
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = limiter.client_identity(request.headers(), peer);

    match limiter.check(class, &client).await {
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %client, class = class.as_str(), "Rate limit exceeded");
            metrics::record_rate_limited(class.as_str());
            AppError::RateLimited { retry_after }.into_response()
        }
        Decision::Allowed { .. } | Decision::Unchecked => next.run(request).await,
    }
}
