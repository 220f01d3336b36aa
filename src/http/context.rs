//! Per-request middleware context.
//!
//! Built once before routing, stored in the request extensions and handed to
//! every response stage. Dropped with the request.

use axum::http::{header, HeaderValue, Method, Request};

use crate::config::PathsConfig;

/// Endpoint classification driving cache and error formatting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Under the API prefix; JSON responses.
    Api,
    /// Under the static URL path.
    Static,
    /// Everything else; HTML responses.
    Html,
}

impl EndpointClass {
    pub fn classify(path: &str, paths: &PathsConfig) -> Self {
        if has_prefix(path, &paths.api_prefix) {
            EndpointClass::Api
        } else if has_prefix(path, &paths.static_url_path) {
            EndpointClass::Static
        } else {
            EndpointClass::Html
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Api => "api",
            EndpointClass::Static => "static",
            EndpointClass::Html => "html",
        }
    }
}

/// `path` equals `prefix` or continues with a `/` segment after it.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub origin: Option<HeaderValue>,
    /// Raw `X-Forwarded-Proto` from the load balancer, if any.
    pub forwarded_proto: Option<String>,
    pub class: EndpointClass,
    preflight: bool,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>, paths: &PathsConfig) -> Self {
        let headers = request.headers();
        let path = request.uri().path().to_string();

        Self {
            method: request.method().clone(),
            class: EndpointClass::classify(&path, paths),
            origin: headers.get(header::ORIGIN).cloned(),
            forwarded_proto: headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            preflight: request.method() == Method::OPTIONS
                && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD),
            path,
        }
    }

    /// CORS preflight: `OPTIONS` carrying `Access-Control-Request-Method`.
    pub fn is_preflight(&self) -> bool {
        self.preflight
    }
}
