//! Cross-origin resource sharing.
//!
//! Only exact matches against the allow-list get CORS headers. Requests
//! without an `Origin`, or from any other origin, are left untouched.

use axum::http::{header, HeaderMap, HeaderValue};

use super::headers::header_value;
use super::{ResponseStage, StageError};
use crate::config::CorsConfig;
use crate::http::context::RequestContext;

pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.config.allowed_origins.iter().any(|o| o == origin)
    }
}

impl ResponseStage for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn apply(&self, ctx: &RequestContext, headers: &mut HeaderMap) -> Result<(), StageError> {
        let Some(origin) = ctx.origin.as_ref() else {
            return Ok(());
        };
        let Ok(origin_str) = origin.to_str() else {
            return Ok(());
        };
        if !self.is_allowed(origin_str) {
            return Ok(());
        }

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        if self.config.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            header_value("Access-Control-Allow-Methods", &self.config.allow_methods.join(", "))?,
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            header_value("Access-Control-Allow-Headers", &self.config.allow_headers.join(", "))?,
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use axum::body::Body;
    use axum::http::Request;

    fn ctx(origin: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri("/api/v1/status");
        if let Some(origin) = origin {
            builder = builder.header("Origin", origin);
        }
        RequestContext::from_request(&builder.body(Body::empty()).unwrap(), &PathsConfig::default())
    }

    #[test]
    fn test_allowed_origin_echoed_with_credentials() {
        let cors = Cors::new(CorsConfig::default());
        let mut headers = HeaderMap::new();
        cors.apply(&ctx(Some("http://localhost:3000")), &mut headers).unwrap();

        assert_eq!(headers["access-control-allow-origin"], "http://localhost:3000");
        assert_eq!(headers["access-control-allow-credentials"], "true");
        assert_eq!(
            headers["access-control-allow-methods"],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers["access-control-allow-headers"],
            "Content-Type, Authorization, X-Requested-With"
        );
        assert_eq!(headers["vary"], "Origin");
    }

    #[test]
    fn test_unknown_origin_gets_nothing() {
        let cors = Cors::new(CorsConfig::default());
        let mut headers = HeaderMap::new();
        cors.apply(&ctx(Some("https://evil.example")), &mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_prefix_of_allowed_origin_is_rejected() {
        let cors = Cors::new(CorsConfig::default());
        assert!(!cors.is_allowed("http://localhost:3000.evil.example"));
        assert!(!cors.is_allowed("http://localhost"));
    }

    #[test]
    fn test_no_origin_gets_nothing() {
        let cors = Cors::new(CorsConfig::default());
        let mut headers = HeaderMap::new();
        cors.apply(&ctx(None), &mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_credentials_flag_respected() {
        let cors = Cors::new(CorsConfig {
            allow_credentials: false,
            ..CorsConfig::default()
        });
        let mut headers = HeaderMap::new();
        cors.apply(&ctx(Some("http://localhost:5000")), &mut headers).unwrap();
        assert!(!headers.contains_key("access-control-allow-credentials"));
        assert!(headers.contains_key("access-control-allow-origin"));
    }
}
