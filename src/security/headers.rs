//! Security and proxy response headers.
//!
//! # Responsibilities
//! - Add the configured security header set, plus HSTS when configured
//! - Reflect the client-facing scheme in `X-Forwarded-Proto` behind a trusted proxy
//!
//! # Design Decisions
//! - Header names and values are parsed per response so a bad entry only
//!   skips this stage
//! - Never trust `X-Forwarded-Proto` unless proxy headers are trusted

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::{ResponseStage, StageError};
use crate::config::{ProxyHeadersConfig, SecurityHeadersConfig};
use crate::http::context::RequestContext;

pub(crate) fn header_value(name: &str, value: &str) -> Result<HeaderValue, StageError> {
    HeaderValue::from_str(value).map_err(|source| StageError::InvalidHeaderValue {
        name: name.to_string(),
        source,
    })
}

pub struct SecurityHeaders {
    config: SecurityHeadersConfig,
}

impl SecurityHeaders {
    pub fn new(config: SecurityHeadersConfig) -> Self {
        Self { config }
    }
}

impl ResponseStage for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn apply(&self, _ctx: &RequestContext, headers: &mut HeaderMap) -> Result<(), StageError> {
        for (name, value) in &self.config.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| StageError::InvalidHeaderName(name.clone()))?;
            headers.insert(header, header_value(name, value)?);
        }

        if let Some(hsts) = &self.config.strict_transport_security {
            headers.insert(
                axum::http::header::STRICT_TRANSPORT_SECURITY,
                header_value("Strict-Transport-Security", hsts)?,
            );
        }
        Ok(())
    }
}

pub struct ProxyHeaders {
    config: ProxyHeadersConfig,
}

impl ProxyHeaders {
    pub fn new(config: ProxyHeadersConfig) -> Self {
        Self { config }
    }
}

impl ResponseStage for ProxyHeaders {
    fn name(&self) -> &'static str {
        "proxy_headers"
    }

    fn apply(&self, ctx: &RequestContext, headers: &mut HeaderMap) -> Result<(), StageError> {
        if !self.config.trust_headers {
            return Ok(());
        }

        let scheme = ctx
            .forwarded_proto
            .as_deref()
            .and_then(|raw| raw.split(',').next())
            .map(|first| first.trim().to_ascii_lowercase())
            .filter(|first| !first.is_empty())
            .unwrap_or_else(|| self.config.default_scheme.clone());

        headers.insert("x-forwarded-proto", header_value("X-Forwarded-Proto", &scheme)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{profiles, PathsConfig};
    use axum::body::Body;
    use axum::http::Request;

    fn ctx(forwarded: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri("/");
        if let Some(proto) = forwarded {
            builder = builder.header("X-Forwarded-Proto", proto);
        }
        RequestContext::from_request(&builder.body(Body::empty()).unwrap(), &PathsConfig::default())
    }

    #[test]
    fn test_security_headers_development() {
        let stage = SecurityHeaders::new(profiles::development().security_headers);
        let mut headers = HeaderMap::new();
        stage.apply(&ctx(None), &mut headers).unwrap();

        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
        assert!(headers.contains_key("referrer-policy"));
        assert!(!headers.contains_key("strict-transport-security"));
    }

    #[test]
    fn test_security_headers_production_hsts() {
        let stage = SecurityHeaders::new(profiles::production().security_headers);
        let mut headers = HeaderMap::new();
        stage.apply(&ctx(None), &mut headers).unwrap();
        assert_eq!(
            headers["strict-transport-security"],
            "max-age=31536000; includeSubDomains"
        );
        assert_eq!(headers["x-frame-options"], "DENY");
    }

    #[test]
    fn test_invalid_header_value_fails_stage() {
        let mut config = SecurityHeadersConfig::default();
        config.headers.insert("X-Broken".into(), "bad\nvalue".into());
        let stage = SecurityHeaders::new(config);
        let mut headers = HeaderMap::new();
        assert!(matches!(
            stage.apply(&ctx(None), &mut headers),
            Err(StageError::InvalidHeaderValue { .. })
        ));
    }

    #[test]
    fn test_proxy_headers_untrusted_writes_nothing() {
        let stage = ProxyHeaders::new(ProxyHeadersConfig::default());
        let mut headers = HeaderMap::new();
        stage.apply(&ctx(Some("https")), &mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_proxy_headers_first_value_lowercased() {
        let stage = ProxyHeaders::new(ProxyHeadersConfig {
            trust_headers: true,
            default_scheme: "http".into(),
        });
        let mut headers = HeaderMap::new();
        stage.apply(&ctx(Some("HTTPS, http")), &mut headers).unwrap();
        assert_eq!(headers["x-forwarded-proto"], "https");
    }

    #[test]
    fn test_proxy_headers_default_scheme() {
        let stage = ProxyHeaders::new(ProxyHeadersConfig {
            trust_headers: true,
            default_scheme: "https".into(),
        });
        let mut headers = HeaderMap::new();
        stage.apply(&ctx(None), &mut headers).unwrap();
        assert_eq!(headers["x-forwarded-proto"], "https");
    }
}
