//! Cache policy by endpoint class.
//!
//! Static assets are cacheable by browsers and the CDN for the configured
//! max-age. API responses are never cached. HTML pages are left alone.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{Duration, Utc};

use super::headers::header_value;
use super::{ResponseStage, StageError};
use crate::http::context::{EndpointClass, RequestContext};

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub const API_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// Upper bound for the `Expires` offset (100 years).
const MAX_EXPIRES_SECS: i64 = 100 * 365 * 86_400;

pub struct CacheControl {
    static_max_age_secs: u64,
}

impl CacheControl {
    pub fn new(static_max_age_secs: u64) -> Self {
        Self { static_max_age_secs }
    }

    fn expires(&self) -> String {
        let max_age = i64::try_from(self.static_max_age_secs)
            .unwrap_or(MAX_EXPIRES_SECS)
            .min(MAX_EXPIRES_SECS);
        (Utc::now() + Duration::seconds(max_age))
            .format(HTTP_DATE_FORMAT)
            .to_string()
    }
}

impl ResponseStage for CacheControl {
    fn name(&self) -> &'static str {
        "cache_control"
    }

    fn apply(&self, ctx: &RequestContext, headers: &mut HeaderMap) -> Result<(), StageError> {
        match ctx.class {
            EndpointClass::Static => {
                let value = format!("public, max-age={}", self.static_max_age_secs);
                headers.insert(header::CACHE_CONTROL, header_value("Cache-Control", &value)?);
                headers.insert(header::EXPIRES, header_value("Expires", &self.expires())?);
            }
            EndpointClass::Api => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(API_CACHE_CONTROL));
            }
            EndpointClass::Html => {}
        }
        Ok(())
    }
}
