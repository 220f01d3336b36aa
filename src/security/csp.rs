//! Content-Security-Policy stage.

use axum::http::{header, HeaderMap};

use super::headers::header_value;
use super::{ResponseStage, StageError};
use crate::config::CspConfig;
use crate::http::context::RequestContext;

pub struct ContentSecurityPolicy {
    config: CspConfig,
}

impl ContentSecurityPolicy {
    pub fn new(config: CspConfig) -> Self {
        Self { config }
    }

    /// All six directives in fixed order. Any missing directive is an error.
    pub fn policy(&self) -> Result<String, StageError> {
        let directives = [
            ("default-src", &self.config.default_src),
            ("script-src", &self.config.script_src),
            ("style-src", &self.config.style_src),
            ("font-src", &self.config.font_src),
            ("img-src", &self.config.img_src),
            ("connect-src", &self.config.connect_src),
        ];

        let mut parts = Vec::with_capacity(directives.len());
        for (name, value) in directives {
            let value = value.as_deref().ok_or(StageError::MissingSetting(name))?;
            parts.push(format!("{name} {value}"));
        }
        Ok(parts.join("; "))
    }
}

impl ResponseStage for ContentSecurityPolicy {
    fn name(&self) -> &'static str {
        "csp"
    }

    fn apply(&self, _ctx: &RequestContext, headers: &mut HeaderMap) -> Result<(), StageError> {
        let policy = self.policy()?;
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            header_value("Content-Security-Policy", &policy)?,
        );
        Ok(())
    }
}
