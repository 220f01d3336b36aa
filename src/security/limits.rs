//! Upload limits.
//!
//! # Responsibilities
//! - Enforce maximum upload size
//! - Enforce the allowed file extension list
//!
//! # Design Decisions
//! - Size is also capped at the body-extraction layer, so oversized bodies
//!   are rejected before they are buffered
//! - Return 413 Payload Too Large or 415 Unsupported Media Type

use crate::config::UploadConfig;
use crate::http::error::AppError;
use crate::storage::naming::extension_of;

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_size_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_size_bytes: config.max_size_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn check(&self, filename: &str, size: usize) -> Result<(), AppError> {
        if filename.trim().is_empty() {
            return Err(AppError::BadRequest("filename must not be empty".into()));
        }
        if size == 0 {
            return Err(AppError::BadRequest("upload body is empty".into()));
        }
        if size > self.max_size_bytes {
            return Err(AppError::PayloadTooLarge {
                limit: self.max_size_bytes,
            });
        }

        let extension = extension_of(filename).unwrap_or_default();
        if !self.allowed_extensions.iter().any(|e| *e == extension) {
            return Err(AppError::UnsupportedFileType(extension));
        }
        Ok(())
    }
}
