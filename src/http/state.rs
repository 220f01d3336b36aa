//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::storage::{CacheStore, ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<CacheStore>,
    pub objects: Arc<ObjectStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, cache: Arc<CacheStore>, objects: Arc<ObjectStore>) -> Self {
        Self {
            config,
            cache,
            objects,
            started_at: Instant::now(),
        }
    }
}
