//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Configure logging
//! - Initialize both storage clients
//! - Build the application and bind its listener
//!
//! # Design Decisions
//! - Fail fast on configuration errors
//! - Storage clients initialize concurrently and never fail startup
//! - Listeners bind last (traffic only when ready)

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, ListenerConfig};
use crate::http::App;
use crate::observability::logging;
use crate::storage::{CacheSettings, CacheStore, ObjectStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Overrides applied on top of the selected profile.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// TOML file merged over the profile.
    pub config_file: Option<PathBuf>,
    /// Takes precedence over `PORT`.
    pub port: Option<u16>,
}

/// Load config, configure logging, connect storage and build the app.
pub async fn create_app(environment: &str, options: &StartupOptions) -> Result<App, StartupError> {
    let port = options.port.map(|p| p.to_string());
    let env = |key: &str| match key {
        "PORT" if port.is_some() => port.clone(),
        _ => std::env::var(key).ok(),
    };

    let config = Arc::new(load_config(environment, options.config_file.as_deref(), env)?);
    logging::init_logging(&config.observability);

    tracing::info!(
        environment = config.environment.as_str(),
        bind_address = %config.listener.bind_address(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    let (cache, objects) = tokio::join!(
        CacheStore::initialize(CacheSettings::from_config(&config)),
        ObjectStore::initialize(config.object_store.clone()),
    );

    Ok(App::new(config, Arc::new(cache), Arc::new(objects)))
}

pub async fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let address = config.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}
