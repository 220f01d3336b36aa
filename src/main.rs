//! Marketplace web server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request ID → trace → response pipeline → timeout
//!                     → error rendering → rate limit (Redis) → catch panic
//!                     → router
//!                         │
//!                     ┌───┴────────────┬───────────────┬───────┐
//!                     ▼                ▼               ▼       ▼
//!                   home          api v1 / auth      admin   static
//!                                      │
//!                           ┌──────────┴──────────┐
//!                           ▼                     ▼
//!                      CacheStore            ObjectStore
//!                   (Redis, fail-soft)   (S3/R2, fail-soft)
//! ```

use std::path::PathBuf;

use clap::Parser;

use marketplace_web::lifecycle::{bind_listener, create_app, Shutdown, StartupOptions};
use marketplace_web::observability::metrics;

#[derive(Parser)]
#[command(name = "marketplace-web")]
#[command(about = "Marketplace web application server", long_about = None)]
struct Cli {
    /// Environment profile (`production`; anything else is development)
    #[arg(short, long, env = "APP_ENV", default_value = "development")]
    env: String,

    /// TOML file merged over the profile
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = StartupOptions {
        config_file: cli.config,
        port: cli.port,
    };
    let app = create_app(&cli.env, &options).await?;

    let observability = &app.config().observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = bind_listener(&app.config().listener).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    app.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
