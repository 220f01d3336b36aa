//! Marketplace web application: configuration, storage clients, application
//! factory and response middleware pipeline.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routes;
pub mod security;
pub mod storage;

pub use config::AppConfig;
pub use http::App;
pub use lifecycle::{create_app, Shutdown};
