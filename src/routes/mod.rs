//! Route groups.
//!
//! Thin handlers over the storage clients. Mounted by
//! [`crate::http::server::App`]:
//!
//! ```text
//! /                     → home::index
//! {api_prefix}/v1/...   → api::router
//! /auth/...             → auth::router
//! /admin/...            → crate::admin::router
//! ```

pub mod api;
pub mod auth;
pub mod home;
