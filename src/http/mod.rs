//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → context.rs (endpoint class, origin, forwarded proto)
//!     → [security pipeline and rate limiter]
//!     → route groups, health.rs, static files
//!     → error.rs (uniform JSON / HTML error bodies)
//!     → Send to client
//! ```

pub mod context;
pub mod error;
pub mod health;
pub mod request;
pub mod response_cache;
pub mod server;
pub mod state;

pub use context::{EndpointClass, RequestContext};
pub use error::AppError;
pub use request::X_REQUEST_ID;
pub use server::App;
pub use state::AppState;
