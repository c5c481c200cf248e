//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → middleware/gatekeeper.rs (exclusions, then Gatekeeper::evaluate)
//!         Block    → 403/429 plaintext
//!         Redirect → 302 Location
//!         Pass     → server.rs proxy_handler → upstream application
//! ```

pub mod middleware;
pub mod server;

pub use middleware::gatekeeper_middleware;
pub use server::{gatekeeper_router, HttpServer, ServerError};
