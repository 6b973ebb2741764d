//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Admin routes additionally extract [`RequireAdmin`].

pub mod admin;
pub mod request_id;

pub use admin::RequireAdmin;
pub use request_id::{RequestId, request_id_middleware};
