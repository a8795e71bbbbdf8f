//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. Request ID (set and propagate `x-request-id`)
//! 3. `TraceLayer` (request tracing, tagged with the request id)
//! 4. Security headers (CSP, frame and isolation policy)
//! 5. Session layer (tower-sessions with `PostgreSQL` store, admin only)
//! 6. Rate limiting (governor) on checkout and admin login routes

pub mod auth;
pub mod rate_limit;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAdmin, RequireAdmin, clear_current_admin, set_current_admin};
pub use rate_limit::{admin_login_rate_limiter, checkout_rate_limiter};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
