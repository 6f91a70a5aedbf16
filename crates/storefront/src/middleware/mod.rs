//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Correlation (request id + browser fingerprint tagging)
//! 4. Session layer (tower-sessions)
//! 5. Visitor identity (resolve/back-fill the visitor id)
//! 6. Tenant resolution (map the request host to a store)

pub mod correlation;
pub mod session;
pub mod tenant;
pub mod visitor;

pub use correlation::correlation_middleware;
pub use session::create_session_layer;
pub use tenant::{StoreContext, tenant_middleware};
pub use visitor::{Visitor, visitor_middleware};
