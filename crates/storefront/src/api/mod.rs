//! Typed client for the Souk commerce API.
//!
//! # Architecture
//!
//! - Thin `reqwest` wrapper; the backend is the source of truth - NO local
//!   sync, direct API calls
//! - Uniform `{ success, data, meta }` envelope unwrapping
//! - Tenant (`X-Store-Id`), locale (`Accept-Language`), and API key headers
//!   injected on every request
//! - In-memory caching via `moka` for catalog reads (5 minute TTL); cart and
//!   order calls are never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use souk_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config.commerce)?;
//!
//! // Resolve the tenant and browse its catalog
//! let store = api.get_store("mint-and-co").await?;
//! let products = api.list_products(&store, 1, 20, None).await?;
//!
//! // Cart truth lives server-side, keyed by visitor id
//! let cart = api.get_cart(&store.id, &store.locale, &visitor_id).await?;
//! ```

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource does not exist (404). For carts this means "no cart yet".
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend returned a non-2xx status with a message.
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Envelope was malformed (success=false on a 2xx, or missing data).
    #[error("Malformed response envelope: {0}")]
    Envelope(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, and 5xx/429 responses are transient;
    /// everything else reflects the request itself.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::NotFound(_) | Self::Parse(_) | Self::Envelope(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product prod_123".to_string());
        assert_eq!(err.to_string(), "Not found: product prod_123");

        let err = ApiError::Status {
            status: 422,
            message: "quantity exceeds available stock".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API returned 422: quantity exceeds available stock"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(
            ApiError::Status {
                status: 503,
                message: "maintenance".to_string()
            }
            .is_retryable()
        );
        assert!(
            ApiError::Status {
                status: 429,
                message: "slow down".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ApiError::Status {
                status: 422,
                message: "bad quantity".to_string()
            }
            .is_retryable()
        );
        assert!(!ApiError::NotFound("cart".to_string()).is_retryable());
        assert!(!ApiError::Envelope("missing data".to_string()).is_retryable());
    }
}
