//! Cart synchronization engine and its supporting types.
//!
//! # Architecture
//!
//! The cart lives server-side, keyed by visitor id; this module owns the
//! client view of it. The engine applies every mutation optimistically,
//! tracks it as a pending operation for its variant, then reconciles the
//! local view against re-fetched server truth (or rolls back on failure).
//!
//! Per-line mutation lifecycle: Idle -> Pending -> Committed | RolledBack.
//! Mutations for the same variant are serialized; different variants run
//! concurrently.
//!
//! # Example
//!
//! ```rust,ignore
//! use souk_storefront::cart::{CartEngine, HttpCartBackend, LineMetadata};
//!
//! let backend = HttpCartBackend::new(api, store.id.clone(), &store.locale);
//! let engine = CartEngine::new(backend, visitor_id);
//!
//! engine.initialize(&store.id, &store.currency).await?;
//! engine.add_item(&variant_id, 1, metadata).await?;
//! assert!(engine.can_checkout() || engine.validation().has_stock_issues());
//! ```

pub mod backend;
pub mod engine;
pub mod types;
pub mod validation;

pub use backend::{CartBackend, HttpCartBackend};
pub use engine::CartEngine;
pub use types::{Cart, CartLine, LineMetadata, MutationKind, PendingOperation};
pub use validation::{CartValidation, LineIssue, StockIssue};

use thiserror::Error;

use crate::api::ApiError;

/// Errors surfaced by the cart engine.
#[derive(Debug, Error)]
pub enum CartError {
    /// A mutation was issued before `initialize` completed for a store.
    #[error("cart engine is not initialized for a store")]
    NotInitialized,

    /// The backend rejected the mutation (e.g., stock changed server-side).
    /// The optimistic change has been rolled back; surfaced inline on the
    /// affected line.
    #[error("cart mutation rejected: {message}")]
    Rejected { message: String },

    /// Transport or backend failure. The optimistic change has been rolled
    /// back; retryable errors surface as a transient banner.
    #[error("cart backend error: {0}")]
    Backend(#[from] ApiError),
}

impl CartError {
    /// Map an API error to the cart taxonomy: 409/422 responses are
    /// server-side rejections of the mutation itself, everything else is a
    /// backend failure.
    #[must_use]
    pub fn classify(error: ApiError) -> Self {
        match error {
            ApiError::Status { status, message } if status == 409 || status == 422 => {
                Self::Rejected { message }
            }
            other => Self::Backend(other),
        }
    }

    /// Whether retrying the same mutation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotInitialized | Self::Rejected { .. } => false,
            Self::Backend(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_conflict_as_rejected() {
        let err = CartError::classify(ApiError::Status {
            status: 422,
            message: "stock changed".to_string(),
        });
        assert!(matches!(err, CartError::Rejected { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_server_error_as_retryable_backend() {
        let err = CartError::classify(ApiError::Status {
            status: 503,
            message: "maintenance".to_string(),
        });
        assert!(matches!(err, CartError::Backend(_)));
        assert!(err.is_retryable());
    }
}
