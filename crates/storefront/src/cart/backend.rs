//! Backend seam for the cart engine.
//!
//! The engine talks to the commerce API through [`CartBackend`] so tests can
//! substitute a scripted in-memory backend. The production implementation,
//! [`HttpCartBackend`], binds an [`ApiClient`] to one store scope.

use souk_core::{StoreId, VariantId, VisitorId};

use crate::api::types::{CartDto, SetCartLineRequest};
use crate::api::{ApiClient, ApiError};

/// Remote cart operations the engine depends on.
///
/// Mutations use absolute quantities; 0 removes the line. `fetch_cart`
/// returns `None` when the visitor has no cart yet.
pub trait CartBackend: Send + Sync + 'static {
    fn fetch_cart(
        &self,
        visitor_id: &VisitorId,
    ) -> impl Future<Output = Result<Option<CartDto>, ApiError>> + Send;

    fn set_line(
        &self,
        visitor_id: &VisitorId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// [`CartBackend`] over the commerce API, bound to one store.
#[derive(Clone)]
pub struct HttpCartBackend {
    api: ApiClient,
    store_id: StoreId,
    locale: String,
}

impl HttpCartBackend {
    #[must_use]
    pub fn new(api: ApiClient, store_id: StoreId, locale: impl Into<String>) -> Self {
        Self {
            api,
            store_id,
            locale: locale.into(),
        }
    }
}

impl CartBackend for HttpCartBackend {
    async fn fetch_cart(&self, visitor_id: &VisitorId) -> Result<Option<CartDto>, ApiError> {
        self.api
            .get_cart(&self.store_id, &self.locale, visitor_id)
            .await
    }

    async fn set_line(
        &self,
        visitor_id: &VisitorId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let request = SetCartLineRequest {
            visitor_id: visitor_id.clone(),
            variant_id: variant_id.clone(),
            quantity,
        };
        self.api
            .set_cart_line(&self.store_id, &self.locale, &request)
            .await
    }
}
