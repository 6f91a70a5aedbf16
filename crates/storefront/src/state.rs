//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use souk_core::VisitorId;

use crate::api::{ApiClient, ApiError};
use crate::api::types::StoreDto;
use crate::cart::{CartEngine, HttpCartBackend};
use crate::config::StorefrontConfig;

/// Idle time after which a visitor's cart engine is dropped. The cart itself
/// lives server-side; the engine is rebuilt on the next request.
const ENGINE_IDLE_SECONDS: u64 = 30 * 60;

/// Upper bound on resident cart engines.
const ENGINE_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the commerce API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    /// One cart engine per (store, visitor), evicted when idle.
    engines: Cache<String, Arc<CartEngine<HttpCartBackend>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the commerce API client cannot be constructed
    /// from the configuration.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.commerce)?;

        let engines = Cache::builder()
            .max_capacity(ENGINE_CAPACITY)
            .time_to_idle(Duration::from_secs(ENGINE_IDLE_SECONDS))
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                engines,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get (or build) the cart engine for a store/visitor pair.
    ///
    /// The engine is shared across concurrent requests for the same pair, so
    /// per-variant mutation ordering holds across browser tabs too. The
    /// returned engine may not be initialized yet; callers go through
    /// [`CartEngine::initialize`], which is idempotent.
    pub async fn cart_engine(
        &self,
        store: &StoreDto,
        visitor_id: &VisitorId,
    ) -> Arc<CartEngine<HttpCartBackend>> {
        let key = format!("{}:{}", store.id, visitor_id);
        let backend = HttpCartBackend::new(self.api().clone(), store.id.clone(), &store.locale);
        let visitor_id = visitor_id.clone();
        self.inner
            .engines
            .get_with(key, async move { Arc::new(CartEngine::new(backend, visitor_id)) })
            .await
    }
}
