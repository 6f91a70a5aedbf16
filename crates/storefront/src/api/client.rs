//! Commerce API client implementation.
//!
//! Catalog reads (stores, categories, products) are cached with `moka`
//! (5-minute TTL). Cart and order calls always hit the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use souk_core::{CategoryId, ProductId, StoreId, VariantId, VisitorId};

use crate::config::CommerceApiConfig;

use super::ApiError;
use super::types::{
    CartDto, CategoryDto, CreateOrderRequest, Envelope, Meta, OrderConfirmationDto,
    OrderPreviewDto, OrderPreviewRequest, Page, ProductDto, SetCartLineRequest, StoreDto,
};

/// Header carrying the tenant scope.
pub const STORE_HEADER: &str = "x-store-id";
/// Header carrying the backend API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Catalog cache TTL.
const CACHE_TTL: Duration = Duration::from_secs(300);
/// Catalog cache capacity.
const CACHE_CAPACITY: u64 = 1000;

/// Cached catalog responses.
#[derive(Clone)]
enum CacheValue {
    Store(Box<StoreDto>),
    Categories(Page<CategoryDto>),
    Products(Page<ProductDto>),
    Product(Box<ProductDto>),
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Souk commerce API.
///
/// Cheaply cloneable via `Arc`. Provides typed access to stores, catalog,
/// carts, and orders.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    default_locale: String,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    /// (e.g., TLS backend initialization failure).
    pub fn new(config: &CommerceApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                default_locale: config.default_locale.clone(),
                cache,
            }),
        })
    }

    /// Build a request with the standard headers applied.
    fn request(
        &self,
        method: Method,
        path: &str,
        store: Option<&StoreId>,
        locale: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(API_KEY_HEADER, self.inner.api_key.expose_secret())
            .header("Accept-Language", locale);

        if let Some(store_id) = store {
            builder = builder.header(STORE_HEADER, store_id.as_str());
        }

        builder
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// Returns the (possibly absent) data payload plus envelope metadata.
    /// 404 maps to [`ApiError::NotFound`] with `context` as the message.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<(Option<T>, Option<Meta>), ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(context.to_string()));
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            tracing::error!(
                status = %status,
                context = %context,
                message = %message,
                "Commerce API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        // No-content mutations return 204 or an empty body
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok((None, None));
        }

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    context = %context,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse commerce API response"
                );
                return Err(ApiError::Parse(e));
            }
        };

        if !envelope.success {
            return Err(ApiError::Envelope(
                envelope
                    .message
                    .unwrap_or_else(|| format!("{context}: success=false")),
            ));
        }

        Ok((envelope.data, envelope.meta))
    }

    /// As [`Self::execute`], but the data payload is required.
    async fn execute_expecting<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<(T, Option<Meta>), ApiError> {
        let (data, meta) = self.execute(builder, context).await?;
        let data =
            data.ok_or_else(|| ApiError::Envelope(format!("{context}: missing data payload")))?;
        Ok((data, meta))
    }

    // =========================================================================
    // Store & Catalog Methods
    // =========================================================================

    /// Resolve a store by its slug (subdomain).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown slugs, or a transport or
    /// envelope error.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_store(&self, slug: &str) -> Result<StoreDto, ApiError> {
        let cache_key = format!("store:{slug}");

        if let Some(CacheValue::Store(store)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for store");
            return Ok(*store);
        }

        let builder = self.request(
            Method::GET,
            &format!("/public/stores/{slug}"),
            None,
            &self.inner.default_locale,
        );
        let (store, _): (StoreDto, _) = self
            .execute_expecting(builder, &format!("store {slug}"))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Store(Box::new(store.clone())))
            .await;

        Ok(store)
    }

    /// List categories for a store (paginated).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, store), fields(store_id = %store.id, page = page))]
    pub async fn list_categories(
        &self,
        store: &StoreDto,
        page: u32,
    ) -> Result<Page<CategoryDto>, ApiError> {
        let cache_key = format!("categories:{}:{page}", store.id);

        if let Some(CacheValue::Categories(cached)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(cached);
        }

        let builder = self
            .request(
                Method::GET,
                &format!("/public/stores/{}/categories", store.id),
                Some(&store.id),
                &store.locale,
            )
            .query(&[("page", page)]);
        let (items, meta): (Vec<CategoryDto>, _) = self
            .execute_expecting(builder, &format!("categories for store {}", store.id))
            .await?;

        let result = Page {
            items,
            pagination: meta.and_then(|m| m.pagination),
        };
        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(result.clone()))
            .await;

        Ok(result)
    }

    /// List products for a store (paginated, optionally filtered by category).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, store), fields(store_id = %store.id, page = page))]
    pub async fn list_products(
        &self,
        store: &StoreDto,
        page: u32,
        per_page: u32,
        category: Option<&CategoryId>,
    ) -> Result<Page<ProductDto>, ApiError> {
        let category_key = category.map_or("all", CategoryId::as_str);
        let cache_key = format!("products:{}:{page}:{per_page}:{category_key}", store.id);

        if let Some(CacheValue::Products(cached)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(cached);
        }

        let mut query = vec![
            ("page".to_string(), page.to_string()),
            ("perPage".to_string(), per_page.to_string()),
        ];
        if let Some(category_id) = category {
            query.push(("category".to_string(), category_id.to_string()));
        }

        let builder = self
            .request(
                Method::GET,
                &format!("/public/stores/{}/products", store.id),
                Some(&store.id),
                &store.locale,
            )
            .query(&query);
        let (items, meta): (Vec<ProductDto>, _) = self
            .execute_expecting(builder, &format!("products for store {}", store.id))
            .await?;

        let result = Page {
            items,
            pagination: meta.and_then(|m| m.pagination),
        };
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(result.clone()))
            .await;

        Ok(result)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self, store), fields(product_id = %product_id))]
    pub async fn get_product(
        &self,
        store: &StoreDto,
        product_id: &ProductId,
    ) -> Result<ProductDto, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let builder = self.request(
            Method::GET,
            &format!("/public/products/{product_id}"),
            Some(&store.id),
            &store.locale,
        );
        let (product, _): (ProductDto, _) = self
            .execute_expecting(builder, &format!("product {product_id}"))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the visitor's cart. `None` means the visitor has no cart yet.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or envelope failures; a 404 is not an
    /// error.
    #[instrument(skip(self), fields(visitor_id = %visitor_id))]
    pub async fn get_cart(
        &self,
        store_id: &StoreId,
        locale: &str,
        visitor_id: &VisitorId,
    ) -> Result<Option<CartDto>, ApiError> {
        let builder = self.request(
            Method::GET,
            &format!("/public/carts/{visitor_id}"),
            Some(store_id),
            locale,
        );
        match self
            .execute_expecting(builder, &format!("cart for visitor {visitor_id}"))
            .await
        {
            Ok((cart, _)) => Ok(Some(cart)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a cart line to an absolute quantity. Quantity 0 removes the line.
    ///
    /// The backend does not return the updated cart; callers re-fetch to
    /// reconcile.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation is rejected or the request fails.
    #[instrument(skip(self, request), fields(variant_id = %request.variant_id, quantity = request.quantity))]
    pub async fn set_cart_line(
        &self,
        store_id: &StoreId,
        locale: &str,
        request: &SetCartLineRequest,
    ) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "/public/carts/items", Some(store_id), locale)
            .json(request);
        let (_, _): (Option<serde_json::Value>, _) = self
            .execute(builder, &format!("cart line {}", request.variant_id))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Preview an order: authoritative pricing, discounts, taxes, and fees.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, store, request), fields(store_id = %store.id))]
    pub async fn preview_order(
        &self,
        store: &StoreDto,
        request: &OrderPreviewRequest,
    ) -> Result<OrderPreviewDto, ApiError> {
        let builder = self
            .request(
                Method::POST,
                "/public/orders/preview",
                Some(&store.id),
                &store.locale,
            )
            .json(request);
        let (preview, _) = self.execute_expecting(builder, "order preview").await?;
        Ok(preview)
    }

    /// Create an order from the current cart contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, store, request), fields(store_id = %store.id))]
    pub async fn create_order(
        &self,
        store: &StoreDto,
        request: &CreateOrderRequest,
    ) -> Result<OrderConfirmationDto, ApiError> {
        let builder = self
            .request(
                Method::POST,
                "/public/orders",
                Some(&store.id),
                &store.locale,
            )
            .json(request);
        let (confirmation, _) = self.execute_expecting(builder, "order create").await?;
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use souk_core::{StoreId, VariantId, VisitorId};

    use super::*;

    fn test_client(base_url: &str) -> ApiClient {
        let config = CommerceApiConfig {
            base_url: base_url.to_string(),
            api_key: SecretString::from("test-api-key-0123456789abcdef"),
            timeout_secs: 5,
            default_locale: "en-US".to_string(),
        };
        ApiClient::new(&config).expect("build client")
    }

    fn store_body() -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "data": {
                "id": "st_1",
                "slug": "mint-and-co",
                "name": "Mint & Co",
                "currency": "USD",
                "locale": "en-US",
                "description": null
            },
            "meta": {"timestamp": "2026-01-05T12:00:00Z"}
        })
    }

    #[tokio::test]
    async fn test_get_store_unwraps_envelope_and_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/stores/mint-and-co"))
            .and(header(API_KEY_HEADER, "test-api-key-0123456789abcdef"))
            .and(header("accept-language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(store_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let store = client.get_store("mint-and-co").await.expect("store");
        assert_eq!(store.id, StoreId::new("st_1"));
        assert_eq!(store.currency, "USD");
    }

    #[tokio::test]
    async fn test_get_store_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/stores/mint-and-co"))
            .respond_with(ResponseTemplate::new(200).set_body_json(store_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let first = client.get_store("mint-and-co").await.expect("first");
        let second = client.get_store("mint-and-co").await.expect("second");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_get_cart_maps_404_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/carts/vis_1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let cart = client
            .get_cart(&StoreId::new("st_1"), "en-US", &VisitorId::new("vis_1"))
            .await
            .expect("no error for missing cart");
        assert!(cart.is_none());
    }

    #[tokio::test]
    async fn test_set_cart_line_tolerates_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public/carts/items"))
            .and(header(STORE_HEADER, "st_1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = SetCartLineRequest {
            visitor_id: VisitorId::new("vis_1"),
            variant_id: VariantId::new("var_1"),
            quantity: 2,
        };
        client
            .set_cart_line(&StoreId::new("st_1"), "en-US", &request)
            .await
            .expect("mutation accepted");
    }

    #[tokio::test]
    async fn test_error_status_carries_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public/carts/items"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "success": false,
                "data": null,
                "message": "quantity exceeds available stock"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = SetCartLineRequest {
            visitor_id: VisitorId::new("vis_1"),
            variant_id: VariantId::new("var_1"),
            quantity: 99,
        };
        let err = client
            .set_cart_line(&StoreId::new("st_1"), "en-US", &request)
            .await
            .expect_err("rejected");
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "quantity exceeds available stock");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_false_on_2xx_is_envelope_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/stores/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "data": null,
                "message": "store disabled"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.get_store("broken").await.expect_err("envelope error");
        assert!(matches!(err, ApiError::Envelope(message) if message == "store disabled"));
    }
}
