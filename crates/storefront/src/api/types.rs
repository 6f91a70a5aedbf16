//! Wire types for the Souk commerce API.
//!
//! These mirror the backend's public REST surface. All payloads use
//! camelCase on the wire and ride in a uniform envelope
//! `{ success, data, meta }` (see [`super::ApiClient`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souk_core::{
    CartId, CategoryId, FulfillmentMethod, Money, OrderId, ProductId, StoreId, VariantId,
    VisitorId,
};

// =============================================================================
// Envelope
// =============================================================================

/// Uniform response envelope returned by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded at the application level.
    pub success: bool,
    /// Payload; absent on failures and on no-content mutations.
    pub data: Option<T>,
    /// Response metadata (timestamp, pagination).
    pub meta: Option<Meta>,
    /// Human-readable failure message when `success` is false.
    pub message: Option<String>,
}

/// Envelope metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub timestamp: Option<DateTime<Utc>>,
    pub pagination: Option<Pagination>,
}

/// Pagination block carried in `meta` for list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// A page of results with its pagination metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    /// Whether a further page exists.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pagination
            .as_ref()
            .is_some_and(|p| p.page < p.total_pages)
    }
}

// =============================================================================
// Store & Catalog
// =============================================================================

/// A tenant storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDto {
    pub id: StoreId,
    /// URL-safe slug; doubles as the subdomain.
    pub slug: String,
    pub name: String,
    /// ISO 4217 currency code all prices in this store use.
    pub currency: String,
    /// BCP 47 locale tag for content negotiation.
    pub locale: String,
    pub description: Option<String>,
}

/// A product category within a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A purchasable product variant with its stock posture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDto {
    pub id: VariantId,
    pub name: String,
    pub price: Money,
    /// Units the backend believes are on hand.
    pub available_quantity: u32,
    pub in_stock: bool,
    /// When false the variant is sold without stock accounting.
    pub inventory_trackable: bool,
    pub max_quantity_per_order: Option<u32>,
}

/// A product with its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub variants: Vec<VariantDto>,
}

// =============================================================================
// Cart
// =============================================================================

/// Server-side cart, keyed by visitor id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub id: CartId,
    pub items: Vec<CartItemDto>,
    /// Sum of quantities across lines.
    pub item_count: u32,
    pub subtotal: Money,
}

/// One line of a server-side cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub id: String,
    pub quantity: u32,
    pub line_total: Money,
    pub variant: VariantDto,
    /// Cached display fields so the cart renders even when catalog
    /// lookups fail.
    pub product_name: Option<String>,
    pub image_url: Option<String>,
}

/// Absolute-quantity cart mutation. Quantity 0 removes the line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCartLineRequest {
    pub visitor_id: VisitorId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

// =============================================================================
// Orders
// =============================================================================

/// One line of an order preview/create request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Request body for `POST /public/orders/preview`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPreviewRequest {
    pub store_id: StoreId,
    pub fulfillment_method: FulfillmentMethod,
    pub items: Vec<OrderItemRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
}

/// Request body for `POST /public/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    pub preview: OrderPreviewRequest,
    pub visitor_id: VisitorId,
    pub payment_method: String,
}

/// Authoritative per-line pricing returned by the preview endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLineDto {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Pricing breakdown returned by `POST /public/orders/preview`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPreviewDto {
    pub subtotal: Money,
    pub total_discount: Money,
    pub total_tax: Money,
    pub service_fees: Money,
    pub delivery_fees: Money,
    pub total_amount: Money,
    pub lines: Vec<PreviewLineDto>,
    pub minimum_order_value: Option<Money>,
    pub is_below_minimum_order: bool,
}

/// Confirmation returned by `POST /public/orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmationDto {
    pub order_id: OrderId,
    pub order_number: String,
    pub total_amount: Money,
    pub currency: String,
    pub fulfillment_method: FulfillmentMethod,
    pub created_at: DateTime<Utc>,
}
