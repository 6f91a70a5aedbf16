//! Checkout orchestration over the cart engine and the orders API.
//!
//! Checkout is gated on a settled, issue-free cart: pending mutations or
//! flagged stock issues block both preview and order creation so the shopper
//! never pays for a cart the backend would refuse. Pricing is always the
//! backend's; the preview's totals are what the shopper confirms.

use serde::Deserialize;
use tracing::{info, instrument};

use souk_core::FulfillmentMethod;

use crate::api::ApiClient;
use crate::api::types::{
    CreateOrderRequest, OrderConfirmationDto, OrderItemRequest, OrderPreviewDto,
    OrderPreviewRequest, StoreDto,
};
use crate::cart::{CartBackend, CartEngine};
use crate::error::AppError;

/// Shopper-entered checkout details.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutDetails {
    #[serde(default)]
    pub fulfillment_method: FulfillmentMethod,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub delivery_address: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    "cash".to_string()
}

/// Preview the order for the current cart: authoritative totals, discounts,
/// taxes, and fees from the backend.
///
/// # Errors
///
/// Fails when the cart is empty, still syncing, or has stock issues, and on
/// any backend failure.
#[instrument(skip_all, fields(store_id = %store.id))]
pub async fn preview_order<B: CartBackend>(
    api: &ApiClient,
    store: &StoreDto,
    engine: &CartEngine<B>,
    details: &CheckoutDetails,
) -> Result<OrderPreviewDto, AppError> {
    let request = preview_request(store, engine, details)?;
    let preview = api.preview_order(store, &request).await?;
    Ok(preview)
}

/// Place the order for the current cart.
///
/// On success the local cart view is cleared; the backend consumes the
/// server-side cart as part of order creation.
///
/// # Errors
///
/// Same gating as [`preview_order`], plus order-creation failures.
#[instrument(skip_all, fields(store_id = %store.id))]
pub async fn place_order<B: CartBackend>(
    api: &ApiClient,
    store: &StoreDto,
    engine: &CartEngine<B>,
    details: &CheckoutDetails,
) -> Result<OrderConfirmationDto, AppError> {
    let preview = preview_request(store, engine, details)?;
    let request = CreateOrderRequest {
        preview,
        visitor_id: engine.visitor_id().clone(),
        payment_method: details.payment_method.clone(),
    };

    let confirmation = api.create_order(store, &request).await?;
    info!(
        order_number = %confirmation.order_number,
        "order placed"
    );

    // The backend owns the cart's fate after ordering; drop the local view.
    engine.clear_local();

    Ok(confirmation)
}

/// Gate on checkout eligibility and freeze the cart into request lines.
fn preview_request<B: CartBackend>(
    store: &StoreDto,
    engine: &CartEngine<B>,
    details: &CheckoutDetails,
) -> Result<OrderPreviewRequest, AppError> {
    if !engine.can_checkout() {
        let reason = if engine.is_syncing() {
            "cart is still syncing"
        } else if engine.snapshot().is_empty() {
            "cart is empty"
        } else {
            "cart has stock issues"
        };
        return Err(AppError::BadRequest(format!("Cannot check out: {reason}")));
    }

    if details.fulfillment_method == FulfillmentMethod::Delivery
        && details
            .delivery_address
            .as_deref()
            .is_none_or(|a| a.trim().is_empty())
    {
        return Err(AppError::BadRequest(
            "Delivery orders need a delivery address".to_string(),
        ));
    }

    let items: Vec<OrderItemRequest> = engine
        .snapshot()
        .lines
        .iter()
        .map(|line| OrderItemRequest {
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
        })
        .collect();

    Ok(OrderPreviewRequest {
        store_id: store.id.clone(),
        fulfillment_method: details.fulfillment_method,
        items,
        customer_name: details.customer_name.clone(),
        customer_phone: details.customer_phone.clone(),
        notes: details.notes.clone(),
        delivery_address: details.delivery_address.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_details_defaults() {
        let details: CheckoutDetails =
            serde_urlencoded::from_str("customer_name=Noor").expect("parse form");
        assert_eq!(details.fulfillment_method, FulfillmentMethod::Pickup);
        assert_eq!(details.payment_method, "cash");
        assert_eq!(details.customer_name.as_deref(), Some("Noor"));
    }

    #[test]
    fn test_delivery_parses_from_form() {
        let details: CheckoutDetails = serde_urlencoded::from_str(
            "fulfillment_method=delivery&delivery_address=1+Harbor+St",
        )
        .expect("parse form");
        assert_eq!(details.fulfillment_method, FulfillmentMethod::Delivery);
        assert_eq!(details.delivery_address.as_deref(), Some("1 Harbor St"));
    }
}
