//! Integration tests for the Souk storefront.
//!
//! These tests run the real API client and cart engine against a scripted
//! [wiremock](https://docs.rs/wiremock) commerce backend, so no external
//! services are required.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p souk-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - shopper cart journey: initialize, mutate, reconcile
//! - `checkout_flow` - order preview and creation over a settled cart

use secrecy::SecretString;

use souk_storefront::api::ApiClient;
use souk_storefront::config::CommerceApiConfig;

/// Build an [`ApiClient`] pointed at a wiremock server.
///
/// # Panics
///
/// Panics when the HTTP client cannot be constructed; acceptable in tests.
#[must_use]
pub fn test_api_client(base_url: &str) -> ApiClient {
    let config = CommerceApiConfig {
        base_url: base_url.to_string(),
        api_key: SecretString::from("integration-test-key-0123456789"),
        timeout_secs: 5,
        default_locale: "en-US".to_string(),
    };
    ApiClient::new(&config).expect("build API client")
}

/// Wrap a payload in the backend's response envelope.
#[must_use]
pub fn envelope(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "data": data,
        "meta": {"timestamp": "2026-02-01T09:00:00Z"}
    })
}

/// A store payload as the backend returns it.
#[must_use]
pub fn store_json(id: &str, slug: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "slug": slug,
        "name": "Mint & Co",
        "currency": "USD",
        "locale": "en-US",
        "description": "Tea and trinkets"
    })
}

/// A variant payload with the given stock posture.
#[must_use]
pub fn variant_json(id: &str, price: &str, available: u32) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("Variant {id}"),
        "price": {"amount": price, "currency": "USD"},
        "availableQuantity": available,
        "inStock": available > 0,
        "inventoryTrackable": true,
        "maxQuantityPerOrder": null
    })
}

/// A cart payload with one line.
#[must_use]
pub fn cart_json(variant: serde_json::Value, quantity: u32, line_total: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "cart_1",
        "items": [{
            "id": "line_1",
            "quantity": quantity,
            "lineTotal": {"amount": line_total, "currency": "USD"},
            "variant": variant,
            "productName": "Mint Tea",
            "imageUrl": null
        }],
        "itemCount": quantity,
        "subtotal": {"amount": line_total, "currency": "USD"}
    })
}
