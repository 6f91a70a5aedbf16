//! Order preview and creation over a settled cart.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use souk_core::{FulfillmentMethod, StoreId, VisitorId};
use souk_storefront::api::ApiClient;
use souk_storefront::api::types::StoreDto;
use souk_storefront::cart::{CartEngine, HttpCartBackend};
use souk_storefront::checkout::{self, CheckoutDetails};

use souk_integration_tests::{cart_json, envelope, test_api_client, variant_json};

const VISITOR: &str = "11111111-2222-3333-4444-555555555555";

fn test_store() -> StoreDto {
    StoreDto {
        id: StoreId::new("st_1"),
        slug: "mint-and-co".to_string(),
        name: "Mint & Co".to_string(),
        currency: "USD".to_string(),
        locale: "en-US".to_string(),
        description: None,
    }
}

fn pickup_details() -> CheckoutDetails {
    CheckoutDetails {
        fulfillment_method: FulfillmentMethod::Pickup,
        customer_name: Some("Noor".to_string()),
        customer_phone: None,
        notes: None,
        delivery_address: None,
        payment_method: "cash".to_string(),
    }
}

async fn settled_engine(api: &ApiClient, server: &MockServer) -> CartEngine<HttpCartBackend> {
    Mock::given(method("GET"))
        .and(path(format!("/public/carts/{VISITOR}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(cart_json(variant_json("var_tea", "4.99", 10), 2, "9.98"))),
        )
        .mount(server)
        .await;

    let backend = HttpCartBackend::new(api.clone(), StoreId::new("st_1"), "en-US");
    let engine = CartEngine::new(backend, VisitorId::new(VISITOR));
    engine
        .initialize(&StoreId::new("st_1"), "USD")
        .await
        .expect("initialize");
    engine
}

fn preview_body() -> serde_json::Value {
    json!({
        "subtotal": {"amount": "9.98", "currency": "USD"},
        "totalDiscount": {"amount": "0.00", "currency": "USD"},
        "totalTax": {"amount": "0.50", "currency": "USD"},
        "serviceFees": {"amount": "0.25", "currency": "USD"},
        "deliveryFees": {"amount": "0.00", "currency": "USD"},
        "totalAmount": {"amount": "10.73", "currency": "USD"},
        "lines": [{
            "variantId": "var_tea",
            "quantity": 2,
            "unitPrice": {"amount": "4.99", "currency": "USD"},
            "lineTotal": {"amount": "9.98", "currency": "USD"}
        }],
        "minimumOrderValue": null,
        "isBelowMinimumOrder": false
    })
}

#[tokio::test]
async fn test_preview_returns_backend_totals() {
    let server = MockServer::start().await;
    let api = test_api_client(&server.uri());
    let engine = settled_engine(&api, &server).await;

    Mock::given(method("POST"))
        .and(path("/public/orders/preview"))
        .and(body_partial_json(json!({
            "storeId": "st_1",
            "fulfillmentMethod": "pickup",
            "items": [{"variantId": "var_tea", "quantity": 2}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(preview_body())))
        .expect(1)
        .mount(&server)
        .await;

    let preview = checkout::preview_order(&api, &test_store(), &engine, &pickup_details())
        .await
        .expect("preview");

    assert_eq!(preview.total_amount.display(), "10.73 USD");
    assert_eq!(preview.lines.len(), 1);
    assert!(!preview.is_below_minimum_order);
}

#[tokio::test]
async fn test_place_order_clears_local_cart() {
    let server = MockServer::start().await;
    let api = test_api_client(&server.uri());
    let engine = settled_engine(&api, &server).await;

    Mock::given(method("POST"))
        .and(path("/public/orders"))
        .and(body_partial_json(json!({
            "storeId": "st_1",
            "visitorId": VISITOR,
            "paymentMethod": "cash"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "orderId": "ord_9",
            "orderNumber": "SO-1042",
            "totalAmount": {"amount": "10.73", "currency": "USD"},
            "currency": "USD",
            "fulfillmentMethod": "pickup",
            "createdAt": "2026-02-01T09:30:00Z"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let confirmation = checkout::place_order(&api, &test_store(), &engine, &pickup_details())
        .await
        .expect("place order");

    assert_eq!(confirmation.order_number, "SO-1042");
    // The backend consumed the cart; the local view is dropped too.
    assert!(engine.snapshot().is_empty());
}

#[tokio::test]
async fn test_delivery_without_address_is_rejected_before_the_backend() {
    let server = MockServer::start().await;
    let api = test_api_client(&server.uri());
    let engine = settled_engine(&api, &server).await;

    let details = CheckoutDetails {
        fulfillment_method: FulfillmentMethod::Delivery,
        delivery_address: None,
        ..pickup_details()
    };

    // No /public/orders mock mounted: the gate must fire first.
    checkout::place_order(&api, &test_store(), &engine, &details)
        .await
        .expect_err("needs address");
    assert_eq!(engine.snapshot().item_count, 2, "cart untouched");
}
