//! Checkout route handlers.
//!
//! The form posts back with HTMX for an authoritative pricing preview, then
//! submits for real. Both paths re-check checkout eligibility; a cart that
//! drifted (stock changed, mutation still in flight) bounces back to the
//! cart page instead of charging the shopper.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use crate::api::types::{OrderConfirmationDto, OrderPreviewDto};
use crate::checkout::{self, CheckoutDetails};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{StoreContext, Visitor};
use crate::routes::cart::engine_for;
use crate::state::AppState;

/// One priced line of the order preview.
#[derive(Clone)]
pub struct PreviewLineView {
    pub variant_id: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

/// Order preview display data.
#[derive(Clone)]
pub struct PreviewView {
    pub lines: Vec<PreviewLineView>,
    pub subtotal: String,
    pub total_discount: String,
    pub total_tax: String,
    pub service_fees: String,
    pub delivery_fees: String,
    pub total_amount: String,
    pub minimum_order_value: Option<String>,
    pub is_below_minimum_order: bool,
}

impl From<&OrderPreviewDto> for PreviewView {
    fn from(preview: &OrderPreviewDto) -> Self {
        Self {
            lines: preview
                .lines
                .iter()
                .map(|line| PreviewLineView {
                    variant_id: line.variant_id.to_string(),
                    quantity: line.quantity,
                    unit_price: line.unit_price.display(),
                    line_total: line.line_total.display(),
                })
                .collect(),
            subtotal: preview.subtotal.display(),
            total_discount: preview.total_discount.display(),
            total_tax: preview.total_tax.display(),
            service_fees: preview.service_fees.display(),
            delivery_fees: preview.delivery_fees.display(),
            total_amount: preview.total_amount.display(),
            minimum_order_value: preview.minimum_order_value.as_ref().map(|m| m.display()),
            is_below_minimum_order: preview.is_below_minimum_order,
        }
    }
}

/// Order confirmation display data.
#[derive(Clone)]
pub struct ConfirmationView {
    pub order_number: String,
    pub total_amount: String,
    pub fulfillment_method: String,
}

impl From<&OrderConfirmationDto> for ConfirmationView {
    fn from(confirmation: &OrderConfirmationDto) -> Self {
        Self {
            order_number: confirmation.order_number.clone(),
            total_amount: confirmation.total_amount.display(),
            fulfillment_method: confirmation.fulfillment_method.to_string(),
        }
    }
}

/// Checkout form page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutFormTemplate {
    pub store_name: String,
    pub item_count: u32,
    pub subtotal: String,
}

/// Order preview fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "checkout/preview.html")]
pub struct PreviewTemplate {
    pub preview: PreviewView,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub store_name: String,
    pub confirmation: ConfirmationView,
}

/// Display the checkout form.
///
/// Carts that are not checkout-eligible bounce back to the cart page where
/// the issues are rendered inline.
#[instrument(skip(state, store, visitor), fields(store_id = %store.id))]
pub async fn form(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
) -> Result<Response> {
    let engine = engine_for(&state, &store, &visitor).await?;

    if !engine.can_checkout() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let cart = engine.snapshot();
    Ok(CheckoutFormTemplate {
        store_name: store.name,
        item_count: cart.item_count,
        subtotal: cart.subtotal.display(),
    }
    .into_response())
}

/// Render the authoritative pricing preview (HTMX).
#[instrument(skip(state, store, visitor, details), fields(store_id = %store.id))]
pub async fn preview(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
    Form(details): Form<CheckoutDetails>,
) -> Result<PreviewTemplate> {
    let engine = engine_for(&state, &store, &visitor).await?;
    let preview = checkout::preview_order(state.api(), &store, &engine, &details).await?;

    Ok(PreviewTemplate {
        preview: PreviewView::from(&preview),
    })
}

/// Place the order and render the confirmation.
#[instrument(skip(state, store, visitor, details), fields(store_id = %store.id))]
pub async fn place(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
    Form(details): Form<CheckoutDetails>,
) -> Result<Response> {
    let engine = engine_for(&state, &store, &visitor).await?;

    match checkout::place_order(state.api(), &store, &engine, &details).await {
        Ok(confirmation) => Ok(ConfirmationTemplate {
            store_name: store.name,
            confirmation: ConfirmationView::from(&confirmation),
        }
        .into_response()),
        // Eligibility drifted between the form render and the submit
        Err(AppError::BadRequest(_)) => Ok(Redirect::to("/cart").into_response()),
        Err(other) => Err(other),
    }
}
