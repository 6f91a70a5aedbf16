//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every handler goes through the per-visitor [`CartEngine`], so the view it
//! renders is the optimistic one: mutations show immediately and reconcile
//! (or roll back) when the backend round-trip settles.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use souk_core::{ProductId, VariantId};

use crate::api::types::StoreDto;
use crate::cart::{CartBackend, CartEngine, CartError, HttpCartBackend, LineMetadata};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{StoreContext, Visitor};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub variant_id: String,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image_url: Option<String>,
    /// A mutation for this line is still in flight.
    pub pending: bool,
    /// Stock issue to surface inline, if any.
    pub issue: Option<String>,
    /// Largest quantity the stepper offers.
    pub max_orderable: Option<u32>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u32,
    pub syncing: bool,
    pub has_issues: bool,
    pub can_checkout: bool,
}

/// Build the display view from the engine's current state.
fn cart_view<B: CartBackend>(engine: &CartEngine<B>) -> CartView {
    let cart = engine.snapshot();
    let validation = engine.validation();

    let items = cart
        .lines
        .iter()
        .map(|line| CartLineView {
            variant_id: line.variant_id.to_string(),
            product_name: line.product_name.clone(),
            variant_name: line.variant_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.display(),
            line_total: line.line_total.display(),
            image_url: line.image_url.clone(),
            pending: engine.is_pending(&line.variant_id),
            issue: validation
                .issue_for(&line.variant_id)
                .map(|issue| issue.issue.describe().to_string()),
            max_orderable: line.effective_cap(),
        })
        .collect();

    CartView {
        items,
        subtotal: cart.subtotal.display(),
        item_count: cart.item_count,
        syncing: engine.is_syncing(),
        has_issues: validation.has_stock_issues(),
        can_checkout: engine.can_checkout(),
    }
}

/// Fetch the visitor's engine, initialized for this store.
pub(crate) async fn engine_for(
    state: &AppState,
    store: &StoreDto,
    visitor: &Visitor,
) -> Result<Arc<CartEngine<HttpCartBackend>>> {
    let engine = state.cart_engine(store, &visitor.0.id).await;
    engine.initialize(&store.id, &store.currency).await?;
    Ok(engine)
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data. Quantity is absolute; 0 removes.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub variant_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub variant_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub store_name: String,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Render the items fragment, folding a mutation error into an inline
/// banner instead of failing the whole swap.
fn items_fragment<B: CartBackend>(
    engine: &CartEngine<B>,
    error: Option<&CartError>,
) -> Response {
    let message = error.map(|e| match e {
        CartError::Rejected { message } => message.clone(),
        CartError::Backend(e) if e.is_retryable() => {
            "Temporary problem updating your cart, please retry".to_string()
        }
        _ => "Could not update your cart".to_string(),
    });

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: cart_view(engine),
            error: message,
        },
    )
        .into_response()
}

/// Display the cart page.
#[instrument(skip(state, store, visitor), fields(store_id = %store.id))]
pub async fn show(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
) -> Result<CartShowTemplate> {
    let engine = engine_for(&state, &store, &visitor).await?;

    Ok(CartShowTemplate {
        store_name: store.name,
        cart: cart_view(&engine),
        error: None,
    })
}

/// Add item to cart (HTMX).
///
/// Looks the variant up in the (cached) catalog for its optimistic display
/// metadata, then dispatches through the engine. Returns the cart count
/// fragment plus an HTMX trigger so other cart widgets refresh.
#[instrument(skip(state, store, visitor, form), fields(store_id = %store.id, variant_id = %form.variant_id))]
pub async fn add(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let engine = engine_for(&state, &store, &visitor).await?;

    let product = state
        .api()
        .get_product(&store, &ProductId::new(form.product_id))
        .await?;
    let variant_id = VariantId::new(form.variant_id);
    let variant = product
        .variants
        .iter()
        .find(|v| v.id == variant_id)
        .ok_or_else(|| AppError::BadRequest("Unknown variant".to_string()))?;

    let metadata = LineMetadata::from_product(&product, variant);
    let quantity = form.quantity.unwrap_or(1);

    match engine.add_item(&variant_id, quantity, metadata).await {
        Ok(()) => {
            let count = engine.snapshot().item_count;
            Ok((
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                CartCountTemplate { count },
            )
                .into_response())
        }
        Err(error) => {
            tracing::warn!(%error, "add to cart failed");
            Ok(items_fragment(&*engine, Some(&error)))
        }
    }
}

/// Set a cart line to an absolute quantity (HTMX). Quantity 0 removes.
#[instrument(skip(state, store, visitor, form), fields(store_id = %store.id, variant_id = %form.variant_id, quantity = form.quantity))]
pub async fn update(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let engine = engine_for(&state, &store, &visitor).await?;
    let variant_id = VariantId::new(form.variant_id);

    let outcome = engine.update_quantity(&variant_id, form.quantity).await;
    if let Err(error) = &outcome {
        tracing::warn!(%error, "cart update failed");
    }
    Ok(items_fragment(&*engine, outcome.as_ref().err()))
}

/// Remove an item from the cart (HTMX).
#[instrument(skip(state, store, visitor, form), fields(store_id = %store.id, variant_id = %form.variant_id))]
pub async fn remove(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let engine = engine_for(&state, &store, &visitor).await?;
    let variant_id = VariantId::new(form.variant_id);

    let outcome = engine.remove_item(&variant_id).await;
    if let Err(error) = &outcome {
        tracing::warn!(%error, "cart remove failed");
    }
    Ok(items_fragment(&*engine, outcome.as_ref().err()))
}

/// Clear the cart (HTMX).
#[instrument(skip(state, store, visitor), fields(store_id = %store.id))]
pub async fn clear(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
) -> Result<Response> {
    let engine = engine_for(&state, &store, &visitor).await?;

    let outcome = engine.clear_cart().await;
    if let Err(error) = &outcome {
        tracing::warn!(%error, "cart clear failed");
    }
    Ok(items_fragment(&*engine, outcome.as_ref().err()))
}

/// Get the cart count badge (HTMX).
#[instrument(skip(state, store, visitor), fields(store_id = %store.id))]
pub async fn count(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    visitor: Visitor,
) -> Result<CartCountTemplate> {
    let engine = engine_for(&state, &store, &visitor).await?;
    Ok(CartCountTemplate {
        count: engine.snapshot().item_count,
    })
}
