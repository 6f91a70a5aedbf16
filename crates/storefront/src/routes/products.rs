//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use souk_core::{CategoryId, ProductId};

use crate::api::types::{ProductDto, VariantDto};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::StoreContext;
use crate::state::AppState;

/// Products per listing page.
const PRODUCTS_PER_PAGE: u32 = 24;

/// Product card data for listing grids.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

impl From<&ProductDto> for ProductCardView {
    fn from(product: &ProductDto) -> Self {
        let cheapest = product
            .variants
            .iter()
            .min_by_key(|v| v.price.amount);
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: cheapest.map_or_else(String::new, |v| v.price.display()),
            image_url: product.image_url.clone(),
            in_stock: product
                .variants
                .iter()
                .any(|v| v.in_stock || !v.inventory_trackable),
        }
    }
}

/// Variant display data for the product detail page.
#[derive(Clone)]
pub struct VariantView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub in_stock: bool,
    /// Largest quantity the add-to-cart stepper offers.
    pub max_orderable: Option<u32>,
}

impl From<&VariantDto> for VariantView {
    fn from(variant: &VariantDto) -> Self {
        Self {
            id: variant.id.to_string(),
            name: variant.name.clone(),
            price: variant.price.display(),
            in_stock: variant.in_stock || !variant.inventory_trackable,
            max_orderable: crate::cart::types::effective_cap(
                variant.inventory_trackable,
                variant.available_quantity,
                variant.max_quantity_per_order,
            ),
        }
    }
}

/// Full product display data for the detail page.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub variants: Vec<VariantView>,
}

impl From<&ProductDto> for ProductView {
    fn from(product: &ProductDto) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            variants: product.variants.iter().map(VariantView::from).collect(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub category: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub store_name: String,
    pub products: Vec<ProductCardView>,
    pub current_page: u32,
    pub has_more_pages: bool,
    pub category: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub store_name: String,
    pub product: ProductView,
}

/// Display the product listing page.
#[instrument(skip(state, store), fields(store_id = %store.id))]
pub async fn index(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    Query(query): Query<ListingQuery>,
) -> Result<ProductsIndexTemplate> {
    let current_page = query.page.unwrap_or(1).max(1);
    let category = query.category.as_deref().map(CategoryId::new);

    let page = state
        .api()
        .list_products(&store, current_page, PRODUCTS_PER_PAGE, category.as_ref())
        .await?;

    Ok(ProductsIndexTemplate {
        store_name: store.name,
        products: page.items.iter().map(ProductCardView::from).collect(),
        current_page,
        has_more_pages: page.has_more(),
        category: query.category,
    })
}

/// Display the product detail page.
#[instrument(skip(state, store), fields(store_id = %store.id))]
pub async fn show(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
    Path(id): Path<String>,
) -> Result<ProductShowTemplate> {
    let product = state
        .api()
        .get_product(&store, &ProductId::new(id))
        .await
        .map_err(|e| match e {
            crate::api::ApiError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Api(other),
        })?;

    Ok(ProductShowTemplate {
        store_name: store.name,
        product: ProductView::from(&product),
    })
}
