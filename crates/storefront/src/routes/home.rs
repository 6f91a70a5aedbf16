//! Store home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::api::types::CategoryDto;
use crate::error::Result;
use crate::filters;
use crate::middleware::StoreContext;
use crate::routes::products::ProductCardView;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_PRODUCTS: u32 = 8;

/// Category display data for templates.
#[derive(Clone)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<&CategoryDto> for CategoryView {
    fn from(category: &CategoryDto) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub store_name: String,
    pub store_description: Option<String>,
    pub categories: Vec<CategoryView>,
    pub products: Vec<ProductCardView>,
}

/// Display the store home page.
#[instrument(skip(state, store), fields(store_id = %store.id))]
pub async fn home(
    State(state): State<AppState>,
    StoreContext(store): StoreContext,
) -> Result<HomeTemplate> {
    let categories = state
        .api()
        .list_categories(&store, 1)
        .await
        .map_or_else(
            |e| {
                tracing::warn!("Failed to fetch categories: {e}");
                Vec::new()
            },
            |page| page.items.iter().map(CategoryView::from).collect(),
        );

    let products = state
        .api()
        .list_products(&store, 1, FEATURED_PRODUCTS, None)
        .await?
        .items
        .iter()
        .map(ProductCardView::from)
        .collect();

    Ok(HomeTemplate {
        store_name: store.name,
        store_description: store.description,
        categories,
        products,
    })
}
