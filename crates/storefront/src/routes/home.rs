//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::{Page, ProductCard};
use crate::error::AppError;
use crate::filters;
use crate::services::CurrentCart;
use crate::state::AppState;

/// Number of featured products on the home page.
const FEATURED_LIMIT: i64 = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub featured: Vec<ProductCard>,
    pub categories: Vec<String>,
}

/// Display the home page.
#[instrument(skip(state, cart))]
pub async fn home(
    State(state): State<AppState>,
    CurrentCart(cart): CurrentCart,
) -> Result<impl IntoResponse, AppError> {
    let featured = state.products().list_featured(FEATURED_LIMIT).await?;

    let brand = state.config().brand.clone();
    let page = Page {
        title: format!("{} | {}", brand.name, brand.tagline),
        meta_description: format!("{} Premium wigs in {}.", brand.tagline, brand.location),
        cart_count: cart.item_count(),
        brand,
    };

    Ok(HomeTemplate {
        categories: page.brand.categories.clone(),
        featured: featured.iter().map(ProductCard::from).collect(),
        page,
    })
}
