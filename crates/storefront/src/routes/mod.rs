//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (featured products, categories)
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Catalog
//! GET  /shop                   - Filtered, paginated product listing
//! GET  /product/{slug}         - Product detail
//!
//! # Cart (signed cookie, no server state)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a variant
//! POST /cart/update            - Change a line's quantity
//! POST /cart/remove            - Remove a line
//!
//! # Checkout
//! GET  /checkout               - Checkout form
//! POST /checkout               - Place order (multipart, rate limited)
//! GET  /order/{orderId}        - Order confirmation
//!
//! # SEO
//! GET  /sitemap.xml            - Sitemap
//! GET  /robots.txt             - Robots rules
//!
//! # Admin (session, see `admin`)
//! /admin/...
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod multipart;
pub mod orders;
pub mod seo;
pub mod shop;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use maison_core::{Availability, MediaItem};

use crate::config::BrandConfig;
use crate::error::ErrorPageTemplate;
use crate::middleware::checkout_rate_limiter;
use crate::models::Product;
use crate::state::AppState;

/// Largest checkout submission (payment proof screenshot included).
const CHECKOUT_BODY_LIMIT: usize = 10 * 1024 * 1024;

// =============================================================================
// Shared View Data
// =============================================================================

/// Data every storefront page needs for its layout.
#[derive(Clone)]
pub struct Page {
    pub brand: BrandConfig,
    pub title: String,
    pub meta_description: String,
    /// Cart badge count.
    pub cart_count: u32,
}

impl Page {
    /// A page titled `"{title} | {brand}"`.
    #[must_use]
    pub fn new(state: &AppState, title: &str, meta_description: String, cart_count: u32) -> Self {
        let brand = state.config().brand.clone();
        Self {
            title: format!("{title} | {}", brand.name),
            brand,
            meta_description,
            cart_count,
        }
    }
}

/// Product summary shown in listings.
#[derive(Clone)]
pub struct ProductCard {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub availability: Availability,
    pub image: Option<MediaItem>,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.money().to_string(),
            availability: product.availability,
            image: product.primary_image().cloned(),
        }
    }
}

/// An `<option>` in a filter or form select.
#[derive(Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: &str, label: &str, current: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected: value == current,
        }
    }
}

/// `https://wa.me/{digits}?text={message}` for a WhatsApp number.
#[must_use]
pub fn whatsapp_url(number: &str, message: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(message)
    )
}

// =============================================================================
// Routers
// =============================================================================

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
///
/// Only the submission is rate limited; viewing the form is not.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/checkout",
            post(checkout::submit)
                .layer::<_, std::convert::Infallible>(checkout_rate_limiter())
                .layer(DefaultBodyLimit::max(CHECKOUT_BODY_LIMIT)),
        )
        .route("/checkout", get(checkout::show))
        .route("/order/{order_id}", get(orders::confirmation))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/shop", get(shop::index))
        .route("/product/{slug}", get(shop::show))
        .nest("/cart", cart_routes())
        .merge(checkout_routes())
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
        .nest("/admin", admin::routes())
        .fallback(not_found)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, ErrorPageTemplate::not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_url_strips_non_digits_and_encodes() {
        let url = whatsapp_url("+233 50-000 0000", "Hi there\nOrder: MJ-1");
        assert_eq!(
            url,
            "https://wa.me/233500000000?text=Hi%20there%0AOrder%3A%20MJ-1"
        );
    }

    #[test]
    fn test_select_option_marks_current() {
        assert!(SelectOption::new("Curly", "Curly", "Curly").selected);
        assert!(!SelectOption::new("Bob", "Bob", "Curly").selected);
    }
}
