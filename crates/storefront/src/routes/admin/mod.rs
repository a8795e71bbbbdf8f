//! Admin panel route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                        - Dashboard (products and orders)
//! GET  /admin/login                  - Login page
//! POST /admin/login                  - Login action (rate limited)
//! POST /admin/logout                 - Logout action
//!
//! # Products
//! GET  /admin/products/new           - New product form
//! POST /admin/products               - Create product (multipart)
//! GET  /admin/products/{id}/edit     - Edit product form
//! POST /admin/products/{id}          - Update product (multipart)
//! POST /admin/products/{id}/delete   - Delete product
//!
//! # Orders
//! POST /admin/orders/{id}/status     - Change order status
//! ```
//!
//! Everything except the login page requires [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::admin_login_rate_limiter;
use crate::state::AppState;

/// Largest product form submission (up to 8 images, a video and a 3D model).
const PRODUCT_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// Layout data for admin pages.
#[derive(Clone)]
pub struct AdminPage {
    pub brand_name: String,
    pub title: String,
    /// Whether to show the logout button.
    pub signed_in: bool,
}

impl AdminPage {
    /// An admin page titled `"{title} | {brand}"`.
    #[must_use]
    pub fn new(state: &AppState, title: &str, signed_in: bool) -> Self {
        let brand_name = state.config().brand.name.clone();
        Self {
            title: format!("{title} | {brand_name}"),
            brand_name,
            signed_in,
        }
    }
}

/// Create the admin routes router, nested under `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/login", get(auth::login_page))
        .route(
            "/login",
            post(auth::login).layer(admin_login_rate_limiter()),
        )
        .route("/logout", post(auth::logout))
        .route("/products/new", get(products::new_product))
        .route(
            "/products",
            post(products::create).layer(DefaultBodyLimit::max(PRODUCT_BODY_LIMIT)),
        )
        .route("/products/{id}/edit", get(products::edit))
        .route(
            "/products/{id}",
            post(products::update).layer(DefaultBodyLimit::max(PRODUCT_BODY_LIMIT)),
        )
        .route("/products/{id}/delete", post(products::delete))
        .route("/orders/{id}/status", post(orders::update_status))
}
