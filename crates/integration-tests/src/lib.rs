//! Integration tests for Maison.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p maison-integration-tests
//! ```
//!
//! The router tests run in-process against [`maison_storefront::app`] with a
//! lazily connected pool, so routes that never touch the database work
//! without `PostgreSQL`. Tests that need a database are `#[ignore]`d and read
//! `TEST_DATABASE_URL`.
//!
//! # Test Categories
//!
//! - `cart` - Cart rules and the signed cart cookie
//! - `repositories` - Stock locking, filtered listing and order numbers
//!   against `PostgreSQL` (ignored by default)
//! - `storefront_routes` - Public pages, headers and admin gating

use axum::Router;
use axum::body::Body;
use axum::http::Response;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use url::Url;

use maison_storefront::config::{BrandConfig, StorageConfig, StorefrontConfig};
use maison_storefront::models::NewProduct;
use maison_storefront::services::StockPolicy;
use maison_storefront::state::AppState;

/// Signing secret shared by the test app and tests that forge cookies.
pub const TEST_SESSION_SECRET: &str = "k9Vq2xLm7Rt4Zp8Wn3Bc6Yh1Jd5Fs0Ga";

/// Public URL the test app believes it is served from.
pub const TEST_BASE_URL: &str = "http://localhost:3000";

/// Database URL for tests, from `TEST_DATABASE_URL` if set.
#[must_use]
pub fn database_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/maison_test".to_string())
}

/// Configuration that passes validation without any environment.
///
/// # Panics
///
/// Panics if the hard-coded URLs fail to parse.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from(database_url()),
        host: "127.0.0.1".parse().expect("valid IP"),
        port: 3000,
        base_url: TEST_BASE_URL.to_string(),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        admin_password: SecretString::from("Tr0pical-Kiwi-88"),
        storage: StorageConfig {
            url: Url::parse("https://proj.supabase.co").expect("valid URL"),
            secret_key: SecretString::from("sb_9f8e7d6c5b4a"),
            products_bucket: "products".to_string(),
            payments_bucket: "payments".to_string(),
        },
        stock_policy: StockPolicy::Strict,
        page_size: 9,
        brand: BrandConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Application state over a pool that connects on first use.
///
/// Must be called inside a Tokio runtime.
///
/// # Panics
///
/// Panics if the database URL cannot be parsed or the state fails to build.
#[must_use]
pub fn test_state() -> AppState {
    let pool = PgPoolOptions::new()
        .connect_lazy(&database_url())
        .expect("Failed to create lazy pool");
    AppState::new(test_config(), pool).expect("Failed to build application state")
}

/// The full router with every middleware layer.
#[must_use]
pub fn test_app() -> Router {
    maison_storefront::app(test_state())
}

/// Read a response body as UTF-8 text.
///
/// # Panics
///
/// Panics if the body cannot be read.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Connect to `TEST_DATABASE_URL` and apply the storefront migrations.
///
/// # Panics
///
/// Panics if the database is unreachable or a migration fails.
pub async fn migrated_pool() -> PgPool {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url())
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// A suffix that keeps rows from separate test runs apart.
#[must_use]
pub fn unique_suffix() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{nanos:x}")
}

/// A product in its own category, so listings can be scoped to one test.
#[must_use]
pub fn sample_product(category: &str, name: &str, price: i64, stock_qty: i32) -> NewProduct {
    let slug = format!("{}-{}", name.to_lowercase().replace(' ', "-"), unique_suffix());
    NewProduct {
        name: name.to_string(),
        sku: format!("SKU-{slug}"),
        slug,
        description: String::new(),
        category: category.to_string(),
        price: Decimal::from(price),
        stock_qty,
        low_stock_threshold: 2,
        lace_type: "Closure".to_string(),
        density: "180%".to_string(),
        cap_size: "Medium".to_string(),
        colors: vec!["Natural Black".to_string(), "Burgundy".to_string()],
        lengths: vec!["18".to_string(), "22".to_string()],
        media: Vec::new(),
    }
}
