//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! maison migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time:
//! ```text
//! migrations/
//! ├── 20260301000001_create_products.sql
//! ├── 20260301000002_create_orders.sql
//! └── 20260301000003_create_sessions.sql
//! ```

use tracing::info;

use maison_storefront::db::create_pool;

use super::{CommandError, database_url};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to storefront database...");
    let pool = create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Storefront migrations complete!");
    Ok(())
}
