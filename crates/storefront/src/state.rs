//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{OrderRepository, ProductRepository};
use crate::services::cart_token::InvalidCartKey;
use crate::services::{CartCodec, StorageError, SupabaseStorage};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storage client: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    CartKey(#[from] InvalidCartKey),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    storage: SupabaseStorage,
    cart_codec: CartCodec,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage client or cart codec cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let storage = SupabaseStorage::new(&config.storage)?;
        let cart_codec = CartCodec::new(config.session_secret.expose_secret().as_bytes())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
                cart_codec,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Object storage for product media and payment proofs.
    #[must_use]
    pub fn storage(&self) -> &SupabaseStorage {
        &self.inner.storage
    }

    #[must_use]
    pub fn cart_codec(&self) -> &CartCodec {
        &self.inner.cart_codec
    }

    #[must_use]
    pub fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.inner.pool)
    }

    #[must_use]
    pub fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.inner.pool)
    }
}
