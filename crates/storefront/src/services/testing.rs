//! In-memory stand-ins for the catalog, order store and object storage.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use maison_core::{Availability, OrderId, OrderStatus, ProductId};

use super::catalog::{Catalog, Shortfall, StockChange, deduct, replenish};
use super::checkout::OrderStore;
use super::storage::{Bucket, ObjectStorage, StorageError, StoredObject, Upload, object_path};
use crate::config::tests::test_config;
use crate::db::RepositoryError;
use crate::models::{NewOrder, Order, Product};
use crate::state::AppState;

/// Application state over a pool that never connects unless queried.
///
/// # Panics
///
/// Panics if the test configuration cannot build a state.
#[allow(clippy::unwrap_used)]
pub fn test_state() -> AppState {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy(config.database_url.expose_secret())
        .unwrap();
    AppState::new(config, pool).unwrap()
}

#[derive(Default)]
pub struct MemoryCatalog {
    products: Mutex<HashMap<i32, Product>>,
    /// Stock to force onto a product right before it is reduced.
    races: Mutex<HashMap<i32, i32>>,
}

impl MemoryCatalog {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: Mutex::new(
                products
                    .into_iter()
                    .map(|p| (p.id.as_i32(), p))
                    .collect(),
            ),
            races: Mutex::default(),
        }
    }

    pub fn get(&self, id: i32) -> Option<Product> {
        self.products.lock().ok()?.get(&id).cloned()
    }

    /// Simulate another checkout taking stock between validation and reduction.
    pub fn shrink_on_reduce(&self, id: i32, stock_qty: i32) {
        if let Ok(mut races) = self.races.lock() {
            races.insert(id, stock_qty);
        }
    }

    fn write(&self, id: ProductId, next: impl FnOnce(i32) -> Result<i32, i32>) -> StockChange {
        let race = self
            .races
            .lock()
            .ok()
            .and_then(|mut r| r.remove(&id.as_i32()));
        let Ok(mut products) = self.products.lock() else {
            return StockChange::NotFound;
        };
        let Some(product) = products.get_mut(&id.as_i32()) else {
            return StockChange::NotFound;
        };
        if let Some(stock_qty) = race {
            product.stock_qty = stock_qty;
        }
        match next(product.stock_qty) {
            Ok(stock_qty) => {
                product.stock_qty = stock_qty;
                product.availability =
                    Availability::for_stock(stock_qty, product.low_stock_threshold);
                StockChange::Applied(product.clone())
            }
            Err(available) => StockChange::Insufficient { available },
        }
    }
}

impl Catalog for MemoryCatalog {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get(id.as_i32()))
    }

    async fn reduce_stock(
        &self,
        id: ProductId,
        quantity: u32,
        shortfall: Shortfall,
    ) -> Result<StockChange, RepositoryError> {
        Ok(self.write(id, |stock| deduct(stock, quantity, shortfall)))
    }

    async fn restock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>, RepositoryError> {
        match self.write(id, |stock| Ok(replenish(stock, quantity))) {
            StockChange::Applied(product) => Ok(Some(product)),
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<Vec<Order>>,
    conflicts: AtomicUsize,
    next_id: AtomicI32,
}

impl MemoryOrders {
    /// Reject the first `n` inserts as order-number collisions.
    pub fn with_conflicts(n: usize) -> Self {
        Self {
            conflicts: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub fn all(&self) -> Vec<Order> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl OrderStore for MemoryOrders {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let pending = self.conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict("order number already exists".to_string()));
        }

        let mut orders = self
            .orders
            .lock()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        if orders
            .iter()
            .any(|o| o.order_number == order.order_number.as_str())
        {
            return Err(RepositoryError::Conflict("order number already exists".to_string()));
        }

        let created = Order {
            id: OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            order_number: order.order_number.to_string(),
            full_name: order.full_name.clone(),
            phone_number: order.phone_number.clone(),
            delivery_type: order.delivery_type,
            delivery_address: order.delivery_address.clone(),
            notes: order.notes.clone(),
            payment_proof_path: order.payment_proof_path.clone(),
            subtotal: order.subtotal,
            status: OrderStatus::New,
            items: order.items.clone(),
            created_at: Utc::now(),
        };
        orders.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        if let Ok(mut orders) = self.orders.lock() {
            orders.retain(|o| o.id != id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryStorage {
    /// Storage whose uploads always fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Paths currently stored.
    pub fn stored(&self) -> Vec<String> {
        self.objects.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: Bucket,
        folder: &str,
        upload: &Upload,
    ) -> Result<StoredObject, StorageError> {
        if self.fail {
            return Err(StorageError::Api {
                status: 503,
                message: "storage unavailable".to_string(),
            });
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| StorageError::Config(e.to_string()))?;
        let nonce = u8::try_from(objects.len() % 256).unwrap_or(0);
        let path = object_path(folder, &upload.file_name, Utc::now().timestamp_millis(), [nonce; 6]);
        objects.push(path.clone());
        Ok(StoredObject {
            public_url: format!("https://storage.test/{bucket:?}/{path}"),
            path,
        })
    }

    async fn remove(&self, _bucket: Bucket, path: &str) -> Result<(), StorageError> {
        if let Ok(mut objects) = self.objects.lock() {
            objects.retain(|p| p != path);
        }
        Ok(())
    }
}
