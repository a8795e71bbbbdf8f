//! Checkout: turns a cart into a persisted order.
//!
//! The sequence is resolve → validate → upload proof → persist → reconcile
//! stock. Nothing is written before validation passes. When a later step fails
//! the earlier ones are undone: a failed persist removes the uploaded proof,
//! and a strict stock failure deletes the order and the proof as well.

use std::future::Future;

use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use maison_core::{
    Cart, CartLine, DeliveryType, OrderId, OrderLineItem, OrderNumber, subtotal,
};

use super::catalog::Catalog;
use super::stock::{ReconcileError, StockPolicy, StockReconciler};
use super::storage::{Bucket, ObjectStorage, StorageError, StoredObject, Upload};
use crate::db::{OrderRepository, RepositoryError};
use crate::models::{NewOrder, Order, Product};

/// Folder payment proofs are stored under.
pub const PAYMENT_PROOF_FOLDER: &str = "proofs";

/// Attempts at finding an unused order number.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Message shown for failures the shopper cannot fix.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "We could not process your order right now. Please try again.";

/// Errors that stop a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No line of the cart resolves to an existing product.
    #[error("cart is empty")]
    EmptyCart,

    /// A required field is missing.
    #[error("{0}")]
    Validation(String),

    /// A line asks for more than the product has in stock.
    #[error("The selected quantity for {product_name} is no longer available.")]
    Unavailable { product_name: String },

    /// The payment proof could not be stored.
    #[error("payment proof upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Every generated order number collided.
    #[error("no unused order number after {0} attempts")]
    OrderNumberExhausted(usize),
}

impl CheckoutError {
    /// Whether the shopper can fix this by editing the form or cart.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyCart | Self::Validation(_) | Self::Unavailable { .. }
        )
    }

    /// Message safe to show on the checkout page.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_recoverable() {
            self.to_string()
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }
}

impl From<ReconcileError> for CheckoutError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Unavailable { product_name } => Self::Unavailable { product_name },
            ReconcileError::Repository(e) => Self::Repository(e),
        }
    }
}

// =============================================================================
// Order Store
// =============================================================================

/// Persistence needed by checkout.
pub trait OrderStore: Send + Sync {
    /// Insert an order; a taken order number is `RepositoryError::Conflict`.
    fn create(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Remove an order that could not be completed.
    fn delete(&self, id: OrderId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

impl OrderStore for OrderRepository<'_> {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::create(self, order).await
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        OrderRepository::delete(self, id).await
    }
}

/// A fresh order number for today with a random suffix.
#[must_use]
pub fn generate_order_number() -> OrderNumber {
    OrderNumber::new(chrono::Utc::now().date_naive(), rand::rng().random())
}

// =============================================================================
// Cart Resolution
// =============================================================================

/// A cart line joined with its live product.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    /// Position of the line in the cart (for update/remove forms).
    pub index: usize,
    pub line: CartLine,
    pub product: Product,
    pub line_total: Decimal,
}

impl ResolvedLine {
    /// Whether this line can still be fulfilled from current stock.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.product.availability.is_sold_out()
            && i64::from(self.line.quantity) <= i64::from(self.product.stock_qty)
    }
}

/// The cart priced against the live catalog.
#[derive(Debug, Clone, Default)]
pub struct CartSummary {
    pub lines: Vec<ResolvedLine>,
    pub subtotal: Decimal,
}

impl CartSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |sum, l| sum.saturating_add(l.line.quantity))
    }

    /// First line that can no longer be fulfilled.
    #[must_use]
    pub fn first_unavailable(&self) -> Option<&ResolvedLine> {
        self.lines.iter().find(|l| !l.is_available())
    }

    /// Freeze the lines for an order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<OrderLineItem> {
        self.lines
            .iter()
            .map(|l| {
                OrderLineItem::snapshot(
                    l.product.id,
                    &l.product.name,
                    &l.product.sku,
                    &l.line.color,
                    &l.line.length,
                    l.line.quantity,
                    l.product.price,
                )
            })
            .collect()
    }
}

/// Look up every cart line, dropping lines whose product no longer exists.
///
/// # Errors
///
/// Returns `RepositoryError` if a lookup fails.
pub async fn resolve_cart<C: Catalog>(
    catalog: &C,
    cart: &Cart,
) -> Result<CartSummary, RepositoryError> {
    let mut lines = Vec::with_capacity(cart.len());
    for (index, line) in cart.lines().iter().enumerate() {
        let Some(product) = catalog.product_by_id(line.product_id).await? else {
            continue;
        };
        lines.push(ResolvedLine {
            index,
            line: line.clone(),
            line_total: product.price * Decimal::from(line.quantity),
            product,
        });
    }
    let subtotal = lines.iter().map(|l| l.line_total).sum();
    Ok(CartSummary { lines, subtotal })
}

// =============================================================================
// Validation
// =============================================================================

/// Customer details submitted with the checkout form, trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub full_name: String,
    pub phone_number: String,
    pub delivery_type: DeliveryType,
    pub delivery_address: String,
    pub notes: String,
}

impl CheckoutForm {
    #[must_use]
    pub fn new(
        full_name: &str,
        phone_number: &str,
        delivery_type: Option<&str>,
        delivery_address: &str,
        notes: &str,
    ) -> Self {
        Self {
            full_name: full_name.trim().to_string(),
            phone_number: phone_number.trim().to_string(),
            delivery_type: DeliveryType::from_form(delivery_type),
            delivery_address: delivery_address.trim().to_string(),
            notes: notes.trim().to_string(),
        }
    }

    /// Address to store: always empty for pickup.
    #[must_use]
    pub fn stored_address(&self) -> &str {
        if self.delivery_type.requires_address() {
            &self.delivery_address
        } else {
            ""
        }
    }
}

/// Check the priced cart and the form without touching anything.
///
/// # Errors
///
/// `EmptyCart`, `Unavailable` naming the first offending product, or
/// `Validation` for missing contact or address fields, in that order.
pub fn validate(summary: &CartSummary, form: &CheckoutForm) -> Result<(), CheckoutError> {
    if summary.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if let Some(line) = summary.first_unavailable() {
        return Err(CheckoutError::Unavailable {
            product_name: line.product.name.clone(),
        });
    }
    if form.full_name.is_empty() || form.phone_number.is_empty() {
        return Err(CheckoutError::Validation(
            "Full Name and Phone Number are required.".to_string(),
        ));
    }
    if form.delivery_type.requires_address() && form.delivery_address.is_empty() {
        return Err(CheckoutError::Validation(
            "Delivery address is required for delivery orders.".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Placing Orders
// =============================================================================

/// Places orders against a catalog, an order store and object storage.
pub struct Checkout<'a, C, O, S> {
    catalog: &'a C,
    orders: &'a O,
    storage: &'a S,
    policy: StockPolicy,
}

impl<'a, C, O, S> Checkout<'a, C, O, S>
where
    C: Catalog,
    O: OrderStore,
    S: ObjectStorage,
{
    #[must_use]
    pub const fn new(catalog: &'a C, orders: &'a O, storage: &'a S, policy: StockPolicy) -> Self {
        Self {
            catalog,
            orders,
            storage,
            policy,
        }
    }

    /// Validate, persist and reconcile one order.
    ///
    /// On success the caller clears the cart.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. Whenever an error is returned no order remains
    /// persisted and no uploaded proof is left behind.
    #[instrument(skip_all, fields(lines = cart.len(), delivery = %form.delivery_type))]
    pub async fn place_order(
        &self,
        cart: &Cart,
        form: &CheckoutForm,
        proof: Option<&Upload>,
    ) -> Result<Order, CheckoutError> {
        let summary = resolve_cart(self.catalog, cart).await?;
        validate(&summary, form)?;

        let stored_proof = match proof.filter(|upload| !upload.is_empty()) {
            Some(upload) => Some(
                self.storage
                    .upload(Bucket::Payments, PAYMENT_PROOF_FOLDER, upload)
                    .await?,
            ),
            None => None,
        };

        let order = match self.persist(form, &summary, stored_proof.as_ref()).await {
            Ok(order) => order,
            Err(e) => {
                self.discard_proof(stored_proof.as_ref()).await;
                return Err(e);
            }
        };

        let reconciler = StockReconciler::new(self.catalog, self.policy);
        if let Err(e) = reconciler.apply(&order.items).await {
            warn!(order_id = %order.order_number, error = %e, "Rolling back order after stock failure");
            if let Err(delete_err) = self.orders.delete(order.id).await {
                error!(order_id = %order.order_number, error = %delete_err, "Failed to delete rolled-back order");
            }
            self.discard_proof(stored_proof.as_ref()).await;
            return Err(e.into());
        }

        info!(
            order_id = %order.order_number,
            subtotal = %order.subtotal,
            "Order placed"
        );
        Ok(order)
    }

    async fn persist(
        &self,
        form: &CheckoutForm,
        summary: &CartSummary,
        proof: Option<&StoredObject>,
    ) -> Result<Order, CheckoutError> {
        let items = summary.snapshot();
        let mut order = NewOrder {
            order_number: generate_order_number(),
            full_name: form.full_name.clone(),
            phone_number: form.phone_number.clone(),
            delivery_type: form.delivery_type,
            delivery_address: form.stored_address().to_string(),
            notes: form.notes.clone(),
            payment_proof_path: proof.map(|p| p.public_url.clone()).unwrap_or_default(),
            subtotal: subtotal(&items),
            items,
        };

        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            match self.orders.create(&order).await {
                Ok(created) => return Ok(created),
                Err(RepositoryError::Conflict(_)) => {
                    warn!(attempt, order_id = %order.order_number, "Order number collision");
                    order.order_number = generate_order_number();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CheckoutError::OrderNumberExhausted(
            MAX_ORDER_NUMBER_ATTEMPTS,
        ))
    }

    async fn discard_proof(&self, proof: Option<&StoredObject>) {
        let Some(proof) = proof else {
            return;
        };
        if let Err(e) = self.storage.remove(Bucket::Payments, &proof.path).await {
            error!(path = %proof.path, error = %e, "Failed to remove orphaned payment proof");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Bytes;
    use maison_core::{Availability, OrderStatus, ProductId};

    use super::*;
    use crate::models::product::fixtures::product;
    use crate::services::testing::{MemoryCatalog, MemoryOrders, MemoryStorage};

    fn cart(lines: &[(i32, u32)]) -> Cart {
        Cart::from_lines(
            lines
                .iter()
                .map(|&(id, qty)| CartLine::new(ProductId::new(id), qty, "Black", "18")),
        )
    }

    fn pickup_form() -> CheckoutForm {
        CheckoutForm::new(" Ama Mensah ", "0241234567", None, "", "")
    }

    fn proof() -> Upload {
        Upload {
            file_name: "momo.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn test_form_trims_and_defaults_to_pickup() {
        let form = CheckoutForm::new("  Ama ", " 024 ", Some("courier"), " Osu ", " ");
        assert_eq!(form.full_name, "Ama");
        assert_eq!(form.phone_number, "024");
        assert_eq!(form.delivery_type, DeliveryType::Pickup);
        assert_eq!(form.stored_address(), "");
        assert_eq!(form.notes, "");
    }

    #[test]
    fn test_user_message_hides_internal_errors() {
        let err = CheckoutError::OrderNumberExhausted(5);
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        let err = CheckoutError::Unavailable {
            product_name: "Bob".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "The selected quantity for Bob is no longer available."
        );
    }

    #[tokio::test]
    async fn test_successful_checkout_reduces_stock() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let order = checkout
            .place_order(&cart(&[(1, 2)]), &pickup_form(), None)
            .await
            .unwrap();

        assert_eq!(order.subtotal, Decimal::from(200));
        assert_eq!(order.subtotal, subtotal(&order.items));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.full_name, "Ama Mensah");
        assert!(order.order_number.starts_with("MJ-"));
        assert_eq!(order.payment_proof_path, "");

        let after = catalog.get(1).unwrap();
        assert_eq!(after.stock_qty, 3);
        assert_eq!(after.availability, Availability::InStock);
        assert_eq!(orders.all().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_creates_nothing() {
        let catalog = MemoryCatalog::new([product(1, 100, 1)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let err = checkout
            .place_order(&cart(&[(1, 2)]), &pickup_form(), Some(&proof()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Unavailable { ref product_name } if product_name == "Wig 1"
        ));
        assert!(orders.all().is_empty());
        assert!(storage.stored().is_empty());
        assert_eq!(catalog.get(1).unwrap().stock_qty, 1);
    }

    #[tokio::test]
    async fn test_empty_resolved_cart_is_rejected() {
        let catalog = MemoryCatalog::new([]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let err = checkout
            .place_order(&cart(&[(7, 1)]), &pickup_form(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        let err = checkout
            .place_order(&Cart::new(), &pickup_form(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(orders.all().is_empty());
    }

    #[tokio::test]
    async fn test_missing_contact_fields() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let form = CheckoutForm::new("Ama", "   ", None, "", "");
        let err = checkout
            .place_order(&cart(&[(1, 1)]), &form, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Full Name and Phone Number are required.");
        assert!(orders.all().is_empty());
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
    }

    #[tokio::test]
    async fn test_delivery_requires_address() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let form = CheckoutForm::new("Ama", "024", Some("Delivery"), "  ", "");
        let err = checkout
            .place_order(&cart(&[(1, 1)]), &form, None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Delivery address is required for delivery orders."
        );

        let form = CheckoutForm::new("Ama", "024", Some("Delivery"), "East Legon", "");
        let order = checkout
            .place_order(&cart(&[(1, 1)]), &form, None)
            .await
            .unwrap();
        assert_eq!(order.delivery_type, DeliveryType::Delivery);
        assert_eq!(order.delivery_address, "East Legon");
    }

    #[tokio::test]
    async fn test_pickup_discards_address() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let form = CheckoutForm::new("Ama", "024", Some("Pickup"), "East Legon", "");
        let order = checkout
            .place_order(&cart(&[(1, 1)]), &form, None)
            .await
            .unwrap();
        assert_eq!(order.delivery_address, "");
    }

    #[tokio::test]
    async fn test_proof_uploaded_and_linked() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let order = checkout
            .place_order(&cart(&[(1, 1)]), &pickup_form(), Some(&proof()))
            .await
            .unwrap();

        let stored = storage.stored();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].starts_with("proofs/"));
        assert!(order.payment_proof_path.ends_with(&stored[0]));
    }

    #[tokio::test]
    async fn test_empty_proof_file_is_ignored() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let empty = Upload {
            bytes: Bytes::new(),
            ..proof()
        };
        let order = checkout
            .place_order(&cart(&[(1, 1)]), &pickup_form(), Some(&empty))
            .await
            .unwrap();
        assert_eq!(order.payment_proof_path, "");
        assert!(storage.stored().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_creates_no_order() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::failing();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let err = checkout
            .place_order(&cart(&[(1, 1)]), &pickup_form(), Some(&proof()))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Upload(_)));
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(orders.all().is_empty());
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
    }

    #[tokio::test]
    async fn test_order_number_collision_retries() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::with_conflicts(3);
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        checkout
            .place_order(&cart(&[(1, 1)]), &pickup_form(), None)
            .await
            .unwrap();
        assert_eq!(orders.all().len(), 1);
    }

    #[tokio::test]
    async fn test_order_number_exhaustion_cleans_up_proof() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::with_conflicts(MAX_ORDER_NUMBER_ATTEMPTS);
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let err = checkout
            .place_order(&cart(&[(1, 1)]), &pickup_form(), Some(&proof()))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderNumberExhausted(5)));
        assert!(orders.all().is_empty());
        assert!(storage.stored().is_empty());
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
    }

    #[tokio::test]
    async fn test_strict_stock_race_rolls_back() {
        // Stock drops between validation and reconciliation.
        let catalog = MemoryCatalog::new([product(1, 100, 5), product(2, 80, 2)]);
        catalog.shrink_on_reduce(2, 1);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let err = checkout
            .place_order(&cart(&[(1, 2), (2, 2)]), &pickup_form(), Some(&proof()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Unavailable { ref product_name } if product_name == "Wig 2"
        ));
        assert!(orders.all().is_empty());
        assert!(storage.stored().is_empty());
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
        assert_eq!(catalog.get(2).unwrap().stock_qty, 1);
    }

    #[tokio::test]
    async fn test_best_effort_stock_race_keeps_order() {
        let catalog = MemoryCatalog::new([product(1, 100, 5), product(2, 80, 2)]);
        catalog.shrink_on_reduce(2, 1);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::BestEffort);

        let order = checkout
            .place_order(&cart(&[(1, 2), (2, 2)]), &pickup_form(), None)
            .await
            .unwrap();

        assert_eq!(order.subtotal, Decimal::from(360));
        assert_eq!(orders.all().len(), 1);
        assert_eq!(catalog.get(1).unwrap().stock_qty, 3);
        let two = catalog.get(2).unwrap();
        assert_eq!(two.stock_qty, 0);
        assert_eq!(two.availability, Availability::SoldOut);
    }

    #[tokio::test]
    async fn test_resolve_cart_keeps_indexes() {
        let catalog = MemoryCatalog::new([product(2, 50, 5)]);
        let summary = resolve_cart(&catalog, &cart(&[(1, 1), (2, 3)]))
            .await
            .unwrap();
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.lines[0].index, 1);
        assert_eq!(summary.subtotal, Decimal::from(150));
        assert_eq!(summary.item_count(), 3);
    }

    #[test]
    fn test_generated_order_number_shape() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "MJ");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
