//! Admin dashboard: every product and every order on one page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use maison_core::{Availability, Money, OrderStatus};
use tracing::instrument;

use super::AdminPage;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Order, Product};
use crate::routes::SelectOption;
use crate::state::AppState;

/// A product row.
#[derive(Clone)]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub category: String,
    pub price: String,
    pub stock_qty: i32,
    pub availability: Availability,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            sku: product.sku.clone(),
            category: product.category.clone(),
            price: product.money().to_string(),
            stock_qty: product.stock_qty,
            availability: product.availability,
        }
    }
}

/// An order row with its status selector.
#[derive(Clone)]
pub struct OrderRow {
    pub id: i32,
    pub order_number: String,
    pub full_name: String,
    pub phone_number: String,
    pub delivery: String,
    pub item_count: u32,
    pub subtotal: String,
    pub payment_proof: Option<String>,
    pub created_at: String,
    pub statuses: Vec<SelectOption>,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        let current = order.status.as_str();
        let delivery = if order.delivery_address.is_empty() {
            order.delivery_type.to_string()
        } else {
            format!("{}: {}", order.delivery_type, order.delivery_address)
        };
        Self {
            id: order.id.as_i32(),
            order_number: order.order_number.clone(),
            full_name: order.full_name.clone(),
            phone_number: order.phone_number.clone(),
            delivery,
            item_count: order.item_count(),
            subtotal: Money::ghs(order.subtotal).to_string(),
            payment_proof: (!order.payment_proof_path.is_empty())
                .then(|| order.payment_proof_path.clone()),
            created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            statuses: OrderStatus::ALL
                .iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), current))
                .collect(),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: AdminPage,
    pub products: Vec<ProductRow>,
    pub orders: Vec<OrderRow>,
}

/// Display the dashboard.
#[instrument(skip_all)]
pub async fn index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let (product_repo, order_repo) = (state.products(), state.orders());
    let (products, orders) = tokio::try_join!(product_repo.list_admin(), order_repo.list())?;

    Ok(DashboardTemplate {
        page: AdminPage::new(&state, "Admin Dashboard", true),
        products: products.iter().map(ProductRow::from).collect(),
        orders: orders.iter().map(OrderRow::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::fixtures;

    #[test]
    fn test_product_row() {
        let row = ProductRow::from(&fixtures::product(7, 950, 1));
        assert_eq!(row.id, 7);
        assert_eq!(row.price, "GH₵950.00");
        assert_eq!(row.availability, Availability::LowStock);
    }
}
