//! Order confirmation page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use maison_core::{Money, OrderLineItem};
use tracing::instrument;

use super::{Page, whatsapp_url};
use crate::config::BrandConfig;
use crate::error::AppError;
use crate::filters;
use crate::models::Order;
use crate::services::CurrentCart;
use crate::state::AppState;

/// An order line for the confirmation page.
#[derive(Clone)]
pub struct OrderLineView {
    pub product_name: String,
    pub sku: String,
    pub color: String,
    pub length: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderLineItem> for OrderLineView {
    fn from(item: &OrderLineItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            sku: item.sku.clone(),
            color: item.color.clone(),
            length: item.length.clone(),
            quantity: item.quantity,
            unit_price: Money::ghs(item.unit_price).to_string(),
            line_total: Money::ghs(item.line_total).to_string(),
        }
    }
}

/// Confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: Page,
    pub order: Order,
    pub items: Vec<OrderLineView>,
    pub subtotal: String,
    pub whatsapp_link: String,
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

/// The order summary a customer sends to the shop on WhatsApp.
#[must_use]
pub fn whatsapp_order_message(brand_name: &str, order: &Order) -> String {
    let mut lines = vec![
        format!("Hello {brand_name}, I have placed an order."),
        format!("Order ID: {}", order.order_number),
        format!("Name: {}", order.full_name),
        format!("Phone: {}", order.phone_number),
        format!("Delivery Type: {}", order.delivery_type),
        format!("Delivery Address: {}", or_dash(&order.delivery_address)),
        format!("Notes: {}", or_dash(&order.notes)),
        "Items:".to_string(),
    ];
    lines.extend(order.items.iter().enumerate().map(|(i, item)| {
        format!(
            "{}. {} | Color: {} | Length: {}\" | Qty: {} | {}",
            i + 1,
            item.product_name,
            item.color,
            item.length,
            item.quantity,
            Money::ghs(item.unit_price)
        )
    }));
    lines.push(format!("Subtotal: {}", order.subtotal_money()));
    if !order.payment_proof_path.is_empty() {
        lines.push(format!("Payment Proof: {}", order.payment_proof_path));
    }
    lines.join("\n")
}

fn order_whatsapp_link(brand: &BrandConfig, order: &Order) -> String {
    whatsapp_url(
        &brand.whatsapp_number,
        &whatsapp_order_message(&brand.name, order),
    )
}

/// Display an order by its customer-facing order number.
#[instrument(skip(state, cart))]
pub async fn confirmation(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    CurrentCart(cart): CurrentCart,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .orders()
        .get_by_order_number(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    let page = Page::new(
        &state,
        &format!("Order {}", order.order_number),
        format!("Order confirmation for {}.", order.order_number),
        cart.item_count(),
    );

    Ok(ConfirmationTemplate {
        page,
        items: order.items.iter().map(OrderLineView::from).collect(),
        subtotal: order.subtotal_money().to_string(),
        whatsapp_link: order_whatsapp_link(&state.config().brand, &order),
        order,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use maison_core::{DeliveryType, OrderId, OrderStatus, ProductId};
    use rust_decimal::Decimal;

    use super::*;

    fn order(proof: &str, address: &str) -> Order {
        let item = OrderLineItem::snapshot(
            ProductId::new(1),
            "Silky Straight",
            "MJ-001",
            "Black",
            "18",
            2,
            Decimal::new(100, 0),
        );
        Order {
            id: OrderId::new(1),
            order_number: "MJ-20260412-3FA9".to_string(),
            full_name: "Ama Mensah".to_string(),
            phone_number: "0241234567".to_string(),
            delivery_type: if address.is_empty() {
                DeliveryType::Pickup
            } else {
                DeliveryType::Delivery
            },
            delivery_address: address.to_string(),
            notes: String::new(),
            payment_proof_path: proof.to_string(),
            subtotal: item.line_total,
            status: OrderStatus::New,
            items: vec![item],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_whatsapp_message_lines() {
        let message = whatsapp_order_message("MJ Hair Empire", &order("", ""));
        let lines: Vec<_> = message.lines().collect();
        assert_eq!(
            lines,
            [
                "Hello MJ Hair Empire, I have placed an order.",
                "Order ID: MJ-20260412-3FA9",
                "Name: Ama Mensah",
                "Phone: 0241234567",
                "Delivery Type: Pickup",
                "Delivery Address: -",
                "Notes: -",
                "Items:",
                "1. Silky Straight | Color: Black | Length: 18\" | Qty: 2 | GH₵100.00",
                "Subtotal: GH₵200.00",
            ]
        );
    }

    #[test]
    fn test_whatsapp_message_includes_proof_and_address() {
        let message = whatsapp_order_message(
            "MJ",
            &order("https://proj.supabase.co/storage/v1/object/public/payments/proofs/a.png", "Osu"),
        );
        assert!(message.contains("Delivery Type: Delivery"));
        assert!(message.contains("Delivery Address: Osu"));
        assert!(message.ends_with("Payment Proof: https://proj.supabase.co/storage/v1/object/public/payments/proofs/a.png"));
    }
}
