//! Cart route handlers.
//!
//! The cart lives in the signed `cart_payload` cookie. Every mutation decodes
//! it, applies the change against live stock, and writes the cookie back
//! before redirecting to `/cart`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use maison_core::{Cart, CartLine, MediaItem, Money, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::Page;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::services::CurrentCart;
use crate::services::checkout::{CartSummary, resolve_cart};
use crate::state::AppState;

/// A priced cart line for templates.
#[derive(Clone)]
pub struct LineView {
    /// Index in the cart cookie, posted back by update/remove forms.
    pub index: usize,
    pub slug: String,
    pub name: String,
    pub color: String,
    pub length: String,
    pub quantity: u32,
    pub max_quantity: i32,
    pub unit_price: String,
    pub line_total: String,
    pub image: Option<MediaItem>,
    pub available: bool,
}

/// Template rows for a priced cart.
#[must_use]
pub fn line_views(summary: &CartSummary) -> Vec<LineView> {
    summary
        .lines
        .iter()
        .map(|resolved| LineView {
            index: resolved.index,
            slug: resolved.product.slug.clone(),
            name: resolved.product.name.clone(),
            color: resolved.line.color.clone(),
            length: resolved.line.length.clone(),
            quantity: resolved.line.quantity,
            max_quantity: resolved.product.stock_qty.max(1),
            unit_price: resolved.product.money().to_string(),
            line_total: Money::ghs(resolved.line_total).to_string(),
            image: resolved.product.primary_image().cloned(),
            available: resolved.is_available(),
        })
        .collect()
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/cart.html")]
pub struct CartTemplate {
    pub page: Page,
    pub lines: Vec<LineView>,
    pub subtotal: String,
}

/// Display the cart page.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    CurrentCart(cart): CurrentCart,
) -> Result<impl IntoResponse, AppError> {
    let summary = resolve_cart(&state.products(), &cart).await?;

    let brand_name = state.config().brand.name.clone();
    let page = Page::new(
        &state,
        "Cart",
        format!("Review your cart at {brand_name}."),
        summary.item_count(),
    );

    Ok(CartTemplate {
        page,
        lines: line_views(&summary),
        subtotal: Money::ghs(summary.subtotal).to_string(),
    })
}

/// Write `cart` back to the cookie and go to `to`.
fn store_and_redirect(state: &AppState, cart: &Cart, to: &str) -> Response {
    let cookie = state.cart_codec().set_cookie(cart, state.config().is_https());
    (cookie, Redirect::to(to)).into_response()
}

// =============================================================================
// Mutations
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<String>,
    pub color: Option<String>,
    pub length: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub key: String,
    pub quantity: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub key: String,
}

/// Parse a submitted quantity; anything unparseable or negative is `default`.
fn parse_quantity(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map_or(default, |q| u32::try_from(q.max(0)).unwrap_or(u32::MAX))
}

fn parse_index(key: &str) -> Option<usize> {
    key.trim().parse::<usize>().ok()
}

fn chosen<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(fallback)
}

/// Add a product variant to the cart.
///
/// Unknown products go back to the shop; sold-out products back to their page.
#[instrument(skip(state, cart))]
pub async fn add(
    State(state): State<AppState>,
    CurrentCart(mut cart): CurrentCart,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let Ok(product_id) = form.product_id.parse::<ProductId>() else {
        return Ok(Redirect::to("/shop").into_response());
    };
    let Some(product) = state.products().get_by_id(product_id).await? else {
        return Ok(Redirect::to("/shop").into_response());
    };
    if !product.is_purchasable() {
        return Ok(Redirect::to(&format!("/product/{}", product.slug)).into_response());
    }

    let line = CartLine::new(
        product.id,
        parse_quantity(form.quantity.as_deref(), 1),
        chosen(form.color.as_deref(), product.default_color()),
        chosen(form.length.as_deref(), product.default_length()),
    );
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product.id.to_string().as_str()),
            ("color", line.color.as_str()),
        ],
    );
    cart.add(line, product.stock_qty);

    Ok(store_and_redirect(&state, &cart, "/cart"))
}

/// Change the quantity of a cart line. Zero removes it.
#[instrument(skip(state, cart))]
pub async fn update(
    State(state): State<AppState>,
    CurrentCart(mut cart): CurrentCart,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    if let Some(index) = parse_index(&form.key)
        && let Some(line) = cart.lines().get(index)
    {
        let quantity = parse_quantity(form.quantity.as_deref(), 0);
        let stock = state
            .products()
            .get_by_id(line.product_id)
            .await?
            .map(|p| p.stock_qty);
        cart.update(index, quantity, stock);
    }

    Ok(store_and_redirect(&state, &cart, "/cart"))
}

/// Remove a cart line.
#[instrument(skip(state, cart))]
pub async fn remove(
    State(state): State<AppState>,
    CurrentCart(mut cart): CurrentCart,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    if let Some(index) = parse_index(&form.key) {
        cart.remove(index);
    }
    store_and_redirect(&state, &cart, "/cart")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(Some("3"), 1), 3);
        assert_eq!(parse_quantity(Some(" 2 "), 1), 2);
        assert_eq!(parse_quantity(Some("-4"), 1), 0);
        assert_eq!(parse_quantity(Some("lots"), 1), 1);
        assert_eq!(parse_quantity(None, 0), 0);
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("x"), None);
    }

    #[test]
    fn test_chosen_variant_falls_back() {
        assert_eq!(chosen(Some("Brown"), "Black"), "Brown");
        assert_eq!(chosen(Some("  "), "Black"), "Black");
        assert_eq!(chosen(None, "Black"), "Black");
    }
}
