//! Checkout route handlers.
//!
//! `GET /checkout` shows the order form for the current cart. `POST /checkout`
//! takes a multipart form (contact details plus an optional payment proof
//! screenshot), places the order and clears the cart cookie.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maison_core::{Cart, DeliveryType, Money};
use tracing::{error, instrument, warn};

use super::cart::{LineView, line_views};
use super::multipart::MultipartForm;
use super::{Page, SelectOption};
use crate::error::AppError;
use crate::filters;
use crate::services::checkout::{CartSummary, resolve_cart};
use crate::services::storage::Upload;
use crate::services::{
    Catalog, Checkout, CheckoutError, CheckoutForm, CurrentCart, ObjectStorage, OrderStore,
};
use crate::state::AppState;

/// Submitted form values echoed back after a failed attempt.
#[derive(Clone, Default)]
pub struct FormData {
    pub full_name: String,
    pub phone_number: String,
    pub delivery_address: String,
    pub notes: String,
    pub delivery_types: Vec<SelectOption>,
    pub is_delivery: bool,
}

impl FormData {
    fn new(form: &CheckoutForm) -> Self {
        let current = form.delivery_type.label();
        Self {
            full_name: form.full_name.clone(),
            phone_number: form.phone_number.clone(),
            delivery_address: form.delivery_address.clone(),
            notes: form.notes.clone(),
            delivery_types: [DeliveryType::Pickup, DeliveryType::Delivery]
                .iter()
                .map(|t| SelectOption::new(t.label(), t.label(), current))
                .collect(),
            is_delivery: form.delivery_type.requires_address(),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/checkout.html")]
pub struct CheckoutTemplate {
    pub page: Page,
    pub lines: Vec<LineView>,
    pub subtotal: String,
    pub form: FormData,
    pub error: Option<String>,
}

fn checkout_page(
    state: &AppState,
    summary: &CartSummary,
    form: &CheckoutForm,
    error: Option<String>,
) -> CheckoutTemplate {
    let brand_name = state.config().brand.name.clone();
    CheckoutTemplate {
        page: Page::new(
            state,
            "Checkout",
            format!("Checkout order for {brand_name}."),
            summary.item_count(),
        ),
        lines: line_views(summary),
        subtotal: Money::ghs(summary.subtotal).to_string(),
        form: FormData::new(form),
        error,
    }
}

/// Display the checkout form. An empty cart goes back to the shop.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    CurrentCart(cart): CurrentCart,
) -> Result<Response, AppError> {
    let summary = resolve_cart(&state.products(), &cart).await?;
    if summary.is_empty() {
        return Ok(Redirect::to("/shop").into_response());
    }
    Ok(checkout_page(&state, &summary, &CheckoutForm::default(), None).into_response())
}

fn checkout_form(form: &MultipartForm) -> CheckoutForm {
    CheckoutForm::new(
        form.text("fullName"),
        form.text("phoneNumber"),
        form.non_blank("deliveryType"),
        form.text("deliveryAddress"),
        form.text("notes"),
    )
}

/// Place an order from the cart cookie and the submitted form.
///
/// Success redirects to the confirmation page with an emptied cart cookie.
/// Failures re-render the form with the submitted values: 400 for problems
/// the shopper can fix, 500 otherwise.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    CurrentCart(cart): CurrentCart,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submitted = MultipartForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid checkout form: {e}")))?;
    let form = checkout_form(&submitted);

    let products = state.products();
    let orders = state.orders();
    let checkout = Checkout::new(
        &products,
        &orders,
        state.storage(),
        state.config().stock_policy,
    );

    Ok(respond(
        &state,
        &checkout,
        &products,
        &cart,
        &form,
        submitted.file("paymentProof"),
    )
    .await)
}

/// Place the order and answer the submission.
async fn respond<C, O, S>(
    state: &AppState,
    checkout: &Checkout<'_, C, O, S>,
    catalog: &C,
    cart: &Cart,
    form: &CheckoutForm,
    proof: Option<&Upload>,
) -> Response
where
    C: Catalog,
    O: OrderStore,
    S: ObjectStorage,
{
    match checkout.place_order(cart, form, proof).await {
        Ok(order) => {
            let cookie = state
                .cart_codec()
                .set_cookie(&Cart::new(), state.config().is_https());
            let to = format!("/order/{}", urlencoding::encode(&order.order_number));
            (cookie, Redirect::to(&to)).into_response()
        }
        Err(CheckoutError::EmptyCart) => Redirect::to("/shop").into_response(),
        Err(e) => {
            let status = if e.is_recoverable() {
                warn!(error = %e, "Checkout rejected");
                StatusCode::BAD_REQUEST
            } else {
                let event_id = sentry::capture_error(&e);
                error!(error = %e, sentry_event_id = %event_id, "Checkout failed");
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let summary = resolve_cart(catalog, cart).await.unwrap_or_default();
            let page = checkout_page(state, &summary, form, Some(e.user_message()));
            (status, page).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Bytes, to_bytes};
    use axum::http::header::{LOCATION, SET_COOKIE};
    use maison_core::{CartLine, ProductId};

    use super::*;
    use crate::models::product::fixtures::product;
    use crate::services::StockPolicy;
    use crate::services::cart_token::CART_COOKIE_NAME;
    use crate::services::checkout::GENERIC_FAILURE_MESSAGE;
    use crate::services::testing::{MemoryCatalog, MemoryOrders, MemoryStorage, test_state};

    fn cart(id: i32, quantity: u32) -> Cart {
        Cart::from_lines([CartLine::new(ProductId::new(id), quantity, "Black", "18")])
    }

    fn proof() -> Upload {
        Upload {
            file_name: "momo.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn delivery_form() -> CheckoutForm {
        CheckoutForm::new("Ama Mensah", "0241234567", Some("Delivery"), "East Legon", "Gate 4")
    }

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_placed_order_redirects_and_clears_cart() {
        let state = test_state();
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let response = respond(&state, &checkout, &catalog, &cart(1, 2), &delivery_form(), None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let order = orders.all().pop().unwrap();
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert_eq!(location, format!("/order/{}", order.order_number));

        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        let empty = state.cart_codec().encode(&Cart::new());
        assert!(cookie.starts_with(&format!("{CART_COOKIE_NAME}={empty};")));
        assert!(state.cart_codec().decode(&empty).is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_redirects_to_shop() {
        let state = test_state();
        let catalog = MemoryCatalog::new([]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let response = respond(&state, &checkout, &catalog, &cart(9, 1), &delivery_form(), None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/shop");
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(orders.all().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_item_keeps_submitted_form() {
        let state = test_state();
        let catalog = MemoryCatalog::new([product(1, 100, 1)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::default();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let response = respond(&state, &checkout, &catalog, &cart(1, 3), &delivery_form(), None).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let html = body(response).await;
        assert!(html.contains("The selected quantity for Wig 1 is no longer available."));
        assert!(html.contains(r#"value="Ama Mensah""#));
        assert!(html.contains(r#"value="0241234567""#));
        assert!(html.contains("East Legon"));
        assert!(html.contains("Gate 4"));
        assert!(orders.all().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_is_generic_server_error() {
        let state = test_state();
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let orders = MemoryOrders::default();
        let storage = MemoryStorage::failing();
        let checkout = Checkout::new(&catalog, &orders, &storage, StockPolicy::Strict);

        let response = respond(
            &state,
            &checkout,
            &catalog,
            &cart(1, 1),
            &delivery_form(),
            Some(&proof()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body(response).await;
        assert!(html.contains(GENERIC_FAILURE_MESSAGE));
        assert!(html.contains(r#"value="Ama Mensah""#));
        assert!(orders.all().is_empty());
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
    }

    #[test]
    fn test_checkout_form_from_multipart() {
        let submitted = MultipartForm::default()
            .with_field("fullName", "  Ama Mensah ")
            .with_field("phoneNumber", "0241234567")
            .with_field("deliveryType", "Delivery")
            .with_field("deliveryAddress", " East Legon ");
        let form = checkout_form(&submitted);
        assert_eq!(form.full_name, "Ama Mensah");
        assert_eq!(form.delivery_type, DeliveryType::Delivery);
        assert_eq!(form.stored_address(), "East Legon");
    }

    #[test]
    fn test_missing_delivery_type_is_pickup() {
        let form = checkout_form(&MultipartForm::default().with_field("deliveryAddress", "Osu"));
        assert_eq!(form.delivery_type, DeliveryType::Pickup);
        assert_eq!(form.stored_address(), "");
    }

    #[test]
    fn test_form_data_echo_selects_delivery_type() {
        let form = CheckoutForm::new("Ama", "024", Some("Delivery"), "Osu", "");
        let data = FormData::new(&form);
        assert!(data.is_delivery);
        let selected: Vec<_> = data
            .delivery_types
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(selected, ["Delivery"]);
    }
}
