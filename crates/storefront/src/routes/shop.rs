//! Catalog route handlers: the filtered shop listing and product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use url::form_urlencoded;

use maison_core::{Availability, MediaItem, MediaKind};

use super::{Page, ProductCard, SelectOption, whatsapp_url};
use crate::db::{ProductFilters, ProductPage};
use crate::error::AppError;
use crate::filters;
use crate::models::Product;
use crate::services::CurrentCart;
use crate::state::AppState;

/// Lace types offered in the filter and the admin form.
pub const LACE_TYPES: [&str; 4] = ["Closure", "Frontal", "Full Lace", "Glueless"];

// =============================================================================
// Shop Listing
// =============================================================================

/// Query parameters of `/shop`. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopQuery {
    pub category: Option<String>,
    pub availability: Option<String>,
    pub lace_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub color: Option<String>,
    pub length: Option<String>,
    pub page: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn price(value: Option<&String>) -> Option<Decimal> {
    non_blank(value).and_then(|v| v.parse::<Decimal>().ok())
}

impl ShopQuery {
    /// Listing filters; unparseable values are dropped rather than rejected.
    #[must_use]
    pub fn filters(&self) -> ProductFilters {
        ProductFilters {
            category: non_blank(self.category.as_ref()),
            availability: non_blank(self.availability.as_ref())
                .and_then(|v| v.parse::<Availability>().ok()),
            lace_type: non_blank(self.lace_type.as_ref()),
            min_price: price(self.min_price.as_ref()),
            max_price: price(self.max_price.as_ref()),
            color: non_blank(self.color.as_ref()),
            length: non_blank(self.length.as_ref()),
        }
    }

    /// Requested page, 1 when missing or invalid.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }

    /// Query string for another page with the same filters.
    #[must_use]
    pub fn href_for_page(&self, page: u32) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let pairs = [
            ("category", &self.category),
            ("availability", &self.availability),
            ("laceType", &self.lace_type),
            ("minPrice", &self.min_price),
            ("maxPrice", &self.max_price),
            ("color", &self.color),
            ("length", &self.length),
        ];
        for (key, value) in pairs {
            if let Some(value) = non_blank(value.as_ref()) {
                query.append_pair(key, &value);
            }
        }
        query.append_pair("page", &page.to_string());
        format!("/shop?{}", query.finish())
    }
}

/// A numbered pagination link.
#[derive(Clone)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Filter form state echoed back to the template.
#[derive(Clone)]
pub struct FilterView {
    pub categories: Vec<SelectOption>,
    pub availabilities: Vec<SelectOption>,
    pub lace_types: Vec<SelectOption>,
    pub min_price: String,
    pub max_price: String,
    pub color: String,
    pub length: String,
}

/// Shop page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/shop.html")]
pub struct ShopTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
    pub filters: FilterView,
    pub total: i64,
    pub pages: Vec<PageLink>,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

fn filter_view(state: &AppState, query: &ShopQuery) -> FilterView {
    let text = |value: Option<&str>| value.unwrap_or_default().trim().to_string();
    let category = text(query.category.as_deref());
    let availability = query
        .availability
        .as_deref()
        .and_then(|v| v.parse::<Availability>().ok())
        .map_or("", |a| a.as_str());
    let lace_type = text(query.lace_type.as_deref());

    let any = |label: &str, current: &str| SelectOption::new("", label, current);

    FilterView {
        categories: std::iter::once(any("All categories", &category))
            .chain(
                state
                    .config()
                    .brand
                    .categories
                    .iter()
                    .map(|c| SelectOption::new(c, c, &category)),
            )
            .collect(),
        availabilities: std::iter::once(any("Any availability", availability))
            .chain(
                Availability::ALL
                    .iter()
                    .map(|a| SelectOption::new(a.as_str(), a.label(), availability)),
            )
            .collect(),
        lace_types: std::iter::once(any("Any lace", &lace_type))
            .chain(LACE_TYPES.iter().map(|l| SelectOption::new(l, l, &lace_type)))
            .collect(),
        min_price: text(query.min_price.as_deref()),
        max_price: text(query.max_price.as_deref()),
        color: text(query.color.as_deref()),
        length: text(query.length.as_deref()),
    }
}

fn page_links(query: &ShopQuery, result: &ProductPage) -> Vec<PageLink> {
    (1..=result.total_pages)
        .map(|number| PageLink {
            number,
            href: query.href_for_page(number),
            current: number == result.page,
        })
        .collect()
}

/// Display the filtered product listing.
#[instrument(skip(state, cart))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
    CurrentCart(cart): CurrentCart,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .products()
        .list(&query.filters(), query.page(), state.config().page_size)
        .await?;

    let brand_name = state.config().brand.name.clone();
    let page = Page::new(
        &state,
        "Shop",
        format!("Browse luxury wigs from {brand_name}."),
        cart.item_count(),
    );

    Ok(ShopTemplate {
        page,
        products: result.items.iter().map(ProductCard::from).collect(),
        filters: filter_view(&state, &query),
        total: result.total,
        pages: page_links(&query, &result),
        prev_href: (result.page > 1).then(|| query.href_for_page(result.page - 1)),
        next_href: (result.page < result.total_pages)
            .then(|| query.href_for_page(result.page + 1)),
    })
}

// =============================================================================
// Product Detail
// =============================================================================

/// Product detail display data.
#[derive(Clone)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub availability: Availability,
    pub stock_qty: i32,
    pub lace_type: String,
    pub density: String,
    pub cap_size: String,
    pub colors: Vec<String>,
    pub lengths: Vec<String>,
    pub main_image: Option<MediaItem>,
    pub images: Vec<MediaItem>,
    pub videos: Vec<MediaItem>,
    pub models: Vec<MediaItem>,
    pub purchasable: bool,
    pub whatsapp_link: String,
}

impl ProductView {
    fn new(product: &Product, brand_name: &str, whatsapp_number: &str) -> Self {
        let price = product.money().to_string();
        let message = format!(
            "Hello {brand_name}, I'm interested in {} ({}) for {price}.",
            product.name, product.sku
        );
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            sku: product.sku.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            availability: product.availability,
            stock_qty: product.stock_qty.max(1),
            lace_type: product.lace_type.clone(),
            density: product.density.clone(),
            cap_size: product.cap_size.clone(),
            colors: product.colors.clone(),
            lengths: product.lengths.clone(),
            main_image: product.primary_image().cloned(),
            images: product.media_of(MediaKind::Image).cloned().collect(),
            videos: product.media_of(MediaKind::Video).cloned().collect(),
            models: product.media_of(MediaKind::Model).cloned().collect(),
            purchasable: product.is_purchasable(),
            whatsapp_link: whatsapp_url(whatsapp_number, &message),
            price,
        }
    }
}

/// Product page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/product.html")]
pub struct ProductTemplate {
    pub page: Page,
    pub product: ProductView,
}

/// Display a product by slug.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    CurrentCart(cart): CurrentCart,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .products()
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    let brand = &state.config().brand;
    let view = ProductView::new(&product, &brand.name, &brand.whatsapp_number);
    let page = Page::new(
        &state,
        &product.name,
        product.description.clone(),
        cart.item_count(),
    );

    Ok(ProductTemplate {
        page,
        product: view,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::fixtures;

    fn query(pairs: &[(&str, &str)]) -> ShopQuery {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        let uri: axum::http::Uri = format!("/shop?{encoded}").parse().unwrap();
        Query::<ShopQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let q = query(&[("category", ""), ("color", "  "), ("minPrice", "abc")]);
        assert_eq!(q.filters(), ProductFilters::default());
    }

    #[test]
    fn test_filters_parse() {
        let q = query(&[
            ("category", "Curly"),
            ("availability", "In Stock"),
            ("laceType", "Frontal"),
            ("minPrice", "100"),
            ("maxPrice", "2500.50"),
            ("length", "18"),
        ]);
        let filters = q.filters();
        assert_eq!(filters.category.as_deref(), Some("Curly"));
        assert_eq!(filters.availability, Some(Availability::InStock));
        assert_eq!(filters.lace_type.as_deref(), Some("Frontal"));
        assert_eq!(filters.min_price, Some(Decimal::new(100, 0)));
        assert_eq!(filters.max_price, Some(Decimal::new(250_050, 2)));
        assert_eq!(filters.length.as_deref(), Some("18"));
        assert_eq!(filters.color, None);
    }

    #[test]
    fn test_page_defaults_and_floors() {
        assert_eq!(query(&[]).page(), 1);
        assert_eq!(query(&[("page", "0")]).page(), 1);
        assert_eq!(query(&[("page", "-3")]).page(), 1);
        assert_eq!(query(&[("page", "4")]).page(), 4);
    }

    #[test]
    fn test_page_href_keeps_filters() {
        let q = query(&[("category", "Body Wave"), ("page", "1"), ("color", "")]);
        assert_eq!(q.href_for_page(2), "/shop?category=Body+Wave&page=2");
    }

    #[test]
    fn test_product_view_whatsapp_message() {
        let product = fixtures::product(3, 1250, 4);
        let view = ProductView::new(&product, "MJ Hair Empire", "233500000000");
        assert!(view.purchasable);
        assert_eq!(view.price, "GH₵1,250.00");
        assert!(view.whatsapp_link.starts_with("https://wa.me/233500000000?text="));
        assert!(view.whatsapp_link.contains("I%27m%20interested%20in%20Wig%203"));
    }

    #[test]
    fn test_sold_out_product_is_not_purchasable() {
        let mut product = fixtures::product(3, 100, 0);
        product.availability = Availability::SoldOut;
        let view = ProductView::new(&product, "MJ", "1");
        assert!(!view.purchasable);
        assert_eq!(view.stock_qty, 1);
    }
}
