//! Sitemap and robots rules.

use std::fmt::Write as _;

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Pages listed in the sitemap ahead of the products.
const STATIC_PATHS: [&str; 3] = ["/", "/shop", "/cart"];

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Render the sitemap for the static pages and every product slug.
#[must_use]
pub fn render_sitemap(base_url: &str, products: &[(String, DateTime<Utc>)]) -> String {
    let base = xml_escape(base_url);
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in STATIC_PATHS {
        let _ = writeln!(xml, "  <url><loc>{base}{path}</loc></url>");
    }
    for (slug, updated_at) in products {
        let _ = writeln!(
            xml,
            "  <url><loc>{base}/product/{}</loc><lastmod>{}</lastmod></url>",
            xml_escape(slug),
            updated_at.format("%Y-%m-%d")
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

/// `GET /sitemap.xml`
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = state.products().list_slugs().await?;
    let xml = render_sitemap(&state.config().base_url, &products);
    Ok(([(CONTENT_TYPE, "application/xml")], xml))
}

/// `GET /robots.txt`
pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!(
            "User-agent: *\nAllow: /\nDisallow: /admin\nSitemap: {}/sitemap.xml\n",
            state.config().base_url
        ),
    )
}
