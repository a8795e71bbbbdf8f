//! Seed the catalog with sample wigs.
//!
//! Does nothing when the catalog already has products, so it is safe to run
//! on every deploy of a fresh environment.

use rust_decimal::Decimal;
use tracing::info;

use maison_storefront::db::{ProductRepository, create_pool};
use maison_storefront::models::NewProduct;

use super::{CommandError, database_url};

/// Insert the sample products if the catalog is empty.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a query fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = create_pool(&database_url).await?;
    let products = ProductRepository::new(&pool);

    let existing = products.list_admin().await?;
    if !existing.is_empty() {
        info!(count = existing.len(), "Catalog already has products, skipping seed");
        return Ok(());
    }

    for product in sample_products() {
        let created = products.create(&product).await?;
        info!(slug = %created.slug, "Seeded product");
    }

    info!("Seed complete!");
    Ok(())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Sample catalog covering every availability tier.
fn sample_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Silky Straight Frontal".to_string(),
            slug: "silky-straight-frontal".to_string(),
            sku: "MJ-SS-001".to_string(),
            description: "Bone straight 13x4 frontal wig with a natural hairline.".to_string(),
            category: "Straight".to_string(),
            price: Decimal::new(245_000, 2),
            stock_qty: 8,
            low_stock_threshold: 2,
            lace_type: "Frontal".to_string(),
            density: "200%".to_string(),
            cap_size: "Medium".to_string(),
            colors: strings(&["Natural Black", "1B"]),
            lengths: strings(&["18", "20", "22", "24"]),
            media: Vec::new(),
        },
        NewProduct {
            name: "Body Wave Closure".to_string(),
            slug: "body-wave-closure".to_string(),
            sku: "MJ-BW-002".to_string(),
            description: "Soft body wave 5x5 closure wig, pre-plucked.".to_string(),
            category: "Body Wave".to_string(),
            price: Decimal::new(185_000, 2),
            stock_qty: 2,
            low_stock_threshold: 2,
            lace_type: "Closure".to_string(),
            density: "180%".to_string(),
            cap_size: "Medium".to_string(),
            colors: strings(&["Natural Black"]),
            lengths: strings(&["16", "18", "20"]),
            media: Vec::new(),
        },
        NewProduct {
            name: "Kinky Curly Glueless".to_string(),
            slug: "kinky-curly-glueless".to_string(),
            sku: "MJ-KC-003".to_string(),
            description: "Wear-and-go glueless curly unit.".to_string(),
            category: "Curly".to_string(),
            price: Decimal::new(210_000, 2),
            stock_qty: 5,
            low_stock_threshold: 2,
            lace_type: "Glueless".to_string(),
            density: "180%".to_string(),
            cap_size: "Large".to_string(),
            colors: strings(&["1B", "Brown"]),
            lengths: strings(&["14", "16", "18"]),
            media: Vec::new(),
        },
        NewProduct {
            name: "Classic Bob".to_string(),
            slug: "classic-bob".to_string(),
            sku: "MJ-BB-004".to_string(),
            description: "Blunt cut bob on a 4x4 closure.".to_string(),
            category: "Bob".to_string(),
            price: Decimal::new(95_000, 2),
            stock_qty: 0,
            low_stock_threshold: 2,
            lace_type: "Closure".to_string(),
            density: "150%".to_string(),
            cap_size: "Small".to_string(),
            colors: strings(&["Natural Black", "Burgundy"]),
            lengths: strings(&["10", "12"]),
            media: Vec::new(),
        },
    ]
}
