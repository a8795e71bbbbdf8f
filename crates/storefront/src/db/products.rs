//! Product repository for database operations.
//!
//! Queries are checked at runtime (`query_as` with `FromRow`), and filtered
//! listings are assembled with `QueryBuilder`. Every stock mutation locks the
//! row inside a transaction and recomputes availability with
//! [`Availability::for_stock`].

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use maison_core::{Availability, ProductId};

use super::RepositoryError;
use crate::models::{NewProduct, Product};
use crate::services::catalog::{Shortfall, StockChange, deduct, replenish};

const PRODUCT_COLUMNS: &str = "id, name, slug, sku, description, category, price, availability, \
     stock_qty, low_stock_threshold, lace_type, density, cap_size, colors, lengths, media, \
     created_at, updated_at";

/// Optional listing filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub availability: Option<Availability>,
    pub lace_type: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Substring match against the serialized color list.
    pub color: Option<String>,
    /// Substring match against the serialized length list.
    pub length: Option<String>,
}

impl ProductFilters {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(category) = &self.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(availability) = self.availability {
            qb.push(" AND availability = ").push_bind(availability);
        }
        if let Some(lace_type) = &self.lace_type {
            qb.push(" AND lace_type = ").push_bind(lace_type.clone());
        }
        if let Some(min) = self.min_price {
            qb.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND price <= ").push_bind(max);
        }
        if let Some(color) = &self.color {
            qb.push(" AND strpos(colors::text, ")
                .push_bind(color.clone())
                .push(") > 0");
        }
        if let Some(length) = &self.length {
            qb.push(" AND strpos(lengths::text, ")
                .push_bind(length.clone())
                .push(") > 0");
        }
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// `max(1, ceil(total / page_size))`.
#[must_use]
pub fn total_pages(total: i64, page_size: u32) -> u32 {
    let size = i64::from(page_size.max(1));
    let pages = (total.max(0) + size - 1) / size;
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filters`, newest first.
    ///
    /// Pages are 1-based; `page = 0` is treated as the first page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filters: &ProductFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ProductPage, RepositoryError> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products");
        filters.push_where(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        filters.push_where(&mut query);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page_size))
            .push(" OFFSET ")
            .push_bind(i64::from(page - 1) * i64::from(page_size));
        let items = query
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        Ok(ProductPage {
            items,
            total,
            page,
            page_size,
            total_pages: total_pages(total, page_size),
        })
    }

    /// Newest products for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_featured(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC LIMIT $1");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// All products, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admin(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY updated_at DESC");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Every slug with its last update, for the sitemap.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_slugs(
        &self,
    ) -> Result<Vec<(String, chrono::DateTime<chrono::Utc>)>, RepositoryError> {
        let rows = sqlx::query_as("SELECT slug, updated_at FROM products ORDER BY slug")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Insert a product. Availability is derived from the submitted stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO products (name, slug, sku, description, category, price, availability, \
                 stock_qty, low_stock_threshold, lace_type, density, cap_size, colors, lengths, media) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.sku)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.price)
            .bind(input.availability())
            .bind(input.stock_qty)
            .bind(input.low_stock_threshold)
            .bind(&input.lace_type)
            .bind(&input.density)
            .bind(&input.cap_size)
            .bind(Json(&input.colors))
            .bind(Json(&input.lengths))
            .bind(Json(&input.media))
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "product slug"))
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(&self, id: ProductId, input: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE products SET name = $2, slug = $3, sku = $4, description = $5, category = $6, \
                 price = $7, availability = $8, stock_qty = $9, low_stock_threshold = $10, \
                 lace_type = $11, density = $12, cap_size = $13, colors = $14, lengths = $15, \
                 media = $16, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.sku)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.price)
            .bind(input.availability())
            .bind(input.stock_qty)
            .bind(input.low_stock_threshold)
            .bind(&input.lace_type)
            .bind(&input.density)
            .bind(&input.cap_size)
            .bind(Json(&input.colors))
            .bind(Json(&input.lengths))
            .bind(Json(&input.media))
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "product slug"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Deduct `quantity` units under a row lock.
    ///
    /// With [`Shortfall::Floor`] the stock never goes below zero; with
    /// [`Shortfall::Reject`] an over-deduction changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    #[instrument(skip(self))]
    pub async fn reduce_stock(
        &self,
        id: ProductId,
        quantity: u32,
        shortfall: Shortfall,
    ) -> Result<StockChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i32, i32)> = sqlx::query_as(
            "SELECT stock_qty, low_stock_threshold FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((stock_qty, threshold)) = row else {
            return Ok(StockChange::NotFound);
        };
        let next = match deduct(stock_qty, quantity, shortfall) {
            Ok(next) => next,
            Err(available) => return Ok(StockChange::Insufficient { available }),
        };

        let product = write_stock(&mut tx, id, next, threshold).await?;
        tx.commit().await?;

        Ok(StockChange::Applied(product))
    }

    /// Return `quantity` units under a row lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    #[instrument(skip(self))]
    pub async fn restock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i32, i32)> = sqlx::query_as(
            "SELECT stock_qty, low_stock_threshold FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((stock_qty, threshold)) = row else {
            return Ok(None);
        };

        let product = write_stock(&mut tx, id, replenish(stock_qty, quantity), threshold).await?;
        tx.commit().await?;

        Ok(Some(product))
    }
}

async fn write_stock(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: ProductId,
    stock_qty: i32,
    threshold: i32,
) -> Result<Product, RepositoryError> {
    let sql = format!(
        "UPDATE products SET stock_qty = $2, availability = $3, updated_at = NOW() \
         WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    );
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(stock_qty)
        .bind(Availability::for_stock(stock_qty, threshold))
        .fetch_one(&mut **tx)
        .await?;
    Ok(product)
}
