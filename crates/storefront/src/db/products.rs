//! Product repository.
//!
//! Products are loaded together with their category links and size variants
//! so callers always receive complete [`Product`] values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use balloon_boutique_core::catalog::{Product, ProductSize};
use balloon_boutique_core::{CategoryGroupId, CategoryId, Price, ProductId, SizeId};

use super::{RepositoryError, non_negative, to_integer};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    description: Option<String>,
    price: Price,
    stock: i32,
    group_id: Option<CategoryGroupId>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SizeRow {
    id: SizeId,
    product_id: ProductId,
    label: String,
    price: Price,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct CategoryLinkRow {
    product_id: ProductId,
    category_id: CategoryId,
}

/// Repository for catalog reads and stock updates.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products currently on sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, price, stock, group_id, is_active, created_at
            FROM product
            WHERE is_active
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// A product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.get_many(&[id]).await?;
        Ok(products.into_iter().next())
    }

    /// Products by ID. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, price, stock, group_id, is_active, created_at
            FROM product
            WHERE id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Attach category links and sizes to product rows.
    async fn hydrate(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id.as_i64()).collect();

        let links = sqlx::query_as::<_, CategoryLinkRow>(
            r"
            SELECT product_id, category_id
            FROM product_category
            WHERE product_id = ANY($1)
            ORDER BY product_id, category_id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let sizes = sqlx::query_as::<_, SizeRow>(
            r"
            SELECT id, product_id, label, price, stock
            FROM product_size
            WHERE product_id = ANY($1)
            ORDER BY product_id, position, id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut categories: HashMap<ProductId, Vec<CategoryId>> = HashMap::new();
        for link in links {
            categories
                .entry(link.product_id)
                .or_default()
                .push(link.category_id);
        }

        let mut sizes_by_product: HashMap<ProductId, Vec<ProductSize>> = HashMap::new();
        for size in sizes {
            sizes_by_product
                .entry(size.product_id)
                .or_default()
                .push(ProductSize {
                    id: size.id,
                    label: size.label,
                    price: size.price,
                    stock: non_negative("size stock", size.stock)?,
                });
        }

        rows.into_iter()
            .map(|row| {
                Ok(Product {
                    id: row.id,
                    slug: row.slug,
                    name: row.name,
                    description: row.description,
                    price: row.price,
                    stock: non_negative("product stock", row.stock)?,
                    group_id: row.group_id,
                    category_ids: categories.remove(&row.id).unwrap_or_default(),
                    sizes: sizes_by_product.remove(&row.id).unwrap_or_default(),
                    is_active: row.is_active,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    /// Take `quantity` units out of stock inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if not enough stock is left.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn reserve_stock(
        conn: &mut PgConnection,
        product_id: ProductId,
        size_id: Option<SizeId>,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity)
            .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} too large")))?;

        let result = match size_id {
            Some(size_id) => {
                sqlx::query(
                    r"
                    UPDATE product_size
                    SET stock = stock - $3
                    WHERE id = $2 AND product_id = $1 AND stock >= $3
                    ",
                )
                .bind(product_id)
                .bind(size_id)
                .bind(quantity)
                .execute(&mut *conn)
                .await?
            }
            None => {
                sqlx::query(
                    r"
                    UPDATE product
                    SET stock = stock - $2, updated_at = now()
                    WHERE id = $1 AND stock >= $2
                    ",
                )
                .bind(product_id)
                .bind(quantity)
                .execute(&mut *conn)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "product {product_id} is out of stock"
            )));
        }
        Ok(())
    }

    /// Put `quantity` units back, e.g. when an order is canceled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if `quantity` does not fit
    /// an `INTEGER` and `RepositoryError::Database` if the update fails.
    pub async fn release_stock(
        conn: &mut PgConnection,
        product_id: ProductId,
        size_id: Option<SizeId>,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = to_integer("quantity", quantity)?;
        match size_id {
            Some(size_id) => {
                sqlx::query("UPDATE product_size SET stock = stock + $3 WHERE id = $2 AND product_id = $1")
                    .bind(product_id)
                    .bind(size_id)
                    .bind(quantity)
                    .execute(&mut *conn)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE product SET stock = stock + $2, updated_at = now() WHERE id = $1")
                    .bind(product_id)
                    .bind(quantity)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }
}
