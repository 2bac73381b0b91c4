//! # Product Repository
//!
//! Database operations for catalog products and their stock items.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product ↔ Stock Item Mapping                         │
//! │                                                                         │
//! │  Product { items: Vec<StockItem> }                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐      ┌───────────────────────────────────┐        │
//! │  │ products         │      │ stock_items                       │        │
//! │  │ ─────────────    │ 1..n │ ─────────────                     │        │
//! │  │ id (PK)          │◄─────│ (product_id, unit) PK             │        │
//! │  │ taxonomy triple  │      │ available / total_purchased       │        │
//! │  │ grand_total      │      │ price_per_unit / line_total       │        │
//! │  └──────────────────┘      └───────────────────────────────────┘        │
//! │                                                                         │
//! │  Stock items are keyed by (product_id, unit): the unit label is the     │
//! │  stable identity, never the array position.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariant Guard
//! `recompute_totals()` runs on every write path before persistence, so the
//! stored `line_total_cents` / `grand_total_cents` never depend on caller
//! discipline.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::{CategoryRef, Product, StockItem};

// =============================================================================
// Row Types
// =============================================================================

/// Flat `products` row; assembled into a [`Product`] with its stock items.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    title: String,
    category_id: String,
    category_name: String,
    sub_category_id: Option<String>,
    sub_category_name: String,
    child_category_id: Option<String>,
    child_category_name: Option<String>,
    grand_total_cents: i64,
    created_by: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

/// Flat `stock_items` row including its owning product id, so one query can
/// cover many products.
#[derive(Debug, sqlx::FromRow)]
struct StockItemRow {
    product_id: String,
    unit: String,
    position: i64,
    available_quantity: i64,
    total_purchased_quantity: i64,
    price_per_unit_cents: i64,
    line_total_cents: i64,
}

impl StockItemRow {
    fn into_item(self) -> StockItem {
        StockItem {
            unit: self.unit,
            position: self.position,
            available_quantity: self.available_quantity,
            total_purchased_quantity: self.total_purchased_quantity,
            price_per_unit_cents: self.price_per_unit_cents,
            line_total_cents: self.line_total_cents,
        }
    }
}

fn assemble(row: ProductRow, items: Vec<StockItem>) -> Product {
    Product {
        id: row.id,
        title: row.title,
        category: CategoryRef {
            id: Some(row.category_id),
            name: row.category_name,
        },
        sub_category: CategoryRef {
            id: row.sub_category_id,
            name: row.sub_category_name,
        },
        child_category: match (row.child_category_id, row.child_category_name) {
            (None, None) => None,
            (id, name) => Some(CategoryRef {
                id,
                name: name.unwrap_or_default(),
            }),
        },
        items,
        grand_total_cents: row.grand_total_cents,
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

// =============================================================================
// Listing Query
// =============================================================================

/// Parameters for the paged product listing.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    /// 1-based page number.
    pub page: i64,
    pub per_page: i64,
    /// Case-insensitive title substring.
    pub search: Option<String>,
    pub category_id: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        ProductQuery {
            page: 1,
            per_page: 20,
            search: None,
            category_id: None,
        }
    }
}

/// One page of products plus the pagination math the listing screen needs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
    pub pages_count: i64,
    pub page: i64,
    pub per_page: i64,
}

// =============================================================================
// Category Hierarchy
// =============================================================================

/// One node of the derived taxonomy tree.
///
/// The hierarchy is not stored anywhere; it is folded out of the distinct
/// taxonomy triples frozen onto products.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryNode {
    pub id: Option<String>,
    pub name: String,
    pub children: Vec<CategoryNode>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // List a page of products matching a title substring
/// let page = repo.list(&ProductQuery {
///     search: Some("cement".to_string()),
///     ..Default::default()
/// }).await?;
///
/// // Get by ID with stock items attached
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product together with its stock items, atomically.
    ///
    /// Derived totals are recomputed here regardless of what the caller put
    /// in the struct.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with recomputed totals
    /// * `Err(DbError::UniqueViolation)` - Duplicate id or duplicate unit
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, title = %product.title, "Inserting product");

        let mut product = product.clone();
        product.recompute_totals();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title,
                category_id, category_name,
                sub_category_id, sub_category_name,
                child_category_id, child_category_name,
                grand_total_cents, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(product.category.id.as_deref().unwrap_or_default())
        .bind(&product.category.name)
        .bind(&product.sub_category.id)
        .bind(&product.sub_category.name)
        .bind(product.child_category.as_ref().and_then(|c| c.id.as_deref()))
        .bind(product.child_category.as_ref().map(|c| c.name.as_str()))
        .bind(product.grand_total_cents)
        .bind(&product.created_by)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &product.items {
            insert_stock_item(&mut tx, &product.id, item).await?;
        }

        tx.commit().await?;

        Ok(product)
    }

    /// Gets a product by its ID, with stock items ordered by position.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title,
                   category_id, category_name,
                   sub_category_id, sub_category_name,
                   child_category_id, child_category_name,
                   grand_total_cents, created_by, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, StockItemRow>(
            r#"
            SELECT product_id, unit, position,
                   available_quantity, total_purchased_quantity,
                   price_per_unit_cents, line_total_cents
            FROM stock_items
            WHERE product_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(StockItemRow::into_item)
        .collect();

        Ok(Some(assemble(row, items)))
    }

    /// Lists one page of products, newest first, with optional title
    /// substring (case-insensitive via SQLite LIKE) and category filters.
    pub async fn list(&self, query: &ProductQuery) -> DbResult<ProductPage> {
        let pattern = query
            .search
            .as_deref()
            .map(|f| format!("%{}%", f.trim()));
        let per_page = query.per_page.max(1);
        let page = query.page.max(1);

        debug!(filter = ?pattern, category = ?query.category_id, page, "Listing products");

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE (?1 IS NULL OR title LIKE ?1)
              AND (?2 IS NULL OR category_id = ?2)
            "#,
        )
        .bind(&pattern)
        .bind(&query.category_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title,
                   category_id, category_name,
                   sub_category_id, sub_category_name,
                   child_category_id, child_category_name,
                   grand_total_cents, created_by, created_at, updated_at
            FROM products
            WHERE (?1 IS NULL OR title LIKE ?1)
              AND (?2 IS NULL OR category_id = ?2)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(&pattern)
        .bind(&query.category_id)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let items = self.attach_items(rows).await?;

        Ok(ProductPage {
            items,
            total,
            pages_count: (total + per_page - 1) / per_page,
            page,
            per_page,
        })
    }

    /// Lists every product with its stock items (used by the profit replay,
    /// which needs the whole current catalog).
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, title,
                   category_id, category_name,
                   sub_category_id, sub_category_name,
                   child_category_id, child_category_name,
                   grand_total_cents, created_by, created_at, updated_at
            FROM products
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Fetches stock items for the given product rows in one query and
    /// groups them in memory, instead of a query per product.
    async fn attach_items(&self, rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
        let item_rows = sqlx::query_as::<_, StockItemRow>(
            r#"
            SELECT product_id, unit, position,
                   available_quantity, total_purchased_quantity,
                   price_per_unit_cents, line_total_cents
            FROM stock_items
            ORDER BY product_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<String, Vec<StockItem>> = HashMap::new();
        for row in item_rows {
            by_product
                .entry(row.product_id.clone())
                .or_default()
                .push(row.into_item());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_product.remove(&row.id).unwrap_or_default();
                assemble(row, items)
            })
            .collect())
    }

    /// Updates a product and fully replaces its stock items, atomically.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Updated product with recomputed totals
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, "Updating product");

        let mut product = product.clone();
        product.recompute_totals();
        product.updated_at = chrono::Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                title = ?2,
                category_id = ?3,
                category_name = ?4,
                sub_category_id = ?5,
                sub_category_name = ?6,
                child_category_id = ?7,
                child_category_name = ?8,
                grand_total_cents = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(product.category.id.as_deref().unwrap_or_default())
        .bind(&product.category.name)
        .bind(&product.sub_category.id)
        .bind(&product.sub_category.name)
        .bind(product.child_category.as_ref().and_then(|c| c.id.as_deref()))
        .bind(product.child_category.as_ref().map(|c| c.name.as_str()))
        .bind(product.grand_total_cents)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        sqlx::query("DELETE FROM stock_items WHERE product_id = ?1")
            .bind(&product.id)
            .execute(&mut *tx)
            .await?;

        for item in &product.items {
            insert_stock_item(&mut tx, &product.id, item).await?;
        }

        tx.commit().await?;

        Ok(product)
    }

    /// Deletes a product; its stock items go with it (ON DELETE CASCADE).
    ///
    /// Hard delete: historical transaction lines keep their frozen snapshot
    /// columns and survive the product's removal.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Builds the category → sub-category → child-category tree from the
    /// distinct taxonomy triples frozen onto products.
    pub async fn hierarchy(&self) -> DbResult<Vec<CategoryNode>> {
        #[derive(sqlx::FromRow)]
        struct TripleRow {
            category_id: String,
            category_name: String,
            sub_category_id: Option<String>,
            sub_category_name: String,
            child_category_id: Option<String>,
            child_category_name: Option<String>,
        }

        let triples = sqlx::query_as::<_, TripleRow>(
            r#"
            SELECT DISTINCT
                category_id, category_name,
                sub_category_id, sub_category_name,
                child_category_id, child_category_name
            FROM products
            ORDER BY category_name, sub_category_name, child_category_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut roots: Vec<CategoryNode> = Vec::new();
        for t in triples {
            let root_idx = match roots
                .iter()
                .position(|n| n.id.as_deref() == Some(t.category_id.as_str()))
            {
                Some(idx) => idx,
                None => {
                    roots.push(CategoryNode {
                        id: Some(t.category_id.clone()),
                        name: t.category_name.clone(),
                        children: Vec::new(),
                    });
                    roots.len() - 1
                }
            };
            let root = &mut roots[root_idx];

            let sub_idx = match root
                .children
                .iter()
                .position(|n| n.name == t.sub_category_name)
            {
                Some(idx) => idx,
                None => {
                    root.children.push(CategoryNode {
                        id: t.sub_category_id.clone(),
                        name: t.sub_category_name.clone(),
                        children: Vec::new(),
                    });
                    root.children.len() - 1
                }
            };
            let sub = &mut root.children[sub_idx];

            if let Some(child_name) = t.child_category_name {
                if !sub.children.iter().any(|n| n.name == child_name) {
                    sub.children.push(CategoryNode {
                        id: t.child_category_id,
                        name: child_name,
                        children: Vec::new(),
                    });
                }
            }
        }

        Ok(roots)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Inserts one stock item row within an open transaction.
async fn insert_stock_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: &str,
    item: &StockItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_items (
            product_id, unit, position,
            available_quantity, total_purchased_quantity,
            price_per_unit_cents, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(product_id)
    .bind(&item.unit)
    .bind(item.position)
    .bind(item.available_quantity)
    .bind(item.total_purchased_quantity)
    .bind(item.price_per_unit_cents)
    .bind(item.line_total_cents)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn lying_product() -> Product {
        Product {
            id: "p-1".to_string(),
            title: "Cement".to_string(),
            category: CategoryRef::new("c-1", "cement"),
            sub_category: CategoryRef::new("s-1", "ultratech"),
            child_category: None,
            items: vec![StockItem {
                unit: "bag".to_string(),
                position: 0,
                available_quantity: 10,
                total_purchased_quantity: 10,
                price_per_unit_cents: 100,
                line_total_cents: 1, // lying caller value
            }],
            grand_total_cents: 999_999, // lying caller value
            created_by: "actor-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_recomputes_lying_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&lying_product()).await.unwrap();

        let stored = repo.get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(stored.items[0].line_total_cents, 1000);
        assert_eq!(stored.grand_total_cents, 1000);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let err = repo.update(&lying_product()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo.delete("p-1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_unit_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut product = lying_product();
        product.items.push(StockItem {
            unit: "bag".to_string(),
            position: 1,
            available_quantity: 5,
            total_purchased_quantity: 5,
            price_per_unit_cents: 120,
            line_total_cents: 0,
        });

        let err = repo.insert(&product).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // the whole insert rolled back, including the product row
        assert!(repo.get_by_id("p-1").await.unwrap().is_none());
    }
}
