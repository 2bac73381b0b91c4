//! # Inventory Allocator
//!
//! Stock intake and stock reservation, both expressed as guarded in-place
//! SQL updates so concurrent writers can never observe a half-applied count.
//!
//! ## Reservation (the sale-side decrement)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Conditional Decrement, Not Read-Then-Write               │
//! │                                                                         │
//! │  ❌ WRONG: read available, check in code, write the new value           │
//! │     (two racing sales can both pass the check and oversell)             │
//! │                                                                         │
//! │  ✅ CORRECT: one guarded UPDATE                                         │
//! │     UPDATE stock_items                                                  │
//! │     SET available_quantity = available_quantity - ?q                    │
//! │     WHERE product_id = ? AND unit = ? AND available_quantity >= ?q      │
//! │                                                                         │
//! │  rows_affected = 0 means the stock wasn't there at the moment of the    │
//! │  attempt: the caller rolls back the surrounding sale.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Restock Accumulation
//! Each restock line adds its quantity to BOTH counters and overwrites (not
//! averages) the per-unit price; the stored line total follows the cumulative
//! purchased quantity at the new price.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::repository::product::ProductRepository;
use crate::service::error::{EngineError, EngineResult};
use khata_core::validation;
use khata_core::{Product, RestockLine};

/// Service for stock intake and reservation.
#[derive(Debug, Clone)]
pub struct InventoryAllocator {
    pool: SqlitePool,
}

impl InventoryAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryAllocator { pool }
    }

    /// Applies restock lines to a product's stock items, atomically.
    ///
    /// Each line targets a stock item by unit. A unit the product doesn't
    /// have yet is appended as a new stock item seeded from the line.
    /// Returns the product as stored afterwards.
    pub async fn restock(&self, product_id: &str, lines: &[RestockLine]) -> EngineResult<Product> {
        if lines.is_empty() {
            return Err(EngineError::Validation(
                khata_core::ValidationError::Required {
                    field: "items".to_string(),
                },
            ));
        }
        for line in lines {
            validation::validate_unit(&line.unit)?;
            validation::validate_quantity(line.quantity)?;
            validation::validate_price_cents(line.price_per_unit_cents)?;
        }

        debug!(product_id = %product_id, lines = lines.len(), "Restocking");

        let mut tx = self.pool.begin().await.map_err(crate::error::DbError::from)?;

        for line in lines {
            let result = sqlx::query(
                r#"
                UPDATE stock_items SET
                    available_quantity = available_quantity + ?3,
                    total_purchased_quantity = total_purchased_quantity + ?3,
                    price_per_unit_cents = ?4,
                    line_total_cents = (total_purchased_quantity + ?3) * ?4
                WHERE product_id = ?1 AND unit = ?2
                "#,
            )
            .bind(product_id)
            .bind(line.unit.trim())
            .bind(line.quantity)
            .bind(line.price_per_unit_cents)
            .execute(&mut *tx)
            .await
            .map_err(crate::error::DbError::from)?;

            if result.rows_affected() == 0 {
                insert_new_unit(&mut tx, product_id, line).await?;
            }
        }

        refresh_grand_total(&mut tx, product_id).await?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(product_id = %product_id, lines = lines.len(), "Restock applied");

        ProductRepository::new(self.pool.clone())
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))
    }
}

/// Appends a stock item for a unit the product didn't have, seeded from the
/// restock line (initial quantity counts as intake on both counters).
async fn insert_new_unit(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: &str,
    line: &RestockLine,
) -> EngineResult<()> {
    let product_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(crate::error::DbError::from)?;
    if product_exists.is_none() {
        return Err(EngineError::not_found("Product", product_id));
    }

    sqlx::query(
        r#"
        INSERT INTO stock_items (
            product_id, unit, position,
            available_quantity, total_purchased_quantity,
            price_per_unit_cents, line_total_cents
        ) VALUES (
            ?1, ?2,
            (SELECT COALESCE(MAX(position) + 1, 0) FROM stock_items WHERE product_id = ?1),
            ?3, ?3, ?4, ?3 * ?4
        )
        "#,
    )
    .bind(product_id)
    .bind(line.unit.trim())
    .bind(line.quantity)
    .bind(line.price_per_unit_cents)
    .execute(&mut **tx)
    .await
    .map_err(crate::error::DbError::from)?;

    Ok(())
}

/// Reserves stock for one sale line inside an open transaction.
///
/// The decrement is guarded by `available_quantity >= quantity`; zero rows
/// affected becomes InsufficientStock (or NotFound when the stock item does
/// not exist at all).
pub(crate) async fn reserve_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: &str,
    unit: &str,
    quantity: i64,
) -> EngineResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stock_items
        SET available_quantity = available_quantity - ?3
        WHERE product_id = ?1 AND unit = ?2 AND available_quantity >= ?3
        "#,
    )
    .bind(product_id)
    .bind(unit)
    .bind(quantity)
    .execute(&mut **tx)
    .await
    .map_err(crate::error::DbError::from)?;

    if result.rows_affected() == 0 {
        let available: Option<i64> = sqlx::query_scalar(
            "SELECT available_quantity FROM stock_items WHERE product_id = ?1 AND unit = ?2",
        )
        .bind(product_id)
        .bind(unit)
        .fetch_optional(&mut **tx)
        .await
        .map_err(crate::error::DbError::from)?;

        return Err(match available {
            Some(available) => EngineError::InsufficientStock {
                product_id: product_id.to_string(),
                unit: unit.to_string(),
                available,
                requested: quantity,
            },
            None => stock_item_missing(tx, product_id, unit).await,
        });
    }

    Ok(())
}

/// Recomputes a product's stored grand total from its stock item line
/// totals, inside an open transaction.
pub(crate) async fn refresh_grand_total(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: &str,
) -> EngineResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            grand_total_cents = (
                SELECT COALESCE(SUM(line_total_cents), 0)
                FROM stock_items WHERE product_id = ?1
            ),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(chrono::Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(crate::error::DbError::from)?;

    if result.rows_affected() == 0 {
        return Err(EngineError::not_found("Product", product_id));
    }

    Ok(())
}

/// Distinguishes "product missing" from "product exists but has no such
/// unit" when a unit-targeted update matched nothing.
pub(crate) async fn stock_item_missing(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: &str,
    unit: &str,
) -> EngineError {
    let product_exists: Result<Option<i64>, _> =
        sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await;

    match product_exists {
        Ok(Some(_)) => EngineError::not_found("StockItem", format!("{product_id}/{unit}")),
        Ok(None) => EngineError::not_found("Product", product_id),
        Err(e) => crate::error::DbError::from(e).into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use khata_core::{CategoryRef, NewProduct, NewStockItem};

    async fn db_with_product() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .catalog()
            .create_product(NewProduct {
                title: "Cement".to_string(),
                category: CategoryRef::new("c-1", "cement"),
                sub_category: CategoryRef::new("s-1", "ultratech"),
                child_category: None,
                items: vec![NewStockItem {
                    unit: "bag".to_string(),
                    quantity: 10,
                    price_per_unit_cents: 100,
                }],
                created_by: "actor-1".to_string(),
            })
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_restock_accumulates_and_reprices() {
        let (db, product_id) = db_with_product().await;

        // {10, 10, 100} restocked with 5 @ 120
        let product = db
            .inventory()
            .restock(
                &product_id,
                &[RestockLine {
                    unit: "bag".to_string(),
                    quantity: 5,
                    price_per_unit_cents: 120,
                }],
            )
            .await
            .unwrap();

        let item = product.item_by_unit("bag").unwrap();
        assert_eq!(item.available_quantity, 15);
        assert_eq!(item.total_purchased_quantity, 15);
        assert_eq!(item.price_per_unit_cents, 120); // overwritten, not averaged
        assert_eq!(item.line_total_cents, 1800); // 15 * 120
        assert_eq!(product.grand_total_cents, 1800);
    }

    #[tokio::test]
    async fn test_restock_new_unit_appends_stock_item() {
        let (db, product_id) = db_with_product().await;

        let product = db
            .inventory()
            .restock(
                &product_id,
                &[
                    RestockLine {
                        unit: "bag".to_string(),
                        quantity: 5,
                        price_per_unit_cents: 120,
                    },
                    RestockLine {
                        unit: "pallet".to_string(),
                        quantity: 2,
                        price_per_unit_cents: 5_000,
                    },
                ],
            )
            .await
            .unwrap();

        let pallet = product.item_by_unit("pallet").unwrap();
        assert_eq!(pallet.available_quantity, 2);
        assert_eq!(pallet.total_purchased_quantity, 2);
        assert_eq!(pallet.line_total_cents, 10_000);
        assert_eq!(pallet.position, 1); // appended after "bag"

        // 15 * 120 + 2 * 5000
        assert_eq!(product.grand_total_cents, 11_800);
    }

    #[tokio::test]
    async fn test_restock_unknown_product() {
        let (db, _) = db_with_product().await;

        let err = db
            .inventory()
            .restock(
                "missing-product",
                &[RestockLine {
                    unit: "bag".to_string(),
                    quantity: 1,
                    price_per_unit_cents: 100,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound { ref entity, .. } if entity == "Product"
        ));
    }

    #[tokio::test]
    async fn test_restock_rejects_bad_lines() {
        let (db, product_id) = db_with_product().await;

        let err = db
            .inventory()
            .restock(
                &product_id,
                &[RestockLine {
                    unit: "bag".to_string(),
                    quantity: 0,
                    price_per_unit_cents: 100,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = db.inventory().restock(&product_id, &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
