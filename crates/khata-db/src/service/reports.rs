//! # Profit Aggregator
//!
//! Replays sold lines from the ledger against the CURRENT catalog to produce
//! costed statement rows and per-category profit buckets.
//!
//! ## Cost Model (replay, not snapshot)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     How A Sold Line Is Costed                           │
//! │                                                                         │
//! │  transaction_items row: { product_id, unit, quantity, total_cents }     │
//! │       │                                                                 │
//! │       ▼  look up the CURRENT product record                             │
//! │  cost/unit = stock item matching `unit`, else the first stock item      │
//! │  category  = product's current category name                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { date, category, quantity, sold, cost, profit = sold - cost }        │
//! │                                                                         │
//! │  Consequence: restocking at a new price or renaming a category          │
//! │  retroactively moves reported profit. The sale price itself stays       │
//! │  frozen; only the cost side and the bucket label are live.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines whose product has since been deleted drop out of the report
//! entirely.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbError;
use crate::repository::product::ProductRepository;
use crate::service::error::EngineResult;
use khata_core::profit::{build_profit_report, resolve_cost_basis, ProfitReport, StatementRow};
use khata_core::Money;

/// Service producing costed statement rows and profit summaries.
#[derive(Debug, Clone)]
pub struct ProfitAggregator {
    pool: SqlitePool,
}

impl ProfitAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        ProfitAggregator { pool }
    }

    /// Costed sold lines inside an optional date window, oldest first.
    pub async fn statement_rows(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<StatementRow>> {
        #[derive(sqlx::FromRow)]
        struct SoldLine {
            product_id: String,
            unit: String,
            quantity: i64,
            total_cents: i64,
            created_at: DateTime<Utc>,
        }

        let sold = sqlx::query_as::<_, SoldLine>(
            r#"
            SELECT ti.product_id, ti.unit, ti.quantity, ti.total_cents, t.created_at
            FROM transaction_items ti
            INNER JOIN transactions t ON t.id = ti.transaction_id
            WHERE (?1 IS NULL OR t.created_at >= ?1)
              AND (?2 IS NULL OR t.created_at <= ?2)
            ORDER BY t.created_at ASC, ti.id ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        debug!(lines = sold.len(), "Costing sold lines");

        // Current catalog state drives both the cost basis and the bucket.
        let products = ProductRepository::new(self.pool.clone()).list_all().await?;
        let by_id: HashMap<&str, &khata_core::Product> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        // Lines whose product has since been deleted are skipped outright.
        let rows = sold
            .into_iter()
            .filter_map(|line| {
                let product = by_id.get(line.product_id.as_str())?;
                let cost_per_unit =
                    resolve_cost_basis(&product.items, &line.unit).unwrap_or(Money::zero());
                let cost = Money::from_cents(cost_per_unit.cents().saturating_mul(line.quantity));

                Some(StatementRow::new(
                    line.created_at.date_naive(),
                    product.category.name.as_str(),
                    line.quantity,
                    Money::from_cents(line.total_cents),
                    cost,
                ))
            })
            .collect();

        Ok(rows)
    }

    /// Per-category profit buckets plus grand totals over a date window.
    pub async fn profit_summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> EngineResult<ProfitReport> {
        let rows = self.statement_rows(from, to).await?;
        Ok(build_profit_report(rows.iter()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use khata_core::{
        CategoryRef, NewCustomer, NewProduct, NewStockItem, NewTransaction, NewTransactionLine,
        ProductUpdate,
    };

    /// Seeds one product (bag @ 50 cost) and one sale of 3 bags @ 100.
    async fn setup() -> (Database, String, String) {
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
                    quantity: 100,
                    price_per_unit_cents: 50,
                }],
                created_by: "actor-1".to_string(),
            })
            .await
            .unwrap();

        let customer = db
            .catalog()
            .create_customer(NewCustomer {
                name: "Ramesh".to_string(),
                phone: "9876543210".to_string(),
                address: None,
                created_by: None,
            })
            .await
            .unwrap();

        db.ledger()
            .create_transaction(NewTransaction {
                customer_id: customer.id.clone(),
                lines: vec![NewTransactionLine {
                    product_id: product.id.clone(),
                    category_id: Some("c-1".to_string()),
                    sub_category_id: None,
                    child_category_id: None,
                    unit: Some("bag".to_string()),
                    quantity: 3,
                    price_per_unit_cents: 100,
                }],
                paid_cents: 0,
                created_by: None,
            })
            .await
            .unwrap();

        (db, product.id, customer.id)
    }

    #[tokio::test]
    async fn test_statement_row_costs_against_current_catalog() {
        let (db, _, _) = setup().await;

        let rows = db.reports().statement_rows(None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "cement");
        assert_eq!(rows[0].quantity, 3);
        assert_eq!(rows[0].sold_cents, 300);
        assert_eq!(rows[0].cost_cents, 150); // 3 * current 50
        assert_eq!(rows[0].profit_cents, 150);
    }

    #[tokio::test]
    async fn test_summary_buckets_by_category() {
        let (db, _, _) = setup().await;

        let report = db.reports().profit_summary(None, None).await.unwrap();
        let bucket = report.summary.get("cement").unwrap();
        assert_eq!(bucket.total_sold_cents, 300);
        assert_eq!(bucket.total_cost_cents, 150);
        assert_eq!(bucket.profit_cents, 150);
        assert_eq!(report.total.total_profit_cents, 150);
    }

    #[tokio::test]
    async fn test_restock_reprice_moves_reported_profit() {
        let (db, product_id, _) = setup().await;

        // cost basis rises to 80 after the sale; the report follows it
        db.inventory()
            .restock(
                &product_id,
                &[khata_core::RestockLine {
                    unit: "bag".to_string(),
                    quantity: 10,
                    price_per_unit_cents: 80,
                }],
            )
            .await
            .unwrap();

        let rows = db.reports().statement_rows(None, None).await.unwrap();
        assert_eq!(rows[0].cost_cents, 240); // 3 * 80
        assert_eq!(rows[0].profit_cents, 60);
    }

    #[tokio::test]
    async fn test_category_rename_moves_the_bucket() {
        let (db, product_id, _) = setup().await;

        db.catalog()
            .update_product(
                &product_id,
                ProductUpdate {
                    category: Some(CategoryRef::new("c-1", "building material")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = db.reports().profit_summary(None, None).await.unwrap();
        assert!(report.summary.get("cement").is_none());
        assert!(report.summary.get("building material").is_some());
    }

    #[tokio::test]
    async fn test_sold_unit_gone_falls_back_to_first_item() {
        let (db, product_id, _) = setup().await;

        // the "bag" item disappears; costing falls back to the first item
        db.catalog()
            .update_product(
                &product_id,
                ProductUpdate {
                    items: Some(vec![NewStockItem {
                        unit: "tonne".to_string(),
                        quantity: 2,
                        price_per_unit_cents: 70,
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let rows = db.reports().statement_rows(None, None).await.unwrap();
        assert_eq!(rows[0].cost_cents, 210); // 3 * 70, first-item fallback
    }

    #[tokio::test]
    async fn test_deleted_product_lines_are_skipped() {
        let (db, product_id, _) = setup().await;

        db.catalog().delete_product(&product_id).await.unwrap();

        let rows = db.reports().statement_rows(None, None).await.unwrap();
        assert!(rows.is_empty());

        let report = db.reports().profit_summary(None, None).await.unwrap();
        assert_eq!(report.total.total_profit_cents, 0);
    }

    #[tokio::test]
    async fn test_date_window_excludes_outside_sales() {
        let (db, _, _) = setup().await;

        let past_cutoff = Utc::now() - chrono::Duration::days(1);
        let rows = db
            .reports()
            .statement_rows(None, Some(past_cutoff))
            .await
            .unwrap();
        assert!(rows.is_empty());

        let rows = db
            .reports()
            .statement_rows(Some(past_cutoff), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
