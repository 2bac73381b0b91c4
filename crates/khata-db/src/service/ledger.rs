//! # Ledger Service
//!
//! Atomic sale creation: every stock reservation and the ledger append
//! happen in one database transaction, so a failure on any line leaves no
//! trace of the attempt.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     create_transaction                                  │
//! │                                                                         │
//! │  NewTransaction ──► validate (before any store access)                  │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  customer exists? ──no──► NotFound, ROLLBACK                            │
//! │       │                                                                 │
//! │       ▼  per line                                                       │
//! │  resolve unit (explicit, else product's first stock item)               │
//! │  reserve stock (guarded decrement) ──0 rows──► InsufficientStock,       │
//! │       │                                        ROLLBACK everything      │
//! │       ▼                                                                 │
//! │  INSERT transaction + frozen line snapshots                             │
//! │  refresh product grand totals                                           │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! │  Transaction { total, paid, balance, status }                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frozen Snapshots
//! Each line stores product id, resolved unit, quantity, and the sale price
//! at the moment of sale. Later catalog edits never rewrite ledger history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::service::error::{EngineError, EngineResult};
use crate::service::inventory;
use khata_core::validation;
use khata_core::{
    Money, NewTransaction, Transaction, TransactionLine, TransactionStatus,
};

/// Service for appending sales to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerService {
    pool: SqlitePool,
}

impl LedgerService {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerService { pool }
    }

    /// Creates a sale: reserves stock for every line and appends the ledger
    /// entry, all in one database transaction.
    ///
    /// An up-front payment above the sale total is rejected; the ledger
    /// never records a negative balance.
    pub async fn create_transaction(&self, input: NewTransaction) -> EngineResult<Transaction> {
        validation::validate_new_transaction(&input)?;

        debug!(
            customer_id = %input.customer_id,
            lines = input.lines.len(),
            "Creating transaction"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let customer_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
                .bind(&input.customer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;
        if customer_exists.is_none() {
            return Err(EngineError::not_found("Customer", &input.customer_id));
        }

        let transaction_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut lines = Vec::with_capacity(input.lines.len());
        let mut total = Money::zero();

        for line in &input.lines {
            // Explicit unit wins; otherwise the product's first stock item.
            let unit = match &line.unit {
                Some(unit) => unit.trim().to_string(),
                None => {
                    let first: Option<String> = sqlx::query_scalar(
                        r#"
                        SELECT unit FROM stock_items
                        WHERE product_id = ?1
                        ORDER BY position LIMIT 1
                        "#,
                    )
                    .bind(&line.product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(DbError::from)?;

                    match first {
                        Some(unit) => unit,
                        None => {
                            return Err(inventory::stock_item_missing(
                                &mut tx,
                                &line.product_id,
                                "*",
                            )
                            .await)
                        }
                    }
                }
            };

            inventory::reserve_stock(&mut tx, &line.product_id, &unit, line.quantity).await?;

            let line_total = Money::from_cents(line.price_per_unit_cents)
                .checked_mul(line.quantity)
                .ok_or_else(|| EngineError::Validation(
                    khata_core::ValidationError::OutOfRange {
                        field: "total".to_string(),
                        min: 0,
                        max: i64::MAX,
                    },
                ))?;
            total = total.checked_add(line_total).ok_or_else(|| {
                EngineError::Validation(khata_core::ValidationError::OutOfRange {
                    field: "total".to_string(),
                    min: 0,
                    max: i64::MAX,
                })
            })?;

            lines.push(TransactionLine {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction_id.clone(),
                product_id: line.product_id.clone(),
                category_id: line.category_id.clone(),
                sub_category_id: line.sub_category_id.clone(),
                child_category_id: line.child_category_id.clone(),
                unit,
                quantity: line.quantity,
                price_per_unit_cents: line.price_per_unit_cents,
                total_cents: line_total.cents(),
            });
        }

        let paid = Money::from_cents(input.paid_cents);
        if paid > total {
            return Err(EngineError::Validation(
                khata_core::ValidationError::OutOfRange {
                    field: "paidAmount".to_string(),
                    min: 0,
                    max: total.cents(),
                },
            ));
        }
        let balance = total - paid;
        let status = TransactionStatus::for_balance(balance);

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, customer_id, total_cents, paid_cents, balance_cents,
                status, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&transaction_id)
        .bind(&input.customer_id)
        .bind(total.cents())
        .bind(paid.cents())
        .bind(balance.cents())
        .bind(status)
        .bind(&input.created_by)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, product_id,
                    category_id, sub_category_id, child_category_id,
                    unit, quantity, price_per_unit_cents, total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&line.id)
            .bind(&line.transaction_id)
            .bind(&line.product_id)
            .bind(&line.category_id)
            .bind(&line.sub_category_id)
            .bind(&line.child_category_id)
            .bind(&line.unit)
            .bind(line.quantity)
            .bind(line.price_per_unit_cents)
            .bind(line.total_cents)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        }

        // Stored grand totals track the (unchanged) purchase-side counters,
        // but updated_at should still move with the sale.
        let mut touched: Vec<&str> = lines.iter().map(|l| l.product_id.as_str()).collect();
        touched.sort_unstable();
        touched.dedup();
        for product_id in touched {
            inventory::refresh_grand_total(&mut tx, product_id).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %transaction_id,
            customer_id = %input.customer_id,
            total_cents = total.cents(),
            paid_cents = paid.cents(),
            "Transaction created"
        );

        Ok(Transaction {
            id: transaction_id,
            customer_id: input.customer_id,
            lines,
            total_cents: total.cents(),
            paid_cents: paid.cents(),
            balance_cents: balance.cents(),
            status,
            created_by: input.created_by,
            created_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
