//! # Transaction Repository
//!
//! Read-side database operations for sale transactions and their frozen
//! line-item snapshots.
//!
//! ## Write Paths Live Elsewhere
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Who Touches The Transactions Table                     │
//! │                                                                         │
//! │  INSERT ──► LedgerService::create_transaction                           │
//! │             (atomic with the stock decrements, single DB transaction)   │
//! │                                                                         │
//! │  UPDATE ──► PaymentReconciler::allocate                                 │
//! │             (only paid/balance/status, oldest-first walk)               │
//! │                                                                         │
//! │  This repository only reads: by-id lookups, customer statements,        │
//! │  pagination, date windows, and the outstanding-balance projection the   │
//! │  reconciler plans against.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use khata_core::allocation::OutstandingBalance;
use khata_core::{Transaction, TransactionLine, TransactionStatus};

// =============================================================================
// Row Types
// =============================================================================

/// Flat `transactions` row; lines are attached in a second query.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    customer_id: String,
    total_cents: i64,
    paid_cents: i64,
    balance_cents: i64,
    status: TransactionStatus,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self, lines: Vec<TransactionLine>) -> Transaction {
        Transaction {
            id: self.id,
            customer_id: self.customer_id,
            lines,
            total_cents: self.total_cents,
            paid_cents: self.paid_cents,
            balance_cents: self.balance_cents,
            status: self.status,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

const SELECT_TRANSACTION: &str = r#"
    SELECT id, customer_id, total_cents, paid_cents, balance_cents,
           status, created_by, created_at
    FROM transactions
"#;

const SELECT_LINES: &str = r#"
    SELECT id, transaction_id, product_id,
           category_id, sub_category_id, child_category_id,
           unit, quantity, price_per_unit_cents, total_cents
    FROM transaction_items
"#;

// =============================================================================
// Listing Query
// =============================================================================

/// Parameters for the paged transaction listing.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    /// 1-based page number.
    pub page: i64,
    pub per_page: i64,
    /// Customer name or phone substring.
    pub search: Option<String>,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        TransactionQuery {
            page: 1,
            per_page: 20,
            search: None,
        }
    }
}

/// One page of transactions plus pagination math.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub total: i64,
    pub pages_count: i64,
    pub page: i64,
    pub per_page: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for transaction read operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by ID, with its frozen lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, TransactionLine>(&format!(
            "{SELECT_LINES} WHERE transaction_id = ?1"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_transaction(lines)))
    }

    /// Lists a customer's transactions, oldest first.
    ///
    /// Oldest-first is the statement order and the payment allocation order;
    /// callers that want newest-first reverse in memory.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Transaction>> {
        debug!(customer_id = %customer_id, "Listing customer transactions");

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} WHERE customer_id = ?1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, TransactionLine>(&format!(
            r#"{SELECT_LINES}
            WHERE transaction_id IN (SELECT id FROM transactions WHERE customer_id = ?1)
            "#
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_lines(rows, lines))
    }

    /// Lists one page of transactions, newest first, optionally filtered by
    /// a customer name or phone substring.
    pub async fn list_page(&self, query: &TransactionQuery) -> DbResult<TransactionPage> {
        let pattern = query.search.as_deref().map(|f| format!("%{}%", f.trim()));
        let per_page = query.per_page.max(1);
        let page = query.page.max(1);

        debug!(filter = ?pattern, page, "Listing transactions");

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM transactions t
            INNER JOIN customers c ON c.id = t.customer_id
            WHERE (?1 IS NULL OR c.name LIKE ?1 OR c.phone LIKE ?1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT t.id, t.customer_id, t.total_cents, t.paid_cents, t.balance_cents,
                   t.status, t.created_by, t.created_at
            FROM transactions t
            INNER JOIN customers c ON c.id = t.customer_id
            WHERE (?1 IS NULL OR c.name LIKE ?1 OR c.phone LIKE ?1)
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(&pattern)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, TransactionLine>(&format!(
            r#"{SELECT_LINES}
            WHERE transaction_id IN (
                SELECT t.id FROM transactions t
                INNER JOIN customers c ON c.id = t.customer_id
                WHERE (?1 IS NULL OR c.name LIKE ?1 OR c.phone LIKE ?1)
                ORDER BY t.created_at DESC, t.id DESC
                LIMIT ?2 OFFSET ?3
            )
            "#
        ))
        .bind(&pattern)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        Ok(TransactionPage {
            items: attach_lines(rows, lines),
            total,
            pages_count: (total + per_page - 1) / per_page,
            page,
            per_page,
        })
    }

    /// Lists transactions inside an optional date window, oldest first.
    ///
    /// Either bound may be absent; `None`/`None` returns everything.
    pub async fn list_in_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"{SELECT_TRANSACTION}
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, TransactionLine>(&format!(
            r#"{SELECT_LINES}
            WHERE transaction_id IN (
                SELECT id FROM transactions
                WHERE (?1 IS NULL OR created_at >= ?1)
                  AND (?2 IS NULL OR created_at <= ?2)
            )
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_lines(rows, lines))
    }

    /// Projects a customer's unsettled transactions into the outstanding
    /// balances the payment reconciler plans against, oldest first.
    pub async fn outstanding_for_customer(
        &self,
        customer_id: &str,
    ) -> DbResult<Vec<OutstandingBalance>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: String,
            total_cents: i64,
            paid_cents: i64,
        }

        let rows = sqlx::query_as::<_, Row>(
            r#"
            SELECT id, total_cents, paid_cents
            FROM transactions
            WHERE customer_id = ?1 AND balance_cents > 0
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OutstandingBalance {
                transaction_id: r.id,
                total_cents: r.total_cents,
                paid_cents: r.paid_cents,
            })
            .collect())
    }

    /// Counts total transactions (for pagination and diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Groups fetched lines under their owning transactions, preserving the
/// transaction row order.
fn attach_lines(rows: Vec<TransactionRow>, lines: Vec<TransactionLine>) -> Vec<Transaction> {
    let mut by_tx: HashMap<String, Vec<TransactionLine>> = HashMap::new();
    for line in lines {
        by_tx
            .entry(line.transaction_id.clone())
            .or_default()
            .push(line);
    }

    rows.into_iter()
        .map(|row| {
            let lines = by_tx.remove(&row.id).unwrap_or_default();
            row.into_transaction(lines)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
