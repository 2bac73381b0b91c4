//! # Customer Repository
//!
//! Database operations for ledger customers, including the balance rollup
//! used by the customer listing screen.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::Customer;

/// A customer joined with the aggregate state of their ledger.
///
/// Totals are summed over every transaction the customer has; a customer
/// with no transactions rolls up as all zeros.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct CustomerWithBalance {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Sum of transaction totals, in cents.
    pub total_cents: i64,
    /// Sum of amounts paid, in cents.
    pub paid_cents: i64,
    /// Sum of outstanding balances, in cents.
    pub balance_cents: i64,
    /// Number of transactions on the ledger.
    pub transaction_count: i64,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, address, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.created_by)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    /// Gets a customer by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Customer))` - Customer found
    /// * `Ok(None)` - Customer not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, address, created_by, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists customers, optionally filtered by a name or phone substring.
    pub async fn list(&self, filter: Option<&str>) -> DbResult<Vec<Customer>> {
        let pattern = filter.map(|f| format!("%{}%", f.trim()));

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, address, created_by, created_at
            FROM customers
            WHERE (?1 IS NULL OR name LIKE ?1 OR phone LIKE ?1)
            ORDER BY name
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Lists customers with their ledger rollups, largest outstanding
    /// balance first.
    ///
    /// ## How It Works
    /// LEFT JOIN so customers with no transactions still appear, with every
    /// aggregate coalesced to zero.
    pub async fn list_with_balances(&self) -> DbResult<Vec<CustomerWithBalance>> {
        debug!("Listing customers with balance rollups");

        let rows = sqlx::query_as::<_, CustomerWithBalance>(
            r#"
            SELECT
                c.id,
                c.name,
                c.phone,
                c.address,
                c.created_at,
                COALESCE(SUM(t.total_cents), 0)   AS total_cents,
                COALESCE(SUM(t.paid_cents), 0)    AS paid_cents,
                COALESCE(SUM(t.balance_cents), 0) AS balance_cents,
                COUNT(t.id)                       AS transaction_count
            FROM customers c
            LEFT JOIN transactions t ON t.customer_id = c.id
            GROUP BY c.id
            ORDER BY balance_cents DESC, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes a customer.
    ///
    /// Fails with a foreign key violation if transactions still reference
    /// the customer; the ledger is never silently orphaned.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Counts total customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
