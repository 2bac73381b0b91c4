//! # Payment Reconciler
//!
//! Applies an incoming customer payment across their outstanding
//! transactions, oldest first, and discards any excess.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               Per-Customer Serialization + One DB Txn                   │
//! │                                                                         │
//! │  allocate("cust-1", 60)      allocate("cust-1", 40)                     │
//! │       │                            │                                    │
//! │       ▼                            ▼                                    │
//! │  ┌──────────── per-customer async lock ("cust-1") ────────────┐         │
//! │  │  second caller waits; payments to OTHER customers proceed  │         │
//! │  └─────────────────────────────────────────────────────────────┘        │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  read outstanding balances (created_at ASC)                             │
//! │  plan = allocate_fifo(payment, outstanding)      ← pure, in khata-core  │
//! │  one UPDATE per funded transaction: paid/balance/status together        │
//! │       │                                                                 │
//! │       ▼  COMMIT, then notify (best-effort)                              │
//! │  AllocationOutcome { allocated, discarded }                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Excess Policy
//! Money beyond the customer's total outstanding debt is dropped, reported
//! in the outcome as `discarded_cents`. There is no credit carry-forward.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use sqlx::SqlitePool;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::service::error::{EngineError, EngineResult};
use crate::service::notify::{LogNotifier, Notifier, PaymentEvent};
use khata_core::allocation::{allocate_fifo, AllocationEntry};
use khata_core::validation;
use khata_core::TransactionStatus;

// =============================================================================
// Lock Registry
// =============================================================================

/// Lazily-created async lock per customer id.
///
/// The outer mutex only guards the map; the per-customer lock is held across
/// the whole allocation, including its awaits.
#[derive(Debug, Clone, Default)]
pub struct CustomerLocks {
    inner: Arc<StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl CustomerLocks {
    fn lock_for(&self, customer_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        map.entry(customer_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// What happened to one incoming payment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AllocationOutcome {
    pub customer_id: String,
    /// Amount submitted, in cents.
    pub payment_cents: i64,
    /// Portion applied across outstanding transactions.
    pub allocated_cents: i64,
    /// Unapplied excess, dropped by policy.
    pub discarded_cents: i64,
    /// Post-allocation state of every funded transaction, in walk order.
    pub updated: Vec<AllocationEntry>,
}

impl AllocationOutcome {
    /// How many transactions became fully paid.
    pub fn settled_count(&self) -> usize {
        self.updated
            .iter()
            .filter(|e| e.status == TransactionStatus::Paid)
            .count()
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Service that allocates customer payments over the ledger.
#[derive(Clone)]
pub struct PaymentReconciler {
    pool: SqlitePool,
    locks: CustomerLocks,
    notifier: Arc<dyn Notifier>,
}

impl PaymentReconciler {
    pub fn new(pool: SqlitePool, locks: CustomerLocks) -> Self {
        PaymentReconciler {
            pool,
            locks,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Replaces the default logging notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Allocates `payment_cents` across the customer's outstanding
    /// transactions, oldest first.
    ///
    /// ## Errors
    /// - `Validation` for a zero or negative amount or a malformed customer
    ///   id, before any store access
    /// - `NotFound` for an unknown customer, or for a customer with no
    ///   ledger at all
    pub async fn allocate(
        &self,
        customer_id: &str,
        payment_cents: i64,
    ) -> EngineResult<AllocationOutcome> {
        validation::validate_payment_amount(payment_cents)?;
        validation::validate_uuid("customerId", customer_id)?;

        // Serialize allocations per customer; other customers are unaffected.
        let lock = self.locks.lock_for(customer_id);
        let _guard = lock.lock().await;

        debug!(customer_id = %customer_id, payment_cents, "Allocating payment");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let customer_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;
        if customer_exists.is_none() {
            return Err(EngineError::not_found("Customer", customer_id));
        }

        let ledger_size: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE customer_id = ?1")
                .bind(customer_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(DbError::from)?;
        if ledger_size == 0 {
            return Err(EngineError::not_found("Transaction", customer_id));
        }

        #[derive(sqlx::FromRow)]
        struct Row {
            id: String,
            total_cents: i64,
            paid_cents: i64,
        }

        let outstanding: Vec<khata_core::allocation::OutstandingBalance> =
            sqlx::query_as::<_, Row>(
                r#"
                SELECT id, total_cents, paid_cents
                FROM transactions
                WHERE customer_id = ?1 AND balance_cents > 0
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(customer_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(DbError::from)?
            .into_iter()
            .map(|r| khata_core::allocation::OutstandingBalance {
                transaction_id: r.id,
                total_cents: r.total_cents,
                paid_cents: r.paid_cents,
            })
            .collect();

        let plan = allocate_fifo(payment_cents, &outstanding);

        // All three payment-tracking fields move together, so the schema's
        // balance = total - paid CHECK holds at every point.
        for entry in &plan.entries {
            sqlx::query(
                r#"
                UPDATE transactions
                SET paid_cents = ?2, balance_cents = ?3, status = ?4
                WHERE id = ?1
                "#,
            )
            .bind(&entry.transaction_id)
            .bind(entry.paid_cents)
            .bind(entry.balance_cents)
            .bind(entry.status)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        }

        tx.commit().await.map_err(DbError::from)?;

        let outcome = AllocationOutcome {
            customer_id: customer_id.to_string(),
            payment_cents,
            allocated_cents: plan.allocated_cents,
            discarded_cents: plan.remaining_cents,
            updated: plan.entries,
        };

        if outcome.discarded_cents > 0 {
            warn!(
                customer_id = %customer_id,
                discarded_cents = outcome.discarded_cents,
                "Payment exceeded outstanding debt; excess discarded"
            );
        }
        info!(
            customer_id = %customer_id,
            allocated_cents = outcome.allocated_cents,
            settled = outcome.settled_count(),
            "Payment allocated"
        );

        self.notifier.payment_recorded(&PaymentEvent {
            customer_id: outcome.customer_id.clone(),
            payment_cents: outcome.payment_cents,
            allocated_cents: outcome.allocated_cents,
            discarded_cents: outcome.discarded_cents,
            settled_count: outcome.settled_count(),
        });

        Ok(outcome)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
