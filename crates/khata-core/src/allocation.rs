//! # Payment Allocation
//!
//! The pure FIFO fold at the heart of the Payment Reconciler.
//!
//! ## Allocation Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    FIFO Payment Allocation                              │
//! │                                                                         │
//! │  Incoming payment: 60                                                   │
//! │                                                                         │
//! │  Transactions ordered by created_at ASC (oldest debt first):            │
//! │                                                                         │
//! │    T1 balance 50 ──► pay min(50, 60) = 50 ──► balance 0, status Paid    │
//! │    T2 balance 30 ──► pay min(30, 10) = 10 ──► balance 20, Pending       │
//! │    T3 balance 20 ──► remaining is 0, untouched                          │
//! │                                                                         │
//! │  remaining after walk: 0                                                │
//! │                                                                         │
//! │  Excess beyond all balances is NOT applied anywhere: it is reported     │
//! │  as `remaining_cents` and discarded by the caller (documented           │
//! │  limitation, never auto-credited to future transactions).               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is a pure function over already-ordered balances: the caller
//! owns the `created_at ASC` ordering and the persistence of each entry.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::TransactionStatus;

// =============================================================================
// Inputs
// =============================================================================

/// The payment-relevant slice of one transaction, in FIFO order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingBalance {
    pub transaction_id: String,
    /// Frozen transaction total in cents.
    pub total_cents: i64,
    /// Amount already paid in cents.
    pub paid_cents: i64,
}

impl OutstandingBalance {
    /// Outstanding amount owed: `total - paid`, clamped at zero so an
    /// over-paid row reads as settled rather than as negative debt.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.total_cents)
            .saturating_sub_floor_zero(Money::from_cents(self.paid_cents))
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// One transaction's post-allocation state. Persisting an entry must set all
/// three payment-tracking fields together so the reconciliation invariant
/// `balance == total - paid` holds at every observable point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub transaction_id: String,
    /// Portion of the incoming payment applied to this transaction.
    pub applied_cents: i64,
    /// New cumulative paid amount.
    pub paid_cents: i64,
    /// New outstanding balance; never negative.
    pub balance_cents: i64,
    /// Derived from the new balance.
    pub status: TransactionStatus,
}

/// The full allocation plan for one incoming payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Updates for the transactions that received money, in walk order.
    /// Transactions the walk skipped (already settled) or never reached do
    /// not appear.
    pub entries: Vec<AllocationEntry>,
    /// Total applied across all entries.
    pub allocated_cents: i64,
    /// Unapplied excess; to be discarded, never negative.
    pub remaining_cents: i64,
}

// =============================================================================
// The Fold
// =============================================================================

/// Allocates a payment across outstanding balances, oldest first.
///
/// ## Contract
/// - `outstanding` must already be ordered by `created_at ASC`
/// - walks the list with a `remaining` counter initialized to `payment_cents`
/// - settled transactions (balance <= 0) are skipped untouched
/// - each funded transaction receives `min(balance, remaining)`
/// - stops as soon as `remaining` hits zero
///
/// ## Purity
/// No I/O, no clock, no randomness: the same inputs always produce the same
/// plan, which makes every ledger scenario directly testable.
pub fn allocate_fifo(payment_cents: i64, outstanding: &[OutstandingBalance]) -> AllocationPlan {
    let mut remaining = Money::from_cents(payment_cents.max(0));
    let mut entries = Vec::new();
    let mut allocated = Money::zero();

    for tx in outstanding {
        if remaining.is_zero() {
            break;
        }

        let balance = tx.balance();
        if !balance.is_positive() {
            continue;
        }

        let applied = balance.min(remaining);
        let paid_after = Money::from_cents(tx.paid_cents) + applied;
        let balance_after = Money::from_cents(tx.total_cents) - paid_after;

        entries.push(AllocationEntry {
            transaction_id: tx.transaction_id.clone(),
            applied_cents: applied.cents(),
            paid_cents: paid_after.cents(),
            balance_cents: balance_after.cents(),
            status: TransactionStatus::for_balance(balance_after),
        });

        allocated += applied;
        remaining -= applied;
    }

    AllocationPlan {
        entries,
        allocated_cents: allocated.cents(),
        remaining_cents: remaining.cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn owed(id: &str, total: i64, paid: i64) -> OutstandingBalance {
        OutstandingBalance {
            transaction_id: id.to_string(),
            total_cents: total,
            paid_cents: paid,
        }
    }

    #[test]
    fn test_fifo_clears_oldest_first() {
        // T1(50, oldest), T2(30), T3(20, newest); payment of 60
        let outstanding = vec![owed("t1", 50, 0), owed("t2", 30, 0), owed("t3", 20, 0)];

        let plan = allocate_fifo(60, &outstanding);

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].transaction_id, "t1");
        assert_eq!(plan.entries[0].applied_cents, 50);
        assert_eq!(plan.entries[0].balance_cents, 0);
        assert_eq!(plan.entries[0].status, TransactionStatus::Paid);

        assert_eq!(plan.entries[1].transaction_id, "t2");
        assert_eq!(plan.entries[1].applied_cents, 10);
        assert_eq!(plan.entries[1].balance_cents, 20);
        assert_eq!(plan.entries[1].status, TransactionStatus::Pending);

        assert_eq!(plan.allocated_cents, 60);
        assert_eq!(plan.remaining_cents, 0);
    }

    #[test]
    fn test_partially_paid_transactions_continue_from_paid() {
        let outstanding = vec![owed("t1", 100, 70)];

        let plan = allocate_fifo(30, &outstanding);

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].paid_cents, 100);
        assert_eq!(plan.entries[0].balance_cents, 0);
        assert_eq!(plan.entries[0].status, TransactionStatus::Paid);
    }

    #[test]
    fn test_settled_transactions_are_skipped() {
        let outstanding = vec![owed("t1", 50, 50), owed("t2", 30, 0)];

        let plan = allocate_fifo(10, &outstanding);

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].transaction_id, "t2");
        assert_eq!(plan.entries[0].balance_cents, 20);
    }

    #[test]
    fn test_overpayment_leaves_excess_unapplied() {
        // All balances already zero; payment of 100 goes nowhere
        let outstanding = vec![owed("t1", 50, 50), owed("t2", 30, 30)];

        let plan = allocate_fifo(100, &outstanding);

        assert!(plan.entries.is_empty());
        assert_eq!(plan.allocated_cents, 0);
        assert_eq!(plan.remaining_cents, 100);
    }

    #[test]
    fn test_overpaid_row_reads_as_settled() {
        // A row with paid > total is malformed upstream; it must be skipped,
        // not treated as negative debt that absorbs payment
        let outstanding = vec![owed("t1", 50, 80), owed("t2", 30, 0)];

        assert!(outstanding[0].balance().is_zero());

        let plan = allocate_fifo(30, &outstanding);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].transaction_id, "t2");
        assert_eq!(plan.entries[0].balance_cents, 0);
    }

    #[test]
    fn test_no_balance_goes_negative() {
        let outstanding = vec![owed("t1", 40, 0), owed("t2", 25, 0)];

        let plan = allocate_fifo(1_000, &outstanding);

        for entry in &plan.entries {
            assert!(entry.balance_cents >= 0);
            assert_eq!(entry.status, TransactionStatus::Paid);
        }
        assert_eq!(plan.allocated_cents, 65);
        assert_eq!(plan.remaining_cents, 935);
    }

    #[test]
    fn test_entries_reconcile() {
        let outstanding = vec![owed("t1", 80, 15), owed("t2", 60, 0)];

        let plan = allocate_fifo(90, &outstanding);

        for (entry, tx) in plan.entries.iter().zip(&outstanding) {
            assert_eq!(entry.balance_cents, tx.total_cents - entry.paid_cents);
        }
        assert_eq!(plan.allocated_cents + plan.remaining_cents, 90);
    }

    #[test]
    fn test_empty_list_allocates_nothing() {
        let plan = allocate_fifo(50, &[]);
        assert!(plan.entries.is_empty());
        assert_eq!(plan.remaining_cents, 50);
    }
}
