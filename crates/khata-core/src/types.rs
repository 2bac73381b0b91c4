//! # Domain Types
//!
//! Core domain types for the khata stock-and-ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Product      │   │   Transaction   │   │    Customer     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │        │
//! │  │  taxonomy triple│   │  total/paid/    │   │  name           │        │
//! │  │  items: Vec<    │   │  balance (cents)│   │  phone          │        │
//! │  │    StockItem>   │   │  status         │   │  address        │        │
//! │  │  grand_total    │   │  lines (frozen) │   └─────────────────┘        │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  StockItem: one unit-of-measure inventory line within a Product.        │
//! │  TransactionLine: one frozen product-and-quantity entry within a sale.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `TransactionLine` freezes what was sold and at what price. Later catalog
//! price changes never rewrite history; only the Payment Reconciler touches a
//! transaction after creation, and only its paid/balance/status fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Category Reference
// =============================================================================

/// A denormalized taxonomy reference frozen onto a product at creation time.
///
/// The (category, sub-category, child-category) triple is copied, not
/// referenced live: renaming taxonomy nodes does not rewrite products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Taxonomy node id; required for the top-level category, optional below.
    pub id: Option<String>,
    /// Display name as it stood at product creation.
    pub name: String,
}

impl CategoryRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        CategoryRef {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    pub fn unnamed_id(id: impl Into<String>) -> Self {
        CategoryRef {
            id: Some(id.into()),
            name: String::new(),
        }
    }
}

// =============================================================================
// Stock Item
// =============================================================================

/// One unit-of-measure inventory line within a product.
///
/// ## Counters
/// - `available_quantity`: current sellable balance; decreases on sale,
///   increases on restock
/// - `total_purchased_quantity`: cumulative intake; never decreases
///
/// ## Invariant
/// `available_quantity <= total_purchased_quantity` after every restock and
/// every successful sale (stock sold ≤ stock ever purchased).
///
/// ## Line Total
/// `line_total_cents = total_purchased_quantity * price_per_unit_cents`.
/// This is the cumulative cost basis at the latest price, NOT the value of
/// stock currently on hand. Carried deliberately from the source system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockItem {
    /// Unit-of-measure label ("bag", "kg", "pcs"). Stock items are keyed by
    /// unit within their product; positional identity is not used.
    pub unit: String,

    /// Stable display order within the product's item list.
    pub position: i64,

    /// Current sellable balance.
    pub available_quantity: i64,

    /// Monotonically non-decreasing cumulative intake.
    pub total_purchased_quantity: i64,

    /// Latest cost basis per unit, in cents. Overwritten (not averaged) on
    /// restock.
    pub price_per_unit_cents: i64,

    /// Derived: `total_purchased_quantity * price_per_unit_cents`.
    /// Recomputed unconditionally before every persistence.
    pub line_total_cents: i64,
}

impl StockItem {
    /// Returns the per-unit cost basis as Money.
    #[inline]
    pub fn price_per_unit(&self) -> Money {
        Money::from_cents(self.price_per_unit_cents)
    }

    /// Recomputes the derived line total from the cumulative purchased
    /// quantity and the current price.
    pub fn recompute_line_total(&mut self) {
        self.line_total_cents = self.total_purchased_quantity * self.price_per_unit_cents;
    }

    /// Checks the stock counter invariant.
    pub fn counters_consistent(&self) -> bool {
        self.available_quantity <= self.total_purchased_quantity
    }
}

// =============================================================================
// Product
// =============================================================================

/// One sellable catalog entry tied to a frozen taxonomy triple, holding an
/// ordered list of stock items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product title shown in listings; substring-searchable.
    pub title: String,

    /// Top-level category (id and name required).
    pub category: CategoryRef,

    /// Sub-category (name required, id optional).
    pub sub_category: CategoryRef,

    /// Child-category leaf, if any.
    pub child_category: Option<CategoryRef>,

    /// Unit-of-measure stock lines, ordered by `position`.
    pub items: Vec<StockItem>,

    /// Derived: sum of all stock item line totals. Recomputed on every save.
    pub grand_total_cents: i64,

    /// Opaque authenticated-actor id supplied by the auth collaborator.
    pub created_by: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Recomputes every stock item's line total and the product grand total.
    ///
    /// The catalog store calls this unconditionally before persistence; it is
    /// the store-level invariant guard, independent of caller discipline.
    pub fn recompute_totals(&mut self) {
        let mut grand = 0i64;
        for item in &mut self.items {
            item.recompute_line_total();
            grand += item.line_total_cents;
        }
        self.grand_total_cents = grand;
    }

    /// Finds a stock item by its unit label.
    pub fn item_by_unit(&self, unit: &str) -> Option<&StockItem> {
        self.items.iter().find(|i| i.unit == unit)
    }

    /// The first stock item by display order, used when a caller does not
    /// target a specific unit.
    pub fn first_item(&self) -> Option<&StockItem> {
        self.items.first()
    }

    /// Grand total as Money.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A ledger customer. Created once, referenced by many transactions; never
/// mutated by the reconciliation core itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Phone number; uniqueness is a UI-layer concern, not enforced here.
    pub phone: String,
    pub address: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Payment status of a transaction. Derived: `Paid` iff `balance == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum TransactionStatus {
    /// Outstanding balance remains.
    Pending,
    /// Fully settled.
    Paid,
}

impl TransactionStatus {
    /// Derives the status from a balance, the single source of truth.
    #[inline]
    pub fn for_balance(balance: Money) -> Self {
        if balance.is_zero() {
            TransactionStatus::Paid
        } else {
            TransactionStatus::Pending
        }
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

// =============================================================================
// Transaction Line
// =============================================================================

/// One frozen product-and-quantity entry within a transaction.
///
/// The sold product is referenced explicitly by `product_id`, and the stock
/// item it drew from is named by `unit` — both first-class parts of the
/// line-item contract, never implied by array position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionLine {
    pub id: String,
    pub transaction_id: String,

    /// The catalog product this line sold from.
    pub product_id: String,

    /// Taxonomy triple as sold (frozen snapshot).
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub child_category_id: Option<String>,

    /// Unit of the stock item that was decremented (frozen).
    pub unit: String,

    /// Quantity sold.
    pub quantity: i64,

    /// Sale price per unit in cents at time of sale (frozen).
    pub price_per_unit_cents: i64,

    /// Line total in cents: `price_per_unit_cents * quantity` (frozen).
    pub total_cents: i64,
}

impl TransactionLine {
    /// Line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable sale event, except for the payment-tracking fields that only
/// the Payment Reconciler updates.
///
/// ## Invariant
/// `balance_cents == total_cents - paid_cents`, always >= 0, and
/// `status == Paid` iff `balance_cents == 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub customer_id: String,

    /// Frozen line-item snapshots.
    pub lines: Vec<TransactionLine>,

    /// Sum of line totals at creation time; never recomputed afterward.
    pub total_cents: i64,

    /// Mutable, updated only by the Payment Reconciler.
    pub paid_cents: i64,

    /// Mutable: `total_cents - paid_cents`.
    pub balance_cents: i64,

    pub status: TransactionStatus,

    pub created_by: Option<String>,

    /// Immutable creation timestamp; the allocation/replay ordering key.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Checks the ledger reconciliation invariant.
    pub fn reconciles(&self) -> bool {
        self.balance_cents == self.total_cents - self.paid_cents
            && self.balance_cents >= 0
            && self.status == TransactionStatus::for_balance(Money::from_cents(self.balance_cents))
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Write-Side Inputs
// =============================================================================

/// Input for creating a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub category: CategoryRef,
    pub sub_category: CategoryRef,
    pub child_category: Option<CategoryRef>,
    pub items: Vec<NewStockItem>,
    pub created_by: String,
}

/// One incoming stock line on product creation or full item replacement.
///
/// The initial quantity counts as intake: both `available_quantity` and
/// `total_purchased_quantity` start at `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockItem {
    pub unit: String,
    pub quantity: i64,
    pub price_per_unit_cents: i64,
}

/// Input for creating a ledger customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_by: Option<String>,
}

/// Input for updating a catalog product. `items: Some(_)` replaces the full
/// item list; `None` leaves stock lines untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub category: Option<CategoryRef>,
    pub sub_category: Option<CategoryRef>,
    /// Nested option: `None` leaves the child category as is,
    /// `Some(None)` clears it, `Some(Some(_))` replaces it.
    pub child_category: Option<Option<CategoryRef>>,
    pub items: Option<Vec<NewStockItem>>,
}

/// One incoming restock line, matched to an existing stock item by unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockLine {
    pub unit: String,
    /// Added intake; increments both stock counters.
    pub quantity: i64,
    /// New cost basis; overwrites the stored price (not averaged).
    pub price_per_unit_cents: i64,
}

/// Input for creating a sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub customer_id: String,
    pub lines: Vec<NewTransactionLine>,
    /// Amount paid up front; the rest becomes the opening balance.
    pub paid_cents: i64,
    pub created_by: Option<String>,
}

/// One requested sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionLine {
    pub product_id: String,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub child_category_id: Option<String>,
    /// Target stock item by unit; `None` falls back to the product's first
    /// stock item, and the resolved unit is frozen onto the line.
    pub unit: Option<String>,
    pub quantity: i64,
    pub price_per_unit_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(unit: &str, available: i64, purchased: i64, price: i64) -> StockItem {
        StockItem {
            unit: unit.to_string(),
            position: 0,
            available_quantity: available,
            total_purchased_quantity: purchased,
            price_per_unit_cents: price,
            line_total_cents: 0,
        }
    }

    #[test]
    fn test_recompute_totals_overrides_caller_values() {
        let mut product = Product {
            id: "p-1".to_string(),
            title: "Cement".to_string(),
            category: CategoryRef::new("c-1", "cement"),
            sub_category: CategoryRef::new("s-1", "ultratech"),
            child_category: None,
            items: vec![item("bag", 10, 10, 100), item("kg", 5, 20, 7)],
            grand_total_cents: 999_999, // lying caller value
            created_by: "actor-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        product.recompute_totals();

        assert_eq!(product.items[0].line_total_cents, 1000);
        assert_eq!(product.items[1].line_total_cents, 140);
        assert_eq!(product.grand_total_cents, 1140);
    }

    #[test]
    fn test_stock_counters_consistent() {
        assert!(item("bag", 5, 10, 100).counters_consistent());
        assert!(item("bag", 10, 10, 100).counters_consistent());
        assert!(!item("bag", 11, 10, 100).counters_consistent());
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(
            TransactionStatus::for_balance(Money::zero()),
            TransactionStatus::Paid
        );
        assert_eq!(
            TransactionStatus::for_balance(Money::from_cents(1)),
            TransactionStatus::Pending
        );
    }

    #[test]
    fn test_transaction_reconciles() {
        let tx = Transaction {
            id: "t-1".to_string(),
            customer_id: "c-1".to_string(),
            lines: vec![],
            total_cents: 100,
            paid_cents: 40,
            balance_cents: 60,
            status: TransactionStatus::Pending,
            created_by: None,
            created_at: Utc::now(),
        };
        assert!(tx.reconciles());

        let broken = Transaction {
            balance_cents: 50,
            ..tx.clone()
        };
        assert!(!broken.reconciles());

        let wrong_status = Transaction {
            status: TransactionStatus::Paid,
            ..tx
        };
        assert!(!wrong_status.reconciles());
    }

    #[test]
    fn test_item_lookup_by_unit() {
        let product = Product {
            id: "p-1".to_string(),
            title: "Rod".to_string(),
            category: CategoryRef::new("c-2", "rod"),
            sub_category: CategoryRef::new("s-2", "tata"),
            child_category: None,
            items: vec![item("bag", 10, 10, 100), item("kg", 5, 5, 7)],
            grand_total_cents: 0,
            created_by: "actor-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(product.item_by_unit("kg").unwrap().price_per_unit_cents, 7);
        assert!(product.item_by_unit("litre").is_none());
        assert_eq!(product.first_item().unwrap().unit, "bag");
    }
}
