//! # Profit Fold
//!
//! Pure cost/revenue/profit aggregation over replayed transaction lines.
//!
//! ## Replay Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Profit Aggregation                                 │
//! │                                                                         │
//! │  Transactions in window ──► frozen lines ──► pair with CURRENT catalog  │
//! │                                                                         │
//! │  per line:                                                              │
//! │    revenue = line.total_cents              (frozen at sale time)        │
//! │    cost    = matched stock item price      (current catalog state)      │
//! │              * line.quantity                                            │
//! │    bucket  = current product's category    (NOT the sale snapshot)      │
//! │                                                                         │
//! │  Buckets sum into per-category totals; grand total sums the buckets.    │
//! │                                                                         │
//! │  Cost matching: exact unit-string match against the product's stock     │
//! │  items, falling back to the FIRST stock item when no unit matches.      │
//! │  That heuristic and the live-category bucket are carried from the       │
//! │  source system on purpose; reports are not historically stable under    │
//! │  catalog edits.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The queries live in khata-db; this module is the deterministic fold over
//! already-costed rows, so every pricing scenario tests without a database.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::StockItem;

// =============================================================================
// Cost Resolution
// =============================================================================

/// Resolves the per-unit cost basis for a sold line against the current
/// product's stock items.
///
/// Exact unit match wins; otherwise the first stock item is used. Returns
/// `None` only when the product has no stock items at all (cost treated as
/// zero by the caller).
pub fn resolve_cost_basis(items: &[StockItem], unit: &str) -> Option<Money> {
    items
        .iter()
        .find(|i| i.unit == unit)
        .or_else(|| items.first())
        .map(StockItem::price_per_unit)
}

// =============================================================================
// Row-Level Output
// =============================================================================

/// One costed sold line: the row-level feed consumed by the external report
/// rendering collaborator (`{date, category, quantity, sold, cost, profit}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub category: String,
    pub quantity: i64,
    pub sold_cents: i64,
    pub cost_cents: i64,
    pub profit_cents: i64,
}

impl StatementRow {
    /// Builds a row; profit is always `sold - cost`, never caller-supplied.
    pub fn new(
        date: NaiveDate,
        category: impl Into<String>,
        quantity: i64,
        sold: Money,
        cost: Money,
    ) -> Self {
        StatementRow {
            date,
            category: category.into(),
            quantity,
            sold_cents: sold.cents(),
            cost_cents: cost.cents(),
            profit_cents: (sold - cost).cents(),
        }
    }
}

// =============================================================================
// Aggregated Output
// =============================================================================

/// Per-category revenue/cost/profit bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProfit {
    pub total_sold_cents: i64,
    pub total_cost_cents: i64,
    pub profit_cents: i64,
}

/// Grand totals across all category buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitTotals {
    pub total_sold_cents: i64,
    pub total_cost_cents: i64,
    pub total_profit_cents: i64,
}

/// The Profit Aggregator output: `{summary: category → bucket, total}`.
///
/// `BTreeMap` keeps category iteration order deterministic for renderers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitReport {
    pub summary: BTreeMap<String, CategoryProfit>,
    pub total: ProfitTotals,
}

/// Folds costed rows into per-category buckets and grand totals.
pub fn build_profit_report<'a>(rows: impl IntoIterator<Item = &'a StatementRow>) -> ProfitReport {
    let mut report = ProfitReport::default();

    for row in rows {
        let bucket = report.summary.entry(row.category.clone()).or_default();
        bucket.total_sold_cents += row.sold_cents;
        bucket.total_cost_cents += row.cost_cents;
        bucket.profit_cents += row.profit_cents;

        report.total.total_sold_cents += row.sold_cents;
        report.total.total_cost_cents += row.cost_cents;
        report.total.total_profit_cents += row.profit_cents;
    }

    report
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(unit: &str, price: i64) -> StockItem {
        StockItem {
            unit: unit.to_string(),
            position: 0,
            available_quantity: 0,
            total_purchased_quantity: 0,
            price_per_unit_cents: price,
            line_total_cents: 0,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_cost_basis_exact_unit_match() {
        let items = vec![item("bag", 100), item("kg", 7)];
        assert_eq!(resolve_cost_basis(&items, "kg"), Some(Money::from_cents(7)));
    }

    #[test]
    fn test_cost_basis_falls_back_to_first_item() {
        // Unknown unit: the first stock item's price wins, even when the
        // product carries multiple differently-priced units.
        let items = vec![item("bag", 100), item("kg", 7)];
        assert_eq!(
            resolve_cost_basis(&items, "litre"),
            Some(Money::from_cents(100))
        );
    }

    #[test]
    fn test_cost_basis_empty_items() {
        assert_eq!(resolve_cost_basis(&[], "bag"), None);
    }

    #[test]
    fn test_single_line_round_trip() {
        // Sold 3 units at a line total of 300; matching cost basis 50/unit
        let row = StatementRow::new(
            date("2026-01-15"),
            "cement",
            3,
            Money::from_cents(300),
            Money::from_cents(150),
        );
        let report = build_profit_report([&row]);

        let bucket = &report.summary["cement"];
        assert_eq!(bucket.total_sold_cents, 300);
        assert_eq!(bucket.total_cost_cents, 150);
        assert_eq!(bucket.profit_cents, 150);

        assert_eq!(report.total.total_sold_cents, 300);
        assert_eq!(report.total.total_cost_cents, 150);
        assert_eq!(report.total.total_profit_cents, 150);
    }

    #[test]
    fn test_buckets_accumulate_per_category() {
        let rows = vec![
            StatementRow::new(date("2026-01-01"), "cement", 2, Money::from_cents(200), Money::from_cents(120)),
            StatementRow::new(date("2026-01-02"), "cement", 1, Money::from_cents(110), Money::from_cents(60)),
            StatementRow::new(date("2026-01-02"), "rod", 5, Money::from_cents(500), Money::from_cents(450)),
        ];

        let report = build_profit_report(&rows);

        assert_eq!(report.summary.len(), 2);
        assert_eq!(report.summary["cement"].total_sold_cents, 310);
        assert_eq!(report.summary["cement"].profit_cents, 130);
        assert_eq!(report.summary["rod"].profit_cents, 50);

        // Grand total is the sum across buckets
        assert_eq!(report.total.total_sold_cents, 810);
        assert_eq!(report.total.total_cost_cents, 630);
        assert_eq!(report.total.total_profit_cents, 180);
    }

    #[test]
    fn test_negative_profit_is_representable() {
        // Selling below cost must show a loss, not clamp to zero
        let row = StatementRow::new(
            date("2026-02-01"),
            "ring",
            1,
            Money::from_cents(80),
            Money::from_cents(100),
        );
        assert_eq!(row.profit_cents, -20);

        let report = build_profit_report([&row]);
        assert_eq!(report.total.total_profit_cents, -20);
    }

    #[test]
    fn test_empty_window_yields_empty_report() {
        let report = build_profit_report(std::iter::empty::<&StatementRow>());
        assert!(report.summary.is_empty());
        assert_eq!(report.total, ProfitTotals::default());
    }
}
