//! # khata-core: Pure Business Logic for the Khata Engine
//!
//! This crate is the **heart** of the khata stock-and-ledger reconciliation
//! engine. It contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Caller (API / CLI / UI host)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ allocation │  │  profit   │  │   │
//! │  │   │  Product  │  │   Money   │  │ FIFO fold  │  │ cost fold │  │   │
//! │  │   │ StockItem │  │  (cents)  │  │            │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, repositories, services     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockItem, Customer, Transaction)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`allocation`] - Pure FIFO payment allocation over outstanding balances
//! - [`profit`] - Pure profit/statement fold with unit-cost resolution
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::allocation::{allocate_fifo, OutstandingBalance};
//!
//! // Oldest debt first: a payment of 60 clears the 50 and nibbles the 30
//! let outstanding = vec![
//!     OutstandingBalance { transaction_id: "t1".into(), total_cents: 50, paid_cents: 0 },
//!     OutstandingBalance { transaction_id: "t2".into(), total_cents: 30, paid_cents: 0 },
//! ];
//! let plan = allocate_fifo(60, &outstanding);
//! assert_eq!(plan.entries[0].balance_cents, 0);
//! assert_eq!(plan.entries[1].balance_cents, 20);
//! assert_eq!(plan.remaining_cents, 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod money;
pub mod profit;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Money` instead of
// `use khata_core::money::Money`

pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single transaction.
///
/// ## Business Reason
/// Prevents runaway sale payloads and keeps the single-DB-transaction
/// reservation path bounded.
pub const MAX_TRANSACTION_LINES: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 100_000;
