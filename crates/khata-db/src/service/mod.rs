//! # Reconciliation Services
//!
//! Orchestration over the repositories: validation, atomic multi-table
//! writes, and the caller-facing error surface.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Service Layer                                  │
//! │                                                                         │
//! │  CatalogService      product/customer lifecycle + taxonomy tree         │
//! │  InventoryAllocator  restock accumulation, conditional stock reserve    │
//! │  LedgerService       atomic sale: reserve stock + append ledger entry   │
//! │  PaymentReconciler   FIFO payment allocation, per-customer serialized   │
//! │  ProfitAggregator    costed statement rows + category profit buckets    │
//! │                                                                         │
//! │  All of them return EngineError; repositories' DbError never leaks      │
//! │  past this layer unexplained.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod notify;
pub mod payments;
pub mod reports;
