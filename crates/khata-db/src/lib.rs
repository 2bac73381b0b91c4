//! # khata-db: Storage and Reconciliation Layer for Khata
//!
//! This crate provides database access and the reconciliation services for
//! the Khata stock-and-ledger engine. It uses SQLite for local storage with
//! sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Data Flow                                 │
//! │                                                                         │
//! │  Caller (CLI / server handler)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     khata-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │   Services   │    │    │
//! │  │   │   (pool.rs)   │    │ (product.rs)  │    │ (ledger.rs)  │    │    │
//! │  │   │               │    │               │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │◄───│ LedgerSvc    │    │    │
//! │  │   │ Connection    │    │ CustomerRepo  │    │ Reconciler   │    │    │
//! │  │   │ Management    │    │ TxnRepo       │    │ ProfitAgg    │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database                             │    │
//! │  │                  ./data/khata.db (WAL mode)                     │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, customer, transaction)
//! - [`service`] - Reconciliation services (inventory, ledger, payments, reports)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig};
//!
//! // Create database with default config (runs migrations)
//! let config = DbConfig::new("path/to/khata.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories and services
//! let page = db.products().list(&ProductQuery::default()).await?;
//! let outcome = db.payments().allocate(&customer_id, 5_000).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerRepository, CustomerWithBalance};
pub use repository::product::{CategoryNode, ProductPage, ProductQuery, ProductRepository};
pub use repository::transaction::{TransactionPage, TransactionQuery, TransactionRepository};

// Service re-exports
pub use service::catalog::CatalogService;
pub use service::error::{EngineError, EngineResult};
pub use service::inventory::InventoryAllocator;
pub use service::ledger::LedgerService;
pub use service::notify::{LogNotifier, Notifier, PaymentEvent};
pub use service::payments::{AllocationOutcome, PaymentReconciler};
pub use service::reports::ProfitAggregator;
