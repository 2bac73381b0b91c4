//! # Repository Implementations
//!
//! Storage-only data access over the SQLite pool. Repositories take and
//! return fully-formed domain structs from `khata-core`; input validation and
//! orchestration live in the [`crate::service`] layer.
//!
//! - [`product`] - Catalog products and their unit-keyed stock items
//! - [`customer`] - Ledger customers and balance rollups
//! - [`transaction`] - Sale transactions and frozen line-item snapshots

pub mod customer;
pub mod product;
pub mod transaction;
