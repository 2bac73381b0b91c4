//! # Engine Error Types
//!
//! The caller-facing error surface of the service layer.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Error Translation                                 │
//! │                                                                         │
//! │  khata_core::ValidationError ──┬──► EngineError ──► Caller              │
//! │  khata_db::DbError ────────────┘                                        │
//! │                                                                         │
//! │  Callers match on the variant; is_retryable() distinguishes             │
//! │  "try again" (store unavailable) from "fix your request".               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::error::DbError;
use khata_core::ValidationError;

/// Errors surfaced by the service layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller input failed validation; nothing was mutated.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A sale line asked for more than the stock item had. The whole sale
    /// was rolled back; `available` is the count observed at the attempt.
    #[error("Insufficient stock for {product_id} ({unit}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        unit: String,
        available: i64,
        requested: i64,
    },

    /// The store cannot be reached right now. Retryable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other store failure, with the underlying cause attached.
    #[error("Store error: {0}")]
    Store(#[source] DbError),
}

impl EngineError {
    /// Convenience constructor for NotFound.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when retrying the same call may succeed without any request
    /// change (connectivity-class failures only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            e if e.is_unavailable() => EngineError::StoreUnavailable(e.to_string()),
            e => EngineError::Store(e),
        }
    }
}

/// Result type for service operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
