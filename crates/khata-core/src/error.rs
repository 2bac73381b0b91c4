//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                          │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── EngineError      - What service callers see                        │
//! │                                                                         │
//! │  Flow: ValidationError / DbError → EngineError → Caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pure folds in this crate ([`crate::allocation`], [`crate::profit`])
//! are total and never fail; validation is the only fallible concern here.
//! Stock shortfalls and missing records are detected at the store, so those
//! variants live on `EngineError` in khata-db.
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field names, bounds)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a caller-facing message

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate unit within one item list).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "category.name".to_string(),
        };
        assert_eq!(err.to_string(), "category.name is required");

        let err = ValidationError::MustBePositive {
            field: "paid amount".to_string(),
        };
        assert_eq!(err.to_string(), "paid amount must be positive");

        let err = ValidationError::OutOfRange {
            field: "paidAmount".to_string(),
            min: 0,
            max: 150,
        };
        assert_eq!(err.to_string(), "paidAmount must be between 0 and 150");
    }
}
