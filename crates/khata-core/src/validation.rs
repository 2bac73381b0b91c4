//! # Validation Module
//!
//! Input validation for the khata engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (API host / UI)                                        │
//! │  ├── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │  ├── Runs before any store mutation; a ValidationError guarantees       │
//! │  │   no partial state change                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL / CHECK / foreign key constraints                         │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewCustomer, NewProduct, NewStockItem, NewTransaction};
use crate::MAX_LINE_QUANTITY;
use crate::MAX_TRANSACTION_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product title.
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }

    if title.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a unit-of-measure label.
pub fn validate_unit(unit: &str) -> ValidationResult<()> {
    let unit = unit.trim();

    if unit.is_empty() {
        return Err(ValidationError::Required {
            field: "unit".to_string(),
        });
    }

    if unit.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "unit".to_string(),
            max: 50,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale or restock quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an incoming payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0); zero and negative payments are rejected before
///   any transaction is touched
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "paid amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates an entity id string.
///
/// ## Rules
/// - Must be a valid UUID: malformed customer/product ids are a
///   ValidationError, not a NotFound
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

/// Validates one incoming stock line.
pub fn validate_new_stock_item(item: &NewStockItem) -> ValidationResult<()> {
    validate_unit(&item.unit)?;
    if item.quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    validate_price_cents(item.price_per_unit_cents)?;
    Ok(())
}

/// Validates a product creation payload.
///
/// ## Rules (from the catalog contract)
/// - category id AND name are required
/// - sub-category name is required
/// - units must be unique within the item list (items are keyed by unit)
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_title(&input.title)?;

    if input.category.id.as_deref().map_or(true, str::is_empty) {
        return Err(ValidationError::Required {
            field: "category.id".to_string(),
        });
    }
    if input.category.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "category.name".to_string(),
        });
    }
    if input.sub_category.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "subCategory.name".to_string(),
        });
    }

    for item in &input.items {
        validate_new_stock_item(item)?;
    }

    if let Some(dup) = first_duplicate_unit(&input.items) {
        return Err(ValidationError::Duplicate {
            field: "unit".to_string(),
            value: dup,
        });
    }

    Ok(())
}

/// Validates a customer creation payload.
pub fn validate_new_customer(input: &NewCustomer) -> ValidationResult<()> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if input.name.trim().len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }
    if input.phone.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }
    if input.phone.trim().len() > 30 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 30,
        });
    }
    Ok(())
}

/// Validates a transaction creation payload. Runs in full before any stock
/// mutation.
pub fn validate_new_transaction(input: &NewTransaction) -> ValidationResult<()> {
    validate_uuid("customerId", &input.customer_id)?;

    if input.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "products".to_string(),
        });
    }

    if input.lines.len() > MAX_TRANSACTION_LINES {
        return Err(ValidationError::OutOfRange {
            field: "products".to_string(),
            min: 1,
            max: MAX_TRANSACTION_LINES as i64,
        });
    }

    if input.paid_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "paidAmount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    for line in &input.lines {
        validate_uuid("productId", &line.product_id)?;
        validate_quantity(line.quantity)?;
        validate_price_cents(line.price_per_unit_cents)?;
        if let Some(unit) = &line.unit {
            validate_unit(unit)?;
        }
    }

    Ok(())
}

fn first_duplicate_unit(items: &[NewStockItem]) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        if !seen.insert(item.unit.trim()) {
            return Some(item.unit.trim().to_string());
        }
    }
    None
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryRef, NewTransactionLine};

    const GOOD_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn new_product() -> NewProduct {
        NewProduct {
            title: "Cement".to_string(),
            category: CategoryRef::new("c-1", "cement"),
            sub_category: CategoryRef::new("s-1", "ultratech"),
            child_category: None,
            items: vec![NewStockItem {
                unit: "bag".to_string(),
                quantity: 10,
                price_per_unit_cents: 100,
            }],
            created_by: "actor-1".to_string(),
        }
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Cement OPC 53").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-50).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("customerId", GOOD_UUID).is_ok());
        assert!(validate_uuid("customerId", "").is_err());
        assert!(validate_uuid("customerId", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_new_product_requires_category_fields() {
        assert!(validate_new_product(&new_product()).is_ok());

        let mut missing_cat_id = new_product();
        missing_cat_id.category.id = None;
        assert!(validate_new_product(&missing_cat_id).is_err());

        let mut missing_sub_name = new_product();
        missing_sub_name.sub_category.name = String::new();
        assert!(validate_new_product(&missing_sub_name).is_err());
    }

    #[test]
    fn test_validate_new_product_rejects_duplicate_units() {
        let mut dup = new_product();
        dup.items.push(NewStockItem {
            unit: "bag".to_string(),
            quantity: 3,
            price_per_unit_cents: 120,
        });
        assert!(matches!(
            validate_new_product(&dup),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_validate_new_customer() {
        let good = NewCustomer {
            name: "Ramesh".to_string(),
            phone: "9876543210".to_string(),
            address: None,
            created_by: None,
        };
        assert!(validate_new_customer(&good).is_ok());

        let mut no_name = good.clone();
        no_name.name = "  ".to_string();
        assert!(validate_new_customer(&no_name).is_err());

        let mut no_phone = good;
        no_phone.phone = String::new();
        assert!(validate_new_customer(&no_phone).is_err());
    }

    #[test]
    fn test_validate_new_transaction() {
        let good = NewTransaction {
            customer_id: GOOD_UUID.to_string(),
            lines: vec![NewTransactionLine {
                product_id: GOOD_UUID.to_string(),
                category_id: None,
                sub_category_id: None,
                child_category_id: None,
                unit: None,
                quantity: 2,
                price_per_unit_cents: 150,
            }],
            paid_cents: 0,
            created_by: None,
        };
        assert!(validate_new_transaction(&good).is_ok());

        let mut bad_customer = good.clone();
        bad_customer.customer_id = "nope".to_string();
        assert!(validate_new_transaction(&bad_customer).is_err());

        let mut empty_lines = good.clone();
        empty_lines.lines.clear();
        assert!(validate_new_transaction(&empty_lines).is_err());

        let mut negative_paid = good.clone();
        negative_paid.paid_cents = -1;
        assert!(validate_new_transaction(&negative_paid).is_err());

        let mut zero_qty = good;
        zero_qty.lines[0].quantity = 0;
        assert!(validate_new_transaction(&zero_qty).is_err());
    }
}
