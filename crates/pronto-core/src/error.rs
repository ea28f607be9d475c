//! # Error Types
//!
//! Domain-specific error types for pronto-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pronto-core errors (this file)                                        │
//! │  ├── CoreError        - Cart rule violations                           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pronto-store  └── StoreError   - Key/value read & write failures      │
//! │  pronto-client └── ClientError  - HTTP failures                        │
//! │  pronto-cart   └── CartError    - What the presentation layer sees     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CartError → Notice → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, quantities, values)
//! 3. Errors are enum variants, never String
//! 4. Errors are `Clone` so one checkout result can reach every waiter

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart rule violations.
///
/// None of these are fatal: the cart is left exactly as it was before the
/// failing operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product cannot be added: it has no stock or the quantity is not positive.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan "ZAP-001" (stock: 0)
    ///      │
    ///      ▼
    /// InsufficientStock { code: "ZAP-001", available: 0, requested: 1 }
    ///      │
    ///      ▼
    /// UI shows warning, cart unchanged
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// A quantity update asked for more than the stock known for the line.
    #[error("Quantity {requested} for {code} exceeds available stock ({available})")]
    StockExceeded {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Discount outside 0–100%.
    #[error("Invalid discount '{value}': must be between 0 and 100")]
    InvalidDiscount { value: String },

    /// Checkout attempted with no items.
    #[error("The cart is empty")]
    EmptyCart,

    /// Checkout requires a customer and none is selected.
    #[error("A customer must be selected")]
    MissingCustomer,

    /// Tendered amount does not cover the sale.
    #[error("Payment of {tendered} does not cover total {total}")]
    InsufficientPayment { total: Money, tendered: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input (typed, scanned or restored from storage) does not
/// meet requirements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// An amount computed from the input does not fit.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. the same product twice in a stored cart).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "ZAP-001".to_string(),
            available: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for ZAP-001: available 0, requested 1"
        );

        let err = CoreError::InsufficientPayment {
            total: Money::from_cents(18000),
            tendered: Money::from_cents(10000),
        };
        assert_eq!(err.to_string(), "Payment of $100.00 does not cover total $180.00");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
