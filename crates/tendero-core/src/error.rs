//! # Error Types
//!
//! Domain-specific error types for tendero-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tendero-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tendero-db errors                                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tendero-engine errors                                                 │
//! │  └── SaleError        - What callers of CreateSale/CancelSale see      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SaleError ← DbError               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the offending identifier in every message
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product does not exist for the tenant, or is inactive.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds the stock visible inside the sale scope.
    ///
    /// ## User Workflow
    /// ```text
    /// Basket line (qty: 5)
    ///      │
    ///      ▼
    /// In-scope stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Coca-Cola 500ml", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Register shows: "Only 3 Coca-Cola 500ml in stock"
    /// ```
    #[error("Insufficient stock for {name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Sale does not exist for the tenant.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale was already cancelled; cancellation is not idempotent.
    #[error("Sale {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Status transition outside the sale state machine.
    #[error("Sale {sale_id} cannot move from {from} to {to}")]
    InvalidTransition {
        sale_id: String,
        from: String,
        to: String,
    },

    /// Money arithmetic left the representable range.
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store access, so they never need a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

    /// Invalid format (e.g., invalid UUID, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            name: "Coca-Cola 500ml".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Coca-Cola 500ml (p-1): available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "basket".to_string(),
        };
        assert_eq!(err.to_string(), "basket is required");
        assert_eq!(err.field(), "basket");

        let err = ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: 100,
        };
        assert_eq!(err.to_string(), "items must be between 1 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_already_cancelled_message() {
        let err = CoreError::AlreadyCancelled("sale-9".to_string());
        assert_eq!(err.to_string(), "Sale sale-9 is already cancelled");
    }
}
