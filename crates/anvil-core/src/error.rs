//! # Error Types
//!
//! Domain-specific error types for anvil-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  anvil-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger and cart rule violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  anvil-db errors                                                       │
//! │  └── DbError          - Store failures, wraps CoreError rejections     │
//! │                                                                         │
//! │  anvil-export errors                                                   │
//! │  └── ExportError      - Workbook / PDF / file failures                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → AppError → terminal     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by carts and ledger settlement.
///
/// None of these are fatal. The operation is not attempted (or is rolled
/// back) and the user may correct the input and retry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Not enough stock to complete a sale line.
    ///
    /// ## When This Occurs
    /// - Adding more units to the sale cart than the shelf holds
    /// - Committing a sale after stock moved since the cart was built
    ///
    /// ```text
    /// Add to cart: "PVC Pipe 1in" × 12
    ///      │
    ///      ▼
    /// Check stock: available = 8
    ///      │
    ///      ▼
    /// InsufficientStock { product: "PVC Pipe 1in", available: 8, requested: 12 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A sale or purchase was committed with no line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart position does not exist.
    #[error("No cart line at position {index} (cart has {len})")]
    LineOutOfRange { index: usize, len: usize },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs.
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. malformed amount or phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
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
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "PVC Pipe 1in".to_string(),
            available: 8,
            requested: 12,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for PVC Pipe 1in: available 8, requested 12"
        );
        assert_eq!(CoreError::EmptyCart.to_string(), "Cart is empty");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
