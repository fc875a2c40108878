//! # Error Types
//!
//! Domain-specific error types for resale-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  resale-core errors (this file)                                        │
//! │  ├── CoreError        - Domain errors (overflow, decryption, ...)      │
//! │  └── ValidationError  - Input validation failures (InvalidInput)       │
//! │                                                                         │
//! │  resale-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, Conflict, Timeout            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → HTTP layer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (order id, field, ...)
//! 3. Errors are enum variants, never String
//! 4. Never put secret material into an error message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A sum of minor units left the safe integer range.
    ///
    /// ## When This Occurs
    /// - Summing payments whose total exceeds 2^53 - 1
    /// - Any i64 overflow while aggregating amounts
    ///
    /// Rejected instead of wrapping so a due can never silently flip sign.
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// Every order id sequence number of a year is used up.
    ///
    /// ## When This Occurs
    /// - The highest stored id of the year already carries `u32::MAX`
    #[error("Order id sequence exhausted for {stem}")]
    SequenceExhausted { stem: String },

    /// Calendar arithmetic left the representable date range.
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    /// A sealed secret envelope is malformed or failed authentication.
    ///
    /// ## When This Occurs
    /// - Envelope is missing the version prefix or is not valid base64
    /// - Envelope is shorter than a nonce plus tag
    /// - Any byte of nonce, ciphertext or tag was altered
    /// - Sealed under a different key
    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// Encryption failed (should not happen with a valid key).
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Required configuration is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        CoreError::AmountOverflow {
            context: context.into(),
        }
    }

    pub(crate) fn decryption(reason: impl Into<String>) -> Self {
        CoreError::DecryptionFailed {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens, so an invalid request never leaves a
/// partially applied record behind.
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

    /// Invalid format (e.g., invalid UUID, invalid email).
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
        let err = CoreError::not_found("Purchase", "abc");
        assert_eq!(err.to_string(), "Purchase not found: abc");

        let err = CoreError::overflow("client paid");
        assert_eq!(err.to_string(), "Amount overflow while computing client paid");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "client_id".to_string(),
        };
        assert_eq!(err.to_string(), "client_id is required");

        let err = ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        };
        assert_eq!(err.to_string(), "payment amount must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "order_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
