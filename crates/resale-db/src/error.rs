//! # Database Error Types
//!
//! Error types for storage and engine operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (resale-core)           │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────────── DbError::Core                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer maps to a status code; is_retryable() drives retries       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use resale_core::coupon::CouponRejection;
use resale_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and domain errors, adding the storage
/// failure modes (conflict, timeout, corrupt rows).
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Purchase id passed to reconciliation does not exist
    /// - Payment or coupon id/code doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate order id (retried by the engine)
    /// - Duplicate coupon code
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Recording a payment against a non-existent purchase
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A write lost a race that bounded retries could not resolve.
    ///
    /// ## When This Occurs
    /// - Order id still colliding after the configured number of attempts
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    /// A coupon could not be redeemed.
    ///
    /// ## When This Occurs
    /// - Coupon is inactive, outside its window, or scoped to another product
    /// - Usage limit already reached, including by a concurrent redemption
    #[error("Coupon {code} rejected: {reason:?}")]
    CouponRejected {
        code: String,
        reason: CouponRejection,
    },

    /// A storage call did not finish within the configured timeout.
    ///
    /// The transaction was rolled back; nothing was persisted.
    #[error("Timed out during {operation}")]
    Timeout { operation: String },

    /// SQLite could not take a lock within the busy timeout.
    ///
    /// ## When This Occurs
    /// - Another connection held the write lock for longer than `busy_timeout`
    /// - A table needed by the statement is locked by the same connection
    #[error("Database busy: {0}")]
    Busy(String),

    /// A stored row could not be decoded into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        DbError::Conflict {
            reason: reason.into(),
        }
    }

    /// Creates a Timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        DbError::Timeout {
            operation: operation.into(),
        }
    }

    /// True when repeating the same call may succeed.
    ///
    /// A timed out reconciliation is retryable and must never be read as
    /// "nothing due".
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Timeout { .. }
                | DbError::Busy(_)
                | DbError::Conflict { .. }
                | DbError::PoolExhausted
        )
    }

    /// True for a uniqueness violation on the given column.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => {
                field == column || field.ends_with(&format!(".{}", column))
            }
            _ => false,
        }
    }

    /// True for invalid caller input (rejected before any write).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DbError::Core(CoreError::Validation(_)))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → SQLITE_BUSY/LOCKED → DbError::Busy,
///                                otherwise analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::Corrupt
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_lock_contention(db_err.code().as_deref(), msg) {
                    return DbError::Busy(msg.to_string());
                }

                // SQLite constraint messages:
                // UNIQUE: "UNIQUE constraint failed: <table>.<column>"
                // FK:     "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::Corrupt(err.to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes.
///
/// sqlx reports the extended result code as a decimal string; the primary
/// code is its low byte.
fn is_lock_contention(code: Option<&str>, message: &str) -> bool {
    const SQLITE_BUSY: i32 = 5;
    const SQLITE_LOCKED: i32 = 6;

    match code.and_then(|c| c.parse::<i32>().ok()) {
        Some(code) => matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED),
        None => message.contains("database is locked") || message.contains("database table is locked"),
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<resale_core::ValidationError> for DbError {
    fn from(err: resale_core::ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use resale_core::ValidationError;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::timeout("reconcile").is_retryable());
        assert!(DbError::conflict("order id").is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(DbError::Busy("database is locked".to_string()).is_retryable());
        assert!(!DbError::QueryFailed("no such table: x".to_string()).is_retryable());
        assert!(!DbError::not_found("Purchase", "p1").is_retryable());
        assert!(!DbError::Core(CoreError::DecryptionFailed {
            reason: "bad tag".to_string()
        })
        .is_retryable());
    }

    #[test]
    fn test_lock_contention_codes() {
        // Primary and extended codes
        assert!(is_lock_contention(Some("5"), "database is locked"));
        assert!(is_lock_contention(Some("517"), "database is locked"));
        assert!(is_lock_contention(Some("6"), "database table is locked"));
        assert!(is_lock_contention(Some("262"), "database table is locked"));

        // Constraint failures are not contention
        assert!(!is_lock_contention(Some("2067"), "UNIQUE constraint failed: purchases.order_id"));
        assert!(!is_lock_contention(Some("1"), "no such table: x"));

        // Fall back to the message when there is no code
        assert!(is_lock_contention(None, "database is locked"));
        assert!(!is_lock_contention(None, "disk I/O error"));
    }

    #[test]
    fn test_unique_violation_column_match() {
        let err = DbError::duplicate("purchases.order_id", "PH-2025-00001");
        assert!(err.is_unique_violation_on("order_id"));
        assert!(!err.is_unique_violation_on("code"));
        assert!(!DbError::PoolExhausted.is_unique_violation_on("order_id"));
    }

    #[test]
    fn test_validation_converts_to_invalid_input() {
        let err: DbError = ValidationError::Required {
            field: "client_id".to_string(),
        }
        .into();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("client_id"));
    }
}
