//! # Repository Module
//!
//! SQL for the resale ledger, one repository per table.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Transactions                        │
//! │                                                                         │
//! │  Engine operation                                                      │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       ▼                                                                 │
//! │  PaymentRepository::insert(&mut *tx, &payment)                         │
//! │  PaymentRepository::list_for_purchase(&mut *tx, purchase_id)           │
//! │  PurchaseRepository::save_settlement(&mut *tx, &purchase)              │
//! │       │                                                                 │
//! │       │  tx.commit()                                                    │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every function takes any SqliteExecutor: the pool for one-off reads,  │
//! │  a transaction when several statements must land together.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are decoded through `sqlx::FromRow` structs private to each
//! repository and converted into `resale_core` types; a row that cannot be
//! converted surfaces as [`DbError::Corrupt`](crate::DbError::Corrupt).
//!
//! ## Available Repositories
//!
//! - [`PurchaseRepository`] - Purchases, order id lookup, settlement writes
//! - [`PaymentRepository`] - Payments per purchase
//! - [`CouponRepository`] - Coupons and usage counting

pub mod coupon;
pub mod payment;
pub mod purchase;

pub use coupon::CouponRepository;
pub use payment::PaymentRepository;
pub use purchase::PurchaseRepository;

use crate::error::{DbError, DbResult};

/// Converts a stored month count back to `u32`.
pub(crate) fn months_from_db(column: &str, value: Option<i64>) -> DbResult<Option<u32>> {
    value
        .map(|months| {
            u32::try_from(months)
                .map_err(|_| DbError::Corrupt(format!("{} out of range: {}", column, months)))
        })
        .transpose()
}
