//! # resale-core: Pure Business Logic for the Resale Ledger
//!
//! This crate holds the settlement rules of the resale ledger as pure
//! functions. Nothing in here touches a database, a clock source it was not
//! handed, or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Resale Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP / admin UI (outside this repository)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                resale-db (Engine + Repositories)                │   │
//! │  │   transactions, order id retry, timeouts, SQLite persistence    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ resale-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  derived  │  │ settlement │  │ order_id  │  │  coupon   │  │   │
//! │  │   │ end dates │  │ dues+status│  │ PH-Y-NNNNN│  │ discounts │  │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  calendar  │  │   vault   │  │ validation│  │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • INTEGER MONEY                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Purchase, Payment, Coupon, Activation)
//! - [`money`] - Money in integer minor units
//! - [`calendar`] - Month arithmetic with end-of-month clamping
//! - [`derived`] - Validity and warranty end dates
//! - [`settlement`] - Paid/due totals and the status machine
//! - [`order_id`] - `{PREFIX}-{YYYY}-{NNNNN}` formatting and sequencing
//! - [`coupon`] - Coupon validity and discount pricing
//! - [`vault`] - Authenticated encryption of activation secrets
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use resale_core::calendar::add_months;
//! use resale_core::money::Money;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! assert_eq!(add_months(start, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
//!
//! let fee = Money::from_minor(200_000).percentage_of_bps(1500);
//! assert_eq!(fee.minor(), 30_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod coupon;
pub mod derived;
pub mod error;
pub mod money;
pub mod order_id;
pub mod settlement;
pub mod types;
pub mod validation;
pub mod vault;

#[cfg(test)]
pub(crate) mod fixtures;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use derived::calculate_derived_fields;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use settlement::settle;
pub use types::*;
pub use vault::{CredentialVault, SealedSecret};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Order id prefix used when none is configured.
pub const DEFAULT_ORDER_PREFIX: &str = "PH";

/// How many times an order id is regenerated after a uniqueness collision.
pub const DEFAULT_ORDER_ID_ATTEMPTS: u32 = 3;

/// Actor recorded for writes made by internal tooling (seeding, migrations).
pub const SYSTEM_ACTOR_ID: &str = "00000000-0000-0000-0000-000000000001";
