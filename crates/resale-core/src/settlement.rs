//! # Settlement
//!
//! Pure half of reconciliation: given a purchase and every payment recorded
//! against it, recompute the settlement subtree and the status.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  payments ──► partition by type ──► checked sum per side               │
//! │                                          │                              │
//! │                                          ▼                              │
//! │  client_due = client_pay_total − client_paid                           │
//! │  vendor_due = vendor_pay_total − vendor_paid    (never clamped)        │
//! │                                          │                              │
//! │                                          ▼                              │
//! │  next_status(current, settlement)                                      │
//! │    CANCELLED            → CANCELLED   (fields still recomputed)        │
//! │    both dues ≤ 0        → COMPLETED                                    │
//! │    COMPLETED, a due > 0 → OPEN                                         │
//! │    otherwise            → unchanged                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The storage layer reads the payments, calls [`settle`], and writes the
//! result; nothing else writes `settlement`.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{ensure_same_purchase, Payment, PaymentType, Purchase, PurchaseStatus, Settlement};

/// Computes settlement from totals and the full payment set of one purchase.
pub fn compute_settlement(purchase: &Purchase, payments: &[Payment]) -> CoreResult<Settlement> {
    for payment in payments {
        ensure_same_purchase(&purchase.id, payment)?;
    }

    let client_paid = sum_side(payments, PaymentType::Client)
        .map_err(|_| CoreError::overflow(format!("client paid for {}", purchase.order_id)))?;
    let vendor_paid = sum_side(payments, PaymentType::Vendor)
        .map_err(|_| CoreError::overflow(format!("vendor paid for {}", purchase.order_id)))?;

    Ok(Settlement {
        client_paid,
        vendor_paid,
        client_due: purchase.amounts.client_pay_total - client_paid,
        vendor_due: purchase.amounts.vendor_pay_total - vendor_paid,
    })
}

fn sum_side(payments: &[Payment], side: PaymentType) -> CoreResult<Money> {
    Money::checked_sum(
        payments
            .iter()
            .filter(|p| p.payment_type == side)
            .map(|p| p.amount),
    )
}

/// Status transition applied after every reconciliation.
///
/// ```rust
/// use resale_core::money::Money;
/// use resale_core::settlement::next_status;
/// use resale_core::types::{PurchaseStatus, Settlement};
///
/// let owing = Settlement { client_due: Money::from_minor(100), ..Default::default() };
/// assert_eq!(next_status(PurchaseStatus::Completed, &owing), PurchaseStatus::Open);
/// assert_eq!(next_status(PurchaseStatus::Cancelled, &Settlement::default()), PurchaseStatus::Cancelled);
/// ```
pub fn next_status(current: PurchaseStatus, settlement: &Settlement) -> PurchaseStatus {
    match current {
        PurchaseStatus::Cancelled => PurchaseStatus::Cancelled,
        _ if settlement.is_settled() => PurchaseStatus::Completed,
        PurchaseStatus::Completed => PurchaseStatus::Open,
        PurchaseStatus::Open => PurchaseStatus::Open,
    }
}

/// Returns `purchase` with settlement and status recomputed from `payments`.
///
/// Idempotent: the output depends only on the authored totals, the payment
/// set and the current status, never on the previous settlement.
///
/// ## Errors
/// - `AmountOverflow` when a side's sum leaves the safe integer range
/// - `Validation` when a payment belongs to another purchase
pub fn settle(mut purchase: Purchase, payments: &[Payment]) -> CoreResult<Purchase> {
    let settlement = compute_settlement(&purchase, payments)?;
    purchase.status = next_status(purchase.status, &settlement);
    purchase.settlement = settlement;
    Ok(purchase)
}

// =============================================================================
// Unit Tests
// =============================================================================
