//! # Domain Types
//!
//! Core domain types of the resale ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Purchase     │   │     Payment     │   │     Coupon      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  purchase_id    │   │  id (UUID)      │       │
//! │  │  order_id       │   │  payment_type   │   │  code (UPPER)   │       │
//! │  │  validity       │   │  amount         │   │  discount_type  │       │
//! │  │  warranty       │   │  paid_on        │   │  max/used uses  │       │
//! │  │  activation     │   └─────────────────┘   │  valid window   │       │
//! │  │  amounts        │                         └─────────────────┘       │
//! │  │  settlement ◄── derived, only written by reconciliation            │
//! │  │  status         │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4 - immutable, used for relations
//! - `order_id`: `PH-2025-00001` - human-readable, sequencer generated

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::vault::{CredentialVault, SealedSecret};

// =============================================================================
// Purchase Status
// =============================================================================

/// Lifecycle status of a purchase.
///
/// ```text
///            both dues ≤ 0
///   OPEN ───────────────────────► COMPLETED
///    ▲                                │
///    └──────── a due becomes > 0 ─────┘
///
///   CANCELLED: manual, terminal, never touched by reconciliation
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    /// At least one side still owes money.
    #[default]
    Open,
    /// Both sides are fully paid (or overpaid).
    Completed,
    /// Manually cancelled.
    Cancelled,
}

// =============================================================================
// Payment Type
// =============================================================================

/// Which side of the purchase a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Money received from the client.
    Client,
    /// Money paid out to the vendor.
    Vendor,
}

// =============================================================================
// Validity & Warranty
// =============================================================================

/// Subscription/licence validity window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Validity {
    /// Length of the validity in calendar months (≥ 1).
    pub duration_months: Option<u32>,
    /// Start of validity; falls back to `purchase_date` when unset.
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    /// Computed. Never authored directly.
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
}

/// Warranty coverage, always counted from the purchase date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Warranty {
    pub has_warranty: bool,
    pub months: Option<u32>,
    /// Computed. Never authored directly.
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
}

// =============================================================================
// Activation
// =============================================================================

/// Delivery state of an email invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    #[default]
    Sent,
    Delivered,
    Accepted,
    Failed,
}

/// How the purchased product is handed to the client.
///
/// One variant per method, so a login-credentials purchase can never also
/// carry a coupon code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Activation {
    /// Account login; the secret is only ever stored sealed.
    LoginCredentials {
        username: String,
        secret: Option<SealedSecret>,
    },
    /// A redeemable code for the product.
    CouponCode { code: String },
    /// Invitation sent to the client's mailbox.
    EmailInvite { email: String, status: InviteStatus },
}

/// Activation as supplied by a caller, with the secret still in plaintext.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationInput {
    LoginCredentials {
        username: String,
        /// `None` keeps the previously sealed secret on update.
        secret: Option<String>,
    },
    CouponCode {
        code: String,
    },
    EmailInvite {
        email: String,
        #[serde(default)]
        status: InviteStatus,
    },
}

impl std::fmt::Debug for ActivationInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivationInput::LoginCredentials { username, secret } => f
                .debug_struct("LoginCredentials")
                .field("username", username)
                .field("secret", &secret.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            ActivationInput::CouponCode { code } => {
                f.debug_struct("CouponCode").field("code", code).finish()
            }
            ActivationInput::EmailInvite { email, status } => f
                .debug_struct("EmailInvite")
                .field("email", email)
                .field("status", status)
                .finish(),
        }
    }
}

impl ActivationInput {
    /// Converts to the persisted form, sealing any plaintext secret.
    ///
    /// When the caller omits the secret of a login, the sealed secret of the
    /// `previous` login activation (if any) is carried over untouched.
    pub fn seal(
        self,
        vault: &CredentialVault,
        previous: Option<&Activation>,
    ) -> CoreResult<Activation> {
        match self {
            ActivationInput::LoginCredentials { username, secret } => {
                let secret = match secret {
                    Some(plaintext) => Some(vault.seal(&plaintext)?),
                    None => match previous {
                        Some(Activation::LoginCredentials { secret, .. }) => secret.clone(),
                        _ => None,
                    },
                };
                Ok(Activation::LoginCredentials { username, secret })
            }
            ActivationInput::CouponCode { code } => Ok(Activation::CouponCode { code }),
            ActivationInput::EmailInvite { email, status } => {
                Ok(Activation::EmailInvite { email, status })
            }
        }
    }
}

/// Read-side activation: the sealed secret is replaced by a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationView {
    LoginCredentials { username: String, has_secret: bool },
    CouponCode { code: String },
    EmailInvite { email: String, status: InviteStatus },
}

impl From<&Activation> for ActivationView {
    fn from(activation: &Activation) -> Self {
        match activation {
            Activation::LoginCredentials { username, secret } => ActivationView::LoginCredentials {
                username: username.clone(),
                has_secret: secret.is_some(),
            },
            Activation::CouponCode { code } => ActivationView::CouponCode { code: code.clone() },
            Activation::EmailInvite { email, status } => ActivationView::EmailInvite {
                email: email.clone(),
                status: *status,
            },
        }
    }
}

// =============================================================================
// Amounts & Settlement
// =============================================================================

/// Authored amounts of a purchase, all non-negative minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Amounts {
    /// What the client owes in total.
    pub client_pay_total: Money,
    /// What is owed to the vendor in total.
    pub vendor_pay_total: Money,
    pub discount: Money,
    pub taxes: Money,
    pub fees: Money,
    /// ISO-4217 code, e.g. "INR".
    pub currency: String,
}

/// Reconciled view of what has been paid and what remains due.
///
/// Dues may be negative (overpayment) and are never clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub client_paid: Money,
    pub vendor_paid: Money,
    pub client_due: Money,
    pub vendor_due: Money,
}

impl Settlement {
    /// Both sides have nothing left to pay.
    #[inline]
    pub fn is_settled(&self) -> bool {
        !self.client_due.is_positive() && !self.vendor_due.is_positive()
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// A brokered resale transaction between a client and a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    /// Sequencer generated, unique (e.g. `PH-2025-00042`).
    pub order_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub client_id: String,
    pub product_id: String,
    pub vendor_id: Option<String>,
    pub validity: Validity,
    pub warranty: Warranty,
    pub activation: Option<Activation>,
    pub amounts: Amounts,
    pub settlement: Settlement,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    /// Actor that created the record.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// Builds a new, not yet numbered purchase from caller input.
    ///
    /// `order_id` is left empty; the storage layer assigns it. Settlement is
    /// zeroed and must be computed before the record is stored.
    pub fn from_new(
        input: NewPurchase,
        activation: Option<Activation>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Purchase {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: String::new(),
            purchase_date: input.purchase_date,
            client_id: input.client_id,
            product_id: input.product_id,
            vendor_id: input.vendor_id,
            validity: Validity {
                duration_months: input.validity_duration_months,
                start_date: input.validity_start_date,
                end_date: None,
            },
            warranty: Warranty {
                has_warranty: input.has_warranty,
                months: input.warranty_months,
                end_date: None,
            },
            activation,
            amounts: input.amounts,
            settlement: Settlement::default(),
            status: PurchaseStatus::Open,
            notes: input.notes,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Read model with the sealed secret swapped for `has_secret`.
    pub fn view(&self) -> PurchaseView {
        PurchaseView::from(self)
    }
}

/// Purchase as returned by general reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PurchaseView {
    pub id: String,
    pub order_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub client_id: String,
    pub product_id: String,
    pub vendor_id: Option<String>,
    pub validity: Validity,
    pub warranty: Warranty,
    pub activation: Option<ActivationView>,
    pub amounts: Amounts,
    pub settlement: Settlement,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Purchase> for PurchaseView {
    fn from(p: &Purchase) -> Self {
        PurchaseView {
            id: p.id.clone(),
            order_id: p.order_id.clone(),
            purchase_date: p.purchase_date,
            client_id: p.client_id.clone(),
            product_id: p.product_id.clone(),
            vendor_id: p.vendor_id.clone(),
            validity: p.validity.clone(),
            warranty: p.warranty.clone(),
            activation: p.activation.as_ref().map(ActivationView::from),
            amounts: p.amounts.clone(),
            settlement: p.settlement,
            status: p.status,
            notes: p.notes.clone(),
            created_by: p.created_by.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Caller input for creating a purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchase {
    pub purchase_date: NaiveDate,
    pub client_id: String,
    pub product_id: String,
    pub vendor_id: Option<String>,
    pub validity_duration_months: Option<u32>,
    pub validity_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub has_warranty: bool,
    pub warranty_months: Option<u32>,
    pub activation: Option<ActivationInput>,
    pub amounts: Amounts,
    pub notes: Option<String>,
}

/// Partial update of a purchase; `None` leaves a field unchanged.
///
/// Settlement and status are deliberately absent: they are only ever
/// derived.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseUpdate {
    pub purchase_date: Option<NaiveDate>,
    pub vendor_id: Option<String>,
    pub validity_duration_months: Option<u32>,
    pub validity_start_date: Option<NaiveDate>,
    pub has_warranty: Option<bool>,
    pub warranty_months: Option<u32>,
    pub activation: Option<ActivationInput>,
    pub amounts: Option<Amounts>,
    pub notes: Option<String>,
}

impl PurchaseUpdate {
    /// Applies the non-activation fields to `purchase`.
    ///
    /// The activation needs the vault and is handled by the caller.
    pub fn apply_fields(&self, purchase: &mut Purchase) {
        if let Some(date) = self.purchase_date {
            purchase.purchase_date = date;
        }
        if let Some(vendor_id) = &self.vendor_id {
            purchase.vendor_id = Some(vendor_id.clone());
        }
        if let Some(months) = self.validity_duration_months {
            purchase.validity.duration_months = Some(months);
        }
        if let Some(start) = self.validity_start_date {
            purchase.validity.start_date = Some(start);
        }
        if let Some(has_warranty) = self.has_warranty {
            purchase.warranty.has_warranty = has_warranty;
        }
        if let Some(months) = self.warranty_months {
            purchase.warranty.months = Some(months);
        }
        if let Some(amounts) = &self.amounts {
            purchase.amounts = amounts.clone();
        }
        if let Some(notes) = &self.notes {
            purchase.notes = Some(notes.clone());
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A single money movement tied to exactly one purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub purchase_id: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Always positive.
    pub amount: Money,
    #[ts(as = "String")]
    pub paid_on: NaiveDate,
    /// Free-form channel, e.g. "UPI" or "BANK_TRANSFER".
    pub method: Option<String>,
    /// External reference (UTR, cheque number, ...).
    pub reference: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Builds a payment from caller input.
    pub fn from_new(input: NewPayment, created_by: &str, now: DateTime<Utc>) -> Self {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            purchase_id: input.purchase_id,
            payment_type: input.payment_type,
            amount: input.amount,
            paid_on: input.paid_on,
            method: input.method,
            reference: input.reference,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Caller input for recording a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub purchase_id: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub amount: Money,
    pub paid_on: NaiveDate,
    pub method: Option<String>,
    pub reference: Option<String>,
}

/// Partial update of a payment. The owning purchase cannot change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentUpdate {
    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,
    pub amount: Option<Money>,
    pub paid_on: Option<NaiveDate>,
    pub method: Option<String>,
    pub reference: Option<String>,
}

impl PaymentUpdate {
    pub fn apply_to(&self, payment: &mut Payment) {
        if let Some(payment_type) = self.payment_type {
            payment.payment_type = payment_type;
        }
        if let Some(amount) = self.amount {
            payment.amount = amount;
        }
        if let Some(paid_on) = self.paid_on {
            payment.paid_on = paid_on;
        }
        if let Some(method) = &self.method {
            payment.method = Some(method.clone());
        }
        if let Some(reference) = &self.reference {
            payment.reference = Some(reference.clone());
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discount_value` is in basis points (1500 = 15.00%).
    Percent,
    /// `discount_value` is in minor units.
    Flat,
    /// A stored type this version does not understand; never discounts.
    Unsupported,
}

impl DiscountType {
    /// Storage code for this type.
    pub const fn as_code(&self) -> &'static str {
        match self {
            DiscountType::Percent => "PERCENT",
            DiscountType::Flat => "FLAT",
            DiscountType::Unsupported => "UNSUPPORTED",
        }
    }

    /// Parses a stored code; anything unrecognised maps to `Unsupported`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "PERCENT" | "PERCENTAGE" => DiscountType::Percent,
            "FLAT" | "FIXED" => DiscountType::Flat,
            _ => DiscountType::Unsupported,
        }
    }
}

/// A discount rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    /// Unique, upper-case.
    pub code: String,
    /// When set, the coupon only applies to this product.
    pub product_id: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    /// `None` means unlimited.
    pub max_uses: Option<i64>,
    pub used_count: i64,
    #[ts(as = "Option<String>")]
    pub valid_from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub valid_to: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Caller input for creating a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub product_id: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_uses: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Coupon {
    /// Builds a coupon from caller input. The code is normalised to upper case.
    pub fn from_new(input: NewCoupon, now: DateTime<Utc>) -> Self {
        Coupon {
            id: uuid::Uuid::new_v4().to_string(),
            code: crate::coupon::normalize_code(&input.code),
            product_id: input.product_id,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            max_uses: input.max_uses,
            used_count: 0,
            valid_from: input.valid_from,
            valid_to: input.valid_to,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of a successful coupon redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Redemption {
    pub coupon: Coupon,
    pub discount: Money,
}

// =============================================================================
// Helpers
// =============================================================================

/// Rejects payments that belong to a different purchase than `purchase_id`.
pub(crate) fn ensure_same_purchase(purchase_id: &str, payment: &Payment) -> CoreResult<()> {
    if payment.purchase_id != purchase_id {
        return Err(CoreError::Validation(ValidationError::InvalidFormat {
            field: "purchase_id".to_string(),
            reason: format!(
                "payment {} belongs to purchase {}, not {}",
                payment.id, payment.purchase_id, purchase_id
            ),
        }));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
