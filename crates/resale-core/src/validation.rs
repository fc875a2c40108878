//! # Validation Module
//!
//! Input validation run by the engine before anything is written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer (outside this repo)                               │
//! │  ├── Deserialization, authentication, role checks                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (resale-db)                                           │
//! │  └── THIS MODULE: amounts, dates, codes, emails                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE(order_id), UNIQUE(code)                                    │
//! │  └── Foreign key payments.purchase_id                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A request that fails here is rejected whole; nothing is partially applied.

use crate::error::ValidationError;
use crate::money::{Money, BPS_DENOMINATOR, MAX_SAFE_MINOR_UNITS};
use crate::types::{
    ActivationInput, Amounts, DiscountType, NewCoupon, NewPayment, NewPurchase, PaymentUpdate,
    PurchaseUpdate,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of an order id prefix.
pub const MAX_PREFIX_LEN: usize = 10;

/// Maximum length of a coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 40;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a required identifier is present.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed the safe integer ceiling
///
/// ```rust
/// use resale_core::money::Money;
/// use resale_core::validation::validate_payment_amount;
///
/// assert!(validate_payment_amount(Money::from_minor(100)).is_ok());
/// assert!(validate_payment_amount(Money::zero()).is_err());
/// ```
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    validate_safe(amount, "payment amount")
}

/// Validates an authored amount (totals, discount, taxes, fees).
pub fn validate_non_negative(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_safe(amount, field)
}

fn validate_safe(amount: Money, field: &str) -> ValidationResult<()> {
    if !amount.is_safe() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_SAFE_MINOR_UNITS,
        });
    }
    Ok(())
}

/// Validates an ISO-4217 style currency code ("INR", "USD").
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be three upper-case letters".to_string(),
        });
    }
    Ok(())
}

/// Validates a validity duration; when present it must be at least one month.
pub fn validate_duration_months(months: Option<u32>) -> ValidationResult<()> {
    if months == Some(0) {
        return Err(ValidationError::OutOfRange {
            field: "validity.duration_months".to_string(),
            min: 1,
            max: u32::MAX as i64,
        });
    }
    Ok(())
}

/// Validates an order id prefix ("PH", "SUB").
///
/// ## Rules
/// - 1 to 10 ASCII letters or digits
pub fn validate_order_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "order id prefix".to_string(),
        });
    }

    if prefix.len() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "order id prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }

    if !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "order id prefix".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a coupon code (before normalisation).
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    validate_required("coupon code", code)?;

    if code.len() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters, digits, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a discount type and value pair.
///
/// ## Rules
/// - PERCENT: 0..=10000 basis points
/// - FLAT: non-negative minor units
/// - any other type is rejected
pub fn validate_discount(discount_type: DiscountType, value: i64) -> ValidationResult<()> {
    match discount_type {
        DiscountType::Percent if !(0..=BPS_DENOMINATOR).contains(&value) => {
            Err(ValidationError::OutOfRange {
                field: "discount_value".to_string(),
                min: 0,
                max: BPS_DENOMINATOR,
            })
        }
        DiscountType::Percent => Ok(()),
        DiscountType::Flat => validate_non_negative(Money::from_minor(value), "discount_value"),
        DiscountType::Unsupported => Err(ValidationError::NotAllowed {
            field: "discount_type".to_string(),
            allowed: vec!["PERCENT".to_string(), "FLAT".to_string()],
        }),
    }
}

/// Validates a minimal email shape: `local@domain.tld`.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates all authored amounts of a purchase.
pub fn validate_amounts(amounts: &Amounts) -> ValidationResult<()> {
    validate_non_negative(amounts.client_pay_total, "client_pay_total")?;
    validate_non_negative(amounts.vendor_pay_total, "vendor_pay_total")?;
    validate_non_negative(amounts.discount, "discount")?;
    validate_non_negative(amounts.taxes, "taxes")?;
    validate_non_negative(amounts.fees, "fees")?;
    validate_currency(&amounts.currency)
}

/// Validates an activation as supplied by the caller.
pub fn validate_activation(activation: &ActivationInput) -> ValidationResult<()> {
    match activation {
        ActivationInput::LoginCredentials { username, secret } => {
            validate_required("activation.username", username)?;
            if let Some(secret) = secret {
                validate_required("activation.secret", secret)?;
            }
            Ok(())
        }
        ActivationInput::CouponCode { code } => validate_required("activation.code", code),
        ActivationInput::EmailInvite { email, .. } => validate_email(email),
    }
}

/// Validates a purchase creation request.
pub fn validate_new_purchase(input: &NewPurchase) -> ValidationResult<()> {
    validate_required("client_id", &input.client_id)?;
    validate_required("product_id", &input.product_id)?;
    if let Some(vendor_id) = &input.vendor_id {
        validate_required("vendor_id", vendor_id)?;
    }
    validate_duration_months(input.validity_duration_months)?;
    validate_amounts(&input.amounts)?;
    if let Some(activation) = &input.activation {
        validate_activation(activation)?;
    }
    Ok(())
}

/// Validates a purchase update request.
pub fn validate_purchase_update(update: &PurchaseUpdate) -> ValidationResult<()> {
    if let Some(vendor_id) = &update.vendor_id {
        validate_required("vendor_id", vendor_id)?;
    }
    validate_duration_months(update.validity_duration_months)?;
    if let Some(amounts) = &update.amounts {
        validate_amounts(amounts)?;
    }
    if let Some(activation) = &update.activation {
        validate_activation(activation)?;
    }
    Ok(())
}

/// Validates a new payment.
pub fn validate_new_payment(input: &NewPayment) -> ValidationResult<()> {
    validate_required("purchase_id", &input.purchase_id)?;
    validate_payment_amount(input.amount)
}

/// Validates a payment update.
pub fn validate_payment_update(update: &PaymentUpdate) -> ValidationResult<()> {
    if let Some(amount) = update.amount {
        validate_payment_amount(amount)?;
    }
    Ok(())
}

/// Validates a coupon creation request.
pub fn validate_new_coupon(input: &NewCoupon) -> ValidationResult<()> {
    validate_coupon_code(&input.code)?;
    validate_discount(input.discount_type, input.discount_value)?;

    if let Some(max_uses) = input.max_uses {
        if max_uses < 1 {
            return Err(ValidationError::MustBePositive {
                field: "max_uses".to_string(),
            });
        }
    }

    if let (Some(from), Some(to)) = (input.valid_from, input.valid_to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "valid_to".to_string(),
                reason: "must not be before valid_from".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{amounts, at, new_purchase, ymd};

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_minor(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_minor(-5)).is_err());
        assert!(validate_payment_amount(Money::from_minor(MAX_SAFE_MINOR_UNITS + 1)).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_amounts(&amounts(1000, 500)).is_ok());

        let mut bad = amounts(1000, 500);
        bad.fees = Money::from_minor(-1);
        assert!(matches!(
            validate_amounts(&bad),
            Err(ValidationError::MustNotBeNegative { .. })
        ));

        let mut bad = amounts(1000, 500);
        bad.currency = "inr".to_string();
        assert!(validate_amounts(&bad).is_err());
    }

    #[test]
    fn test_validate_order_prefix() {
        assert!(validate_order_prefix("PH").is_ok());
        assert!(validate_order_prefix("SUB2").is_ok());
        assert!(validate_order_prefix("").is_err());
        assert!(validate_order_prefix("P-H").is_err());
        assert!(validate_order_prefix(&"P".repeat(11)).is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SAVE-15").is_ok());
        assert!(validate_coupon_code("  ").is_err());
        assert!(validate_coupon_code("has space").is_err());
        assert!(validate_coupon_code(&"A".repeat(41)).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(DiscountType::Percent, 1500).is_ok());
        assert!(validate_discount(DiscountType::Percent, 10_001).is_err());
        assert!(validate_discount(DiscountType::Percent, -1).is_err());
        assert!(validate_discount(DiscountType::Flat, 50_000).is_ok());
        assert!(validate_discount(DiscountType::Flat, -1).is_err());
        assert!(matches!(
            validate_discount(DiscountType::Unsupported, 1),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("client@example.com").is_ok());
        assert!(validate_email("client@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@@example.com").is_err());
    }

    #[test]
    fn test_validate_new_purchase() {
        let input = new_purchase(ymd(2025, 1, 1), 1000, 500);
        assert!(validate_new_purchase(&input).is_ok());

        let mut input = new_purchase(ymd(2025, 1, 1), 1000, 500);
        input.client_id = " ".to_string();
        assert!(validate_new_purchase(&input).is_err());

        let mut input = new_purchase(ymd(2025, 1, 1), 1000, 500);
        input.validity_duration_months = Some(0);
        assert!(validate_new_purchase(&input).is_err());

        let mut input = new_purchase(ymd(2025, 1, 1), 1000, 500);
        input.activation = Some(ActivationInput::EmailInvite {
            email: "nobody".to_string(),
            status: Default::default(),
        });
        assert!(validate_new_purchase(&input).is_err());
    }

    #[test]
    fn test_validate_new_coupon_window() {
        let input = NewCoupon {
            code: "X1".to_string(),
            product_id: None,
            discount_type: DiscountType::Flat,
            discount_value: 100,
            max_uses: Some(0),
            valid_from: None,
            valid_to: None,
            is_active: true,
        };
        assert!(validate_new_coupon(&input).is_err());

        let input = NewCoupon {
            max_uses: Some(10),
            valid_from: Some(at("2025-02-01T00:00:00Z")),
            valid_to: Some(at("2025-01-01T00:00:00Z")),
            ..input
        };
        assert!(validate_new_coupon(&input).is_err());
    }
}
