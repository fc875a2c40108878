//! Test fixtures shared by the unit tests of this crate.

use chrono::{DateTime, NaiveDate, Utc};

use crate::money::Money;
use crate::types::{
    Amounts, Coupon, DiscountType, NewCoupon, NewPayment, NewPurchase, Payment, PaymentType,
    Purchase,
};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn amounts(client_total: i64, vendor_total: i64) -> Amounts {
    Amounts {
        client_pay_total: Money::from_minor(client_total),
        vendor_pay_total: Money::from_minor(vendor_total),
        discount: Money::zero(),
        taxes: Money::zero(),
        fees: Money::zero(),
        currency: "INR".to_string(),
    }
}

pub fn new_purchase(date: NaiveDate, client_total: i64, vendor_total: i64) -> NewPurchase {
    NewPurchase {
        purchase_date: date,
        client_id: "client-1".to_string(),
        product_id: "product-1".to_string(),
        vendor_id: Some("vendor-1".to_string()),
        validity_duration_months: None,
        validity_start_date: None,
        has_warranty: false,
        warranty_months: None,
        activation: None,
        amounts: amounts(client_total, vendor_total),
        notes: None,
    }
}

pub fn purchase(date: NaiveDate) -> Purchase {
    purchase_with_totals(date, 0, 0)
}

pub fn purchase_with_totals(date: NaiveDate, client_total: i64, vendor_total: i64) -> Purchase {
    Purchase::from_new(
        new_purchase(date, client_total, vendor_total),
        None,
        "actor-1",
        Utc::now(),
    )
}

pub fn payment(purchase_id: &str, payment_type: PaymentType, amount: i64) -> Payment {
    Payment::from_new(
        NewPayment {
            purchase_id: purchase_id.to_string(),
            payment_type,
            amount: Money::from_minor(amount),
            paid_on: ymd(2025, 1, 15),
            method: Some("UPI".to_string()),
            reference: None,
        },
        "actor-1",
        Utc::now(),
    )
}

pub fn coupon(discount_type: DiscountType, discount_value: i64) -> Coupon {
    Coupon::from_new(
        NewCoupon {
            code: "save15".to_string(),
            product_id: None,
            discount_type,
            discount_value,
            max_uses: None,
            valid_from: None,
            valid_to: None,
            is_active: true,
        },
        at("2025-01-01T00:00:00Z"),
    )
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}
