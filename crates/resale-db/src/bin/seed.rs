//! # Seed Data Generator
//!
//! Populates the database with demo purchases, payments and coupons for
//! development.
//!
//! ## Usage
//! ```bash
//! # Vault key is required (base64 of 32 bytes)
//! export RESALE_VAULT_KEY=$(head -c 32 /dev/urandom | base64)
//!
//! # Generate 50 purchases (default)
//! cargo run -p resale-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p resale-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p resale-db --bin seed -- --db ./data/resale.db
//! ```
//!
//! ## Generated Data
//! - Purchases across a fixed product catalogue, one in five with warranty
//! - Activation varying between login, coupon code and email invite
//! - Client and vendor payments covering none, part or all of each total
//! - A handful of coupons (percent, flat, limited, product-scoped)

use chrono::{Duration, NaiveDate, Utc};
use std::env;
use tracing_subscriber::EnvFilter;

use resale_core::{
    ActivationInput, Amounts, DiscountType, InviteStatus, Money, NewCoupon, NewPayment,
    NewPurchase, PaymentType, PurchaseStatus, SYSTEM_ACTOR_ID,
};
use resale_db::{DbError, Engine, EngineConfig};

/// Products with (id, validity months, client price, vendor cost) in paise
const PRODUCTS: &[(&str, u32, i64, i64)] = &[
    ("netflix-premium", 12, 649_900, 520_000),
    ("spotify-family", 12, 179_900, 140_000),
    ("youtube-premium", 12, 129_000, 99_000),
    ("office-365", 12, 489_900, 390_000),
    ("canva-pro", 12, 399_900, 300_000),
    ("chatgpt-plus", 1, 199_900, 170_000),
    ("adobe-cc", 1, 459_900, 400_000),
    ("nordvpn", 24, 349_900, 260_000),
];

/// Fraction of the client total paid, in percent
const PAID_SHARES: &[i64] = &[0, 50, 100, 100, 30];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Resale Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of purchases to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: $RESALE_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = EngineConfig::from_env()?;
    if let Some(path) = db_path {
        config.database_path = path.into();
    }

    println!("🌱 Resale Ledger Seed Data Generator");
    println!("====================================");
    println!("Database:  {}", config.database_path.display());
    println!("Purchases: {}", count);
    println!();

    let engine = Engine::from_config(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
        .fetch_one(engine.database().pool())
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} purchases", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Coupons
    println!();
    println!("Creating coupons...");
    for coupon in demo_coupons() {
        let code = coupon.code.clone();
        match engine.create_coupon(coupon).await {
            Ok(_) => println!("  {}", code),
            Err(DbError::UniqueViolation { .. }) => println!("  {} (exists)", code),
            Err(e) => return Err(e.into()),
        }
    }

    // Purchases and payments
    println!();
    println!("Generating purchases...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut payments = 0;
    let mut completed = 0;

    for seed in 0..count {
        let input = generate_purchase(seed);
        let client_total = input.amounts.client_pay_total.minor();
        let vendor_total = input.amounts.vendor_pay_total.minor();
        let paid_on = input.purchase_date;

        let purchase = match engine.create_purchase(input, SYSTEM_ACTOR_ID).await {
            Ok(purchase) => purchase,
            Err(e) => {
                eprintln!("Failed to create purchase {}: {}", seed, e);
                continue;
            }
        };
        generated += 1;

        let share = PAID_SHARES[seed % PAID_SHARES.len()];
        let mut last_status = purchase.status;

        for (payment_type, total) in [
            (PaymentType::Client, client_total),
            (PaymentType::Vendor, vendor_total),
        ] {
            let amount = total * share / 100;
            if amount <= 0 {
                continue;
            }

            let payment = NewPayment {
                purchase_id: purchase.id.clone(),
                payment_type,
                amount: Money::from_minor(amount),
                paid_on,
                method: Some(if seed % 2 == 0 { "UPI" } else { "BANK_TRANSFER" }.to_string()),
                reference: Some(format!("SEED-{:05}", seed)),
            };

            let recorded = engine.record_payment(payment, SYSTEM_ACTOR_ID).await?;
            last_status = recorded.purchase.status;
            payments += 1;
        }

        if last_status == PurchaseStatus::Completed {
            completed += 1;
        }

        if generated % 10 == 0 {
            println!("  Generated {} purchases...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} purchases and {} payments in {:?}",
        generated, payments, elapsed
    );
    println!("  Completed: {}", completed);
    println!("  Open:      {}", generated - completed);

    // Verify order ids
    println!();
    println!(
        "Next order id: {}",
        engine.next_order_id(&engine.settings().order_prefix).await?
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single purchase with realistic data.
fn generate_purchase(seed: usize) -> NewPurchase {
    let (product_id, months, client_price, vendor_cost) = PRODUCTS[seed % PRODUCTS.len()];

    let first_day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN);
    let purchase_date = first_day + Duration::days((seed % 365) as i64);

    let activation = match seed % 3 {
        0 => ActivationInput::LoginCredentials {
            username: format!("client{}@example.com", seed),
            secret: Some(format!("demo-pass-{:04}", seed)),
        },
        1 => ActivationInput::CouponCode {
            code: format!("ACT-{:08X}", seed * 7919),
        },
        _ => ActivationInput::EmailInvite {
            email: format!("client{}@example.com", seed),
            status: InviteStatus::Sent,
        },
    };

    let has_warranty = seed % 5 == 0;

    NewPurchase {
        purchase_date,
        client_id: format!("client-{:03}", seed % 40),
        product_id: product_id.to_string(),
        vendor_id: Some(format!("vendor-{}", seed % 4)),
        validity_duration_months: Some(months),
        validity_start_date: None,
        has_warranty,
        warranty_months: has_warranty.then_some(months.min(6)),
        activation: Some(activation),
        amounts: Amounts {
            client_pay_total: Money::from_minor(client_price),
            vendor_pay_total: Money::from_minor(vendor_cost),
            discount: Money::zero(),
            taxes: Money::zero(),
            fees: Money::zero(),
            currency: "INR".to_string(),
        },
        notes: None,
    }
}

fn demo_coupons() -> Vec<NewCoupon> {
    let now = Utc::now();

    vec![
        NewCoupon {
            code: "WELCOME10".to_string(),
            product_id: None,
            discount_type: DiscountType::Percent,
            discount_value: 1000,
            max_uses: None,
            valid_from: None,
            valid_to: None,
            is_active: true,
        },
        NewCoupon {
            code: "FLAT500".to_string(),
            product_id: None,
            discount_type: DiscountType::Flat,
            discount_value: 50_000,
            max_uses: Some(100),
            valid_from: Some(now),
            valid_to: Some(now + Duration::days(90)),
            is_active: true,
        },
        NewCoupon {
            code: "NETFLIX15".to_string(),
            product_id: Some("netflix-premium".to_string()),
            discount_type: DiscountType::Percent,
            discount_value: 1500,
            max_uses: Some(25),
            valid_from: None,
            valid_to: None,
            is_active: true,
        },
    ]
}
