//! # Demo Shop Seeder
//!
//! Fills a database with a small hardware shop for development:
//! products across the default categories, two suppliers, a few
//! customers, one purchase and a day of sales (cash and credit).
//!
//! ## Usage
//! ```bash
//! # Seed ./anvil_dev.db
//! cargo run -p anvil-db --bin seed
//!
//! # Specify database path
//! cargo run -p anvil-db --bin seed -- --db ./data/anvil.db
//! ```

use std::env;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use anvil_core::{Money, NewCustomer, NewProduct, NewSupplier, PaymentType, PurchaseCart, SaleCart};
use anvil_db::{Database, DbConfig};

/// (category, name, brand, size, unit, purchase ₹, selling ₹, opening stock)
const PRODUCTS: &[(&str, &str, &str, &str, &str, i64, i64, i64)] = &[
    ("Paint", "Enamel Paint", "Asian Paints", "1 L", "ltr", 310, 395, 24),
    ("Paint", "Wall Primer", "Berger", "4 L", "ltr", 620, 760, 10),
    ("Paint", "Wall Putty", "Birla", "20 kg", "bag", 640, 780, 8),
    ("Plumbing", "CPVC Pipe", "Astral", "1 inch", "pcs", 180, 230, 40),
    ("Plumbing", "Ball Valve", "Zoloto", "1/2 inch", "pcs", 90, 125, 15),
    ("Plumbing", "Teflon Tape", "", "12 m", "pcs", 10, 15, 3),
    ("Steel", "TMT Bar", "Tata Tiscon", "12 mm", "kg", 62, 72, 500),
    ("Steel", "GI Wire", "", "16 gauge", "kg", 85, 105, 60),
    ("Iron", "MS Angle", "", "40x40", "kg", 58, 70, 200),
    ("Tools", "Claw Hammer", "Taparia", "500 g", "pcs", 210, 280, 12),
    ("Tools", "Screwdriver Set", "Stanley", "6 pc", "set", 340, 450, 4),
    ("Others", "Wall Plug", "", "8 mm", "box", 35, 50, 30),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./anvil_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Anvil Demo Shop Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./anvil_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Anvil Demo Shop Seeder");
    println!("======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("Database already has {} products, skipping.", existing);
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    // Products
    let mut products = Vec::with_capacity(PRODUCTS.len());
    for &(category, name, brand, size, unit, buy, sell, stock) in PRODUCTS {
        let mut new = NewProduct::new(name, Money::from_rupees(buy), Money::from_rupees(sell))
            .with_brand(brand)
            .with_size(size)
            .with_unit(unit)
            .with_opening_stock(stock);
        if let Some(category) = db.categories().by_name(category).await? {
            new = new.with_category(category.id);
        }
        products.push(db.products().create(&new).await?);
    }
    println!("✓ {} products", products.len());

    // Parties
    let astral = db
        .suppliers()
        .create(&NewSupplier {
            name: "Astral Distributors".to_string(),
            phone: "9823012345".to_string(),
            address: "MIDC, Pune".to_string(),
        })
        .await?;
    db.suppliers()
        .create(&NewSupplier {
            name: "Sharma Steel Traders".to_string(),
            phone: "9890098900".to_string(),
            address: "Market Yard".to_string(),
        })
        .await?;
    for (name, phone) in [("Ravi Kulkarni", "9999900001"), ("Meena Joshi", "9999900002")] {
        db.customers()
            .create(&NewCustomer {
                name: name.to_string(),
                phone: phone.to_string(),
            })
            .await?;
    }
    println!("✓ 2 suppliers, 2 customers");

    // A part-paid purchase of pipes
    let mut purchase = PurchaseCart::new();
    purchase.set_supplier(Some(astral.id));
    purchase.set_invoice_number("AST-2041");
    purchase.add_product(&products[3], 50, None)?;
    purchase.add_product(&products[4], 10, None)?;
    purchase.set_paid(Money::from_rupees(6000))?;
    let bill = db.ledger().commit_purchase_cart(&mut purchase, Utc::now()).await?;
    println!(
        "✓ Purchase {} for {} ({} pending)",
        bill.purchase.invoice_number,
        bill.purchase.total_amount(),
        bill.purchase.pending_amount()
    );

    // A cash sale and a credit sale
    let mut cart = SaleCart::new();
    cart.add_product(&products[0], 2)?;
    cart.add_product(&products[9], 1)?;
    let cash = db.ledger().commit_sale_cart(&mut cart, Utc::now()).await?;

    cart.set_customer("Ravi Kulkarni", "9999900001");
    cart.set_payment_type(PaymentType::Credit);
    cart.add_product(&products[6], 100)?;
    cart.set_paid(Money::from_rupees(5000))?;
    let credit = db.ledger().commit_sale_cart(&mut cart, Utc::now()).await?;

    println!(
        "✓ Sales {} ({}) and {} ({} pending)",
        cash.sale.invoice_number,
        cash.sale.total_amount(),
        credit.sale.invoice_number,
        credit.sale.pending_amount()
    );

    let summary = db.reports().dashboard().await?;
    println!();
    println!("{}", anvil_db::reports::describe_dashboard(&summary));

    db.close().await;
    Ok(())
}
