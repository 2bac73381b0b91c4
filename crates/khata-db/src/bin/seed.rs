//! # Seed Data Generator
//!
//! Populates the database with a small, realistic shop: a building-materials
//! catalog, a handful of credit customers, some sales, and one payment.
//!
//! ## Usage
//! ```bash
//! cargo run -p khata-db --bin seed
//!
//! # Specify database path
//! cargo run -p khata-db --bin seed -- --db ./data/khata.db
//! ```

use std::env;
use std::sync::Arc;

use khata_core::{
    CategoryRef, NewCustomer, NewProduct, NewStockItem, NewTransaction, NewTransactionLine,
};
use khata_db::{Database, DbConfig, LogNotifier};

/// (category, sub-category, product title, unit, quantity, cost per unit in cents)
const PRODUCTS: &[(&str, &str, &str, &str, i64, i64)] = &[
    ("cement", "ultratech", "Ultratech OPC 53", "bag", 120, 38_000),
    ("cement", "acc", "ACC Gold", "bag", 80, 36_500),
    ("rod", "tata", "Tata Tiscon 12mm", "piece", 200, 95_000),
    ("rod", "tata", "Tata Tiscon 8mm", "piece", 300, 42_000),
    ("paint", "asian", "Asian Paints Apex 20L", "bucket", 15, 520_000),
    ("paint", "asian", "Asian Paints Primer 10L", "bucket", 25, 180_000),
    ("sand", "river", "River Sand", "tonne", 40, 160_000),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Ramesh Kumar", "9876543210", "Main Bazaar"),
    ("Suresh Yadav", "9812345678", "Station Road"),
    ("Anita Devi", "9900112233", "Gandhi Chowk"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./khata_dev.db");

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
                println!("Khata Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./khata_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Khata Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = db.catalog();

    let mut product_ids = Vec::new();
    for (idx, (category, sub, title, unit, qty, price)) in PRODUCTS.iter().enumerate() {
        let product = catalog
            .create_product(NewProduct {
                title: title.to_string(),
                category: CategoryRef::new(format!("cat-{category}"), *category),
                sub_category: CategoryRef::new(format!("sub-{sub}-{idx}"), *sub),
                child_category: None,
                items: vec![NewStockItem {
                    unit: unit.to_string(),
                    quantity: *qty,
                    price_per_unit_cents: *price,
                }],
                created_by: "seed".to_string(),
            })
            .await?;
        product_ids.push(product.id);
    }
    println!("✓ {} products created", product_ids.len());

    let mut customer_ids = Vec::new();
    for (name, phone, address) in CUSTOMERS {
        let customer = catalog
            .create_customer(NewCustomer {
                name: name.to_string(),
                phone: phone.to_string(),
                address: Some(address.to_string()),
                created_by: Some("seed".to_string()),
            })
            .await?;
        customer_ids.push(customer.id);
    }
    println!("✓ {} customers created", customer_ids.len());

    // A few credit sales: each customer buys from a different product, with
    // a 20% markup over cost and a partial up-front payment.
    let ledger = db.ledger();
    for (i, customer_id) in customer_ids.iter().enumerate() {
        let product_id = &product_ids[i % product_ids.len()];
        let cost = PRODUCTS[i % PRODUCTS.len()].5;
        let sale_price = cost + cost / 5;

        let sale = ledger
            .create_transaction(NewTransaction {
                customer_id: customer_id.clone(),
                lines: vec![NewTransactionLine {
                    product_id: product_id.clone(),
                    category_id: None,
                    sub_category_id: None,
                    child_category_id: None,
                    unit: None,
                    quantity: 3 + i as i64,
                    price_per_unit_cents: sale_price,
                }],
                paid_cents: sale_price, // pays for one unit up front
                created_by: Some("seed".to_string()),
            })
            .await?;
        println!(
            "✓ Sale {}: total {} paid {} balance {}",
            sale.id, sale.total_cents, sale.paid_cents, sale.balance_cents
        );
    }

    // One payment against the first customer's ledger.
    let reconciler = db.payments().with_notifier(Arc::new(LogNotifier));
    let outcome = reconciler.allocate(&customer_ids[0], 50_000).await?;
    println!(
        "✓ Payment allocated: {} applied, {} discarded",
        outcome.allocated_cents, outcome.discarded_cents
    );

    println!();
    println!("Done.");
    Ok(())
}
