//! # Seed Data Generator
//!
//! Creates a store profile and a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # 200 products for tenant "demo" (defaults)
//! cargo run -p tendero-db --bin seed
//!
//! # Custom tenant, amount and database path
//! cargo run -p tendero-db --bin seed -- --tenant kiosco-sol --count 500 --db ./data/tendero.db
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG=debug` for per-statement
//! detail.

use std::env;

use tendero_core::{Category, NewProduct, TenantId};
use tendero_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Demo catalog: category, barcode prefix and product names.
const CATALOG: &[(Category, &str, &[&str])] = &[
    (
        Category::Beverages,
        "7790",
        &["Coca-Cola 500ml", "Agua mineral 1.5L", "Jugo de naranja 1L", "Cerveza 473ml", "Soda 2L"],
    ),
    (
        Category::Bakery,
        "7791",
        &["Pan francés 1kg", "Medialunas x6", "Facturas x12", "Pan lactal", "Bizcochos 200g"],
    ),
    (
        Category::Pantry,
        "7792",
        &["Yerba mate 1kg", "Azúcar 1kg", "Fideos 500g", "Arroz 1kg", "Aceite girasol 900ml"],
    ),
    (
        Category::Dairy,
        "7793",
        &["Leche entera 1L", "Yogur bebible 1L", "Queso cremoso 500g", "Manteca 200g", "Dulce de leche 400g"],
    ),
    (
        Category::Snacks,
        "7794",
        &["Papas fritas 150g", "Alfajor triple", "Maní salado 200g", "Galletitas dulces", "Chocolate 100g"],
    ),
    (
        Category::Cleaning,
        "7795",
        &["Lavandina 1L", "Detergente 750ml", "Jabón en polvo 800g", "Esponja x3", "Papel higiénico x4"],
    ),
];

struct Args {
    db_path: String,
    tenant: String,
    count: usize,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        db_path: "./tendero_dev.db".to_string(),
        tenant: "demo".to_string(),
        count: 200,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.count = value.parse().unwrap_or(parsed.count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.db_path = value.clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.tenant = value.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tendero Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>      Database file path (default: ./tendero_dev.db)");
                println!("  -t, --tenant <ID>    Tenant id to seed (default: demo)");
                println!("  -h, --help           Show this help message");
                return None;
            }
            other => warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };
    let tenant = TenantId::new(&args.tenant);

    info!(db = %args.db_path, tenant = %tenant, count = args.count, "Seeding database");

    let db = Database::new(DbConfig::new(&args.db_path)).await?;

    db.stores()
        .upsert(
            &tenant,
            &format!("Almacén {}", args.tenant),
            &format!("{}@tendero.local", args.tenant),
            None,
            true,
        )
        .await?;
    info!("Store profile ready");

    let existing = db.products().count(&tenant).await?;
    if existing > 0 {
        warn!(existing, "Tenant already has products, skipping catalog seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0usize;

    'outer: for round in 0.. {
        for (category, prefix, names) in CATALOG {
            for (idx, name) in names.iter().enumerate() {
                if generated >= args.count {
                    break 'outer;
                }

                let product = demo_product(*category, prefix, name, round, idx, generated);
                match db.products().insert(&tenant, &product).await {
                    Ok(_) => generated += 1,
                    Err(e) => warn!(barcode = %product.barcode, error = %e, "Failed to insert product"),
                }
            }
        }
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");
    Ok(())
}

/// Deterministic demo product. Later rounds get a numbered variant name.
fn demo_product(
    category: Category,
    prefix: &str,
    name: &str,
    round: usize,
    idx: usize,
    seed: usize,
) -> NewProduct {
    let barcode = format!("{prefix}{round:05}{idx:04}");
    let name = if round == 0 {
        name.to_string()
    } else {
        format!("{name} #{}", round + 1)
    };

    // 1.50 - 49.99
    let price_cents = 150 + ((seed * 137) % 4850) as i64;
    let stock = (seed % 60) as i64;
    let min_stock = 5 + (seed % 3) as i64 * 5;

    NewProduct::new(barcode, name, price_cents, stock)
        .with_category(category)
        .with_min_stock(min_stock)
}
