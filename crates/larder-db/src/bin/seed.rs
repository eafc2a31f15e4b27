//! # Seed Data Generator
//!
//! Populates the database with a demo kitchen for development.
//!
//! ## Usage
//! ```bash
//! # Seed the catalog only
//! cargo run -p larder-db --bin seed
//!
//! # Seed and ring up 50 sample sales
//! cargo run -p larder-db --bin seed -- --sales 50
//!
//! # Specify database path
//! cargo run -p larder-db --bin seed -- --db ./data/larder.db
//! ```
//!
//! ## Generated Catalog
//! - Store items with opening stock and unit cost (buns, patties, syrup...)
//! - Menu items with recipes, plus one stock-free item (Water)
//!
//! Sample sales cycle through the menu deterministically, so two runs on
//! fresh databases produce the same history. Once stock runs out, further
//! sales fail with insufficient stock and are counted, not retried.

use std::collections::HashMap;
use std::env;

use anyhow::Context;
use larder_core::{Money, OrderLine};
use larder_db::{Database, DbConfig, SaleCommitError};

/// (name, opening stock in base units, cost per unit in cents)
const STORE_ITEMS: &[(&str, i64, i64)] = &[
    ("Bun", 400, 50),
    ("Beef Patty", 200, 150),
    ("Cheddar Slice", 150, 40),
    ("Lettuce Leaf", 300, 10),
    ("Tomato Slice", 300, 15),
    ("Potato Portion", 250, 35),
    ("Cola Syrup (ml)", 6000, 1),
    ("Cup", 500, 5),
];

/// (name, price in cents, recipe as (store item name, quantity per unit))
const MENU: &[(&str, i64, &[(&str, i64)])] = &[
    ("Burger", 500, &[("Bun", 2), ("Beef Patty", 1)]),
    (
        "Cheeseburger",
        650,
        &[("Bun", 2), ("Beef Patty", 1), ("Cheddar Slice", 1)],
    ),
    ("Fries", 250, &[("Potato Portion", 1)]),
    ("Cola", 200, &[("Cola Syrup (ml)", 30), ("Cup", 1)]),
    ("Side Salad", 300, &[("Lettuce Leaf", 4), ("Tomato Slice", 3)]),
    ("Water", 100, &[]),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut sales: usize = 0;
    let mut db_path = String::from("./larder_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Larder Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Sample sales to commit after seeding (default: 0)");
                println!("  -d, --db <PATH>    Database file path (default: ./larder_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Larder Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.store_items().list().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} store items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Store items
    let mut store_ids = HashMap::new();
    for (name, quantity, cost) in STORE_ITEMS {
        let item = db
            .store_items()
            .insert(name, *quantity, Money::from_cents(*cost))
            .await
            .with_context(|| format!("inserting store item {name}"))?;
        store_ids.insert(*name, item.id);
    }
    println!("✓ {} store items", store_ids.len());

    // Menu and recipes
    let mut menu_ids = Vec::with_capacity(MENU.len());
    for (name, price, recipe) in MENU {
        let item = db
            .menu()
            .insert(name, Money::from_cents(*price))
            .await
            .with_context(|| format!("inserting menu item {name}"))?;

        for (ingredient, quantity) in recipe.iter() {
            let store_item_id = store_ids
                .get(ingredient)
                .copied()
                .with_context(|| format!("recipe for {name} uses unknown item {ingredient}"))?;
            db.menu()
                .add_recipe_entry(item.id, store_item_id, *quantity)
                .await?;
        }
        menu_ids.push(item.id);
    }
    println!("✓ {} menu items with recipes", menu_ids.len());

    if sales == 0 {
        println!();
        println!("✓ Seed complete!");
        return Ok(());
    }

    // Sample sales
    println!();
    println!("Committing {} sample sales...", sales);

    let start = std::time::Instant::now();
    let commits = db.sale_commits();
    let mut committed = 0;
    let mut short = 0;
    let mut revenue = Money::zero();

    for n in 0..sales {
        let lines = sample_order(&menu_ids, n);
        match commits.commit(&lines).await {
            Ok(sale) => {
                committed += 1;
                revenue += sale.sale.total_amount();
            }
            Err(SaleCommitError::InsufficientStock { .. }) => short += 1,
            Err(e) => return Err(e).context("committing sample sale"),
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Committed {} sales in {:?} ({} out of stock)", committed, elapsed, short);
    println!("  Revenue: {}", revenue);

    println!();
    println!("Low stock (≤ 20):");
    for item in db.store_items().list_low_stock(20).await? {
        println!("  {:<18} {}", item.name, item.quantity_on_hand);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds the `n`th sample order: one to three lines walking the menu.
fn sample_order(menu_ids: &[i64], n: usize) -> Vec<OrderLine> {
    let line_count = 1 + n % 3;
    (0..line_count)
        .map(|k| {
            let menu_item_id = menu_ids[(n + k * 2) % menu_ids.len()];
            let quantity = 1 + ((n * 7 + k) % 4) as i64;
            OrderLine::new(menu_item_id, quantity)
        })
        .collect()
}
