//! # Demo Walkthrough
//!
//! Seeds an in-memory catalog and walks the full engine loop:
//! warm the cache, search, sell, refresh, search again.
//!
//! ## Usage
//! ```bash
//! # Default walkthrough (searches "rice", sells 2 of the top hit)
//! cargo run -p duka-engine --bin demo
//!
//! # Search for something else
//! cargo run -p duka-engine --bin demo -- --query soda
//!
//! # Sell a different quantity
//! cargo run -p duka-engine --bin demo -- --query water --qty 5
//!
//! # Verbose engine logs
//! RUST_LOG=duka_engine=debug cargo run -p duka-engine --bin demo
//! ```
//!
//! ## Seeded Catalog
//! One shop ("Duka la Mfano") with three categories:
//! - Grains: rice, maize flour, sugar
//! - Beverages: soda crates, bottled water cartons
//! - Household: bar soap, plus a matchbox with no batches at all
//!
//! Items with enough stock get a second, fresher batch so the
//! oldest-first pick and the next-batch hint both have something to do.
//! Rice, soda and water also carry a selling unit (cup, bottle) linked
//! to the oldest batch.

use std::env;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duka_core::catalog::BatchLink;
use duka_core::types::{PaymentInfo, ResultKind, SaleLine, Seller};
use duka_engine::{SaleRequest, SalesService, SearchResult, ServiceConfig};
use duka_store::docs::{BatchDoc, ItemDoc, SellUnitDoc};
use duka_store::memory::MemoryStore;
use duka_store::paths::ItemPath;

const SHOP_ID: &str = "shop-demo";
const SHOP_NAME: &str = "Duka la Mfano";

const DAY_MS: i64 = 86_400_000;

/// Seeded items: (category id, category name, item id, name, base unit, price, stock).
const ITEMS: &[(&str, &str, &str, &str, &str, f64, f64)] = &[
    ("grains", "Grains", "rice", "Pishori Rice", "kg", 180.0, 50.0),
    ("grains", "Grains", "maize-flour", "Maize Flour 2kg", "bale", 1440.0, 18.0),
    ("grains", "Grains", "sugar", "Sugar", "kg", 210.0, 30.0),
    ("drinks", "Beverages", "soda-300", "Soda 300ml", "crate", 600.0, 12.0),
    ("drinks", "Beverages", "water-500", "Drinking Water 500ml", "carton", 480.0, 9.0),
    ("household", "Household", "bar-soap", "Laundry Bar Soap", "piece", 55.0, 40.0),
    ("household", "Household", "matches", "Matchbox", "packet", 120.0, 0.0),
];

/// Selling units layered on top: (item id, unit id, name, conversion factor, unit price).
const SELL_UNITS: &[(&str, &str, &str, f64, f64)] = &[
    ("rice", "cup", "Cup", 4.0, 50.0),
    ("soda-300", "bottle", "Bottle", 24.0, 30.0),
    ("water-500", "bottle", "Bottle", 12.0, 45.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut query = String::from("rice");
    let mut qty: f64 = 2.0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--query" | "-q" => {
                if i + 1 < args.len() {
                    query = args[i + 1].clone();
                    i += 1;
                }
            }
            "--qty" | "-n" => {
                if i + 1 < args.len() {
                    qty = args[i + 1].parse().unwrap_or(2.0);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Duka Engine Demo");
                println!();
                println!("Usage: demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -q, --query <TEXT>  Search query (default: rice)");
                println!("  -n, --qty <N>       Quantity to sell (default: 2)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    println!("🏪 Duka Engine Demo");
    println!("===================");
    println!("Shop:  {} ({})", SHOP_NAME, SHOP_ID);
    println!("Query: {:?}, selling {}", query, qty);
    println!();

    // Seed the store
    let store = Arc::new(MemoryStore::new());
    let (items, units) = seed_catalog(&store);
    println!("✓ Seeded {} items and {} selling units", items, units);

    // Start the service (warms the cache and spawns the watcher)
    let service = SalesService::new(store, ServiceConfig::default());
    service.start().await?;

    let overview = service.cache_overview();
    println!(
        "✓ Catalog cached: {} categories, {} items, {} batches",
        overview.totals.categories, overview.totals.items, overview.totals.batches
    );
    if let Some(refresh) = &overview.last_refresh {
        println!(
            "  Built in {}ms, {} documents quarantined",
            refresh.elapsed_ms, refresh.quarantined
        );
    }

    // Search
    println!();
    println!("Searching {:?}...", query);
    let found = service.search(SHOP_ID, &query);
    if let Some(error) = found.error() {
        println!("⚠ Search failed: {}", error);
        service.shutdown().await?;
        return Ok(());
    }
    if found.items.is_empty() {
        println!("  No results");
    }
    for result in &found.items {
        print_result(result);
    }
    if let Some(stats) = found.stats() {
        println!(
            "  ({} items and {} units scanned in {:.2}ms)",
            stats.items_scanned, stats.selling_units_scanned, stats.processing_time_ms
        );
    }

    // Sell the best fulfillable hit
    let Some(pick) = found.items.iter().find(|r| r.can_fulfill()) else {
        println!();
        println!("⚠ Nothing fulfillable for {:?}, skipping the sale", query);
        service.shutdown().await?;
        return Ok(());
    };
    println!();
    println!("Selling {} × {}...", qty, pick.name());

    let receipt = service
        .complete_sale(SaleRequest {
            shop_id: SHOP_ID.to_string(),
            seller: Seller {
                id: Some("demo".to_string()),
                name: Some("Demo Till".to_string()),
            },
            lines: vec![line_from(pick, qty)],
            payment: PaymentInfo {
                method: "cash".to_string(),
                cash_amount: None,
                notes: "demo sale".to_string(),
            },
        })
        .await;

    if receipt.success {
        println!(
            "✓ {}: total {:.2}, {} line(s) processed",
            receipt.receipt_id.as_deref().unwrap_or("(no receipt)"),
            receipt.summary.total_amount,
            receipt.summary.items_processed
        );
    } else {
        println!("⚠ Sale rejected: {}", receipt.message);
    }
    for error in &receipt.errors {
        println!("  ⚠ {}", error);
    }

    // Refresh and show the deduction
    let stats = service.refresh_catalog().await?;
    info!(elapsed_ms = stats.elapsed_ms, "Catalog rebuilt after sale");

    println!();
    println!("After the sale:");
    let after = service.search(SHOP_ID, &query);
    for result in &after.items {
        print_result(result);
    }

    let batches = service.batch_stats();
    println!();
    println!(
        "✓ {} batches across {} items ({:.1}% batch coverage)",
        batches.total_batches, batches.items_with_batches, batches.percentage_with_batches
    );

    service.shutdown().await?;
    println!();
    println!("✓ Demo complete");

    Ok(())
}

/// Log filter: `RUST_LOG` wins, otherwise engine debug over a quiet default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,duka_engine=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Fills the store with the fixed catalog above. Returns (items, selling units).
fn seed_catalog(store: &MemoryStore) -> (usize, usize) {
    let now_ms = Utc::now().timestamp_millis();

    store.put_shop(SHOP_ID, SHOP_NAME);

    for (idx, &(category_id, category_name, item_id, name, base_unit, price, stock)) in
        ITEMS.iter().enumerate()
    {
        store.put_category(SHOP_ID, category_id, category_name);

        let mut doc = ItemDoc::named(name);
        doc.stock = stock;
        doc.sell_price = price;
        doc.buy_price = (price * 0.8 * 100.0).round() / 100.0;
        doc.base_unit = base_unit.to_string();

        if stock > 0.0 {
            // Bigger items get an older batch plus a fresh restock.
            let older_share = 0.3 + 0.1 * ((idx % 3) as f64);
            let older_qty = (stock * older_share).floor();
            if stock >= 20.0 && older_qty > 0.0 {
                doc.batches.push(BatchDoc::new(
                    format!("{}-b1", item_id),
                    "Opening stock",
                    older_qty,
                    price,
                    now_ms - 30 * DAY_MS,
                ));
                doc.batches.push(BatchDoc::new(
                    format!("{}-b2", item_id),
                    "Restock",
                    stock - older_qty,
                    price,
                    now_ms - 2 * DAY_MS,
                ));
            } else {
                doc.batches.push(BatchDoc::new(
                    format!("{}-b1", item_id),
                    "Opening stock",
                    stock,
                    price,
                    now_ms - 7 * DAY_MS,
                ));
            }
        }

        let oldest = doc
            .batches
            .first()
            .map(|b| (b.id.clone(), b.timestamp, b.quantity));
        store.put_item(&ItemPath::new(SHOP_ID, category_id, item_id), doc);

        for &(parent_id, unit_id, unit_name, factor, unit_price) in SELL_UNITS {
            if parent_id != item_id {
                continue;
            }
            let mut unit = SellUnitDoc::new(unit_name, factor, unit_price);
            if let Some((batch_id, timestamp, batch_qty)) = &oldest {
                unit.batch_links.push(BatchLink {
                    batch_id: batch_id.clone(),
                    batch_timestamp: *timestamp,
                    max_units_available: batch_qty * factor,
                    allocated_units: 0.0,
                    price_per_unit: unit_price,
                });
            }
            store.put_sell_unit(
                &ItemPath::new(SHOP_ID, category_id, item_id),
                unit_id,
                unit,
            );
        }
    }

    (ITEMS.len(), SELL_UNITS.len())
}

/// One line of search output, shaped by the result kind.
fn print_result(result: &SearchResult) {
    match result {
        SearchResult::MainItem(m) => {
            println!(
                "  [{:>5.1}] {} at {:.2} per {} ({} left, batch {:?})",
                m.search_score, m.name, m.price, m.base_unit, m.real_available, m.batch_name
            );
        }
        SearchResult::SellingUnit(u) => {
            println!(
                "  [{:>5.1}] {} at {:.2} each ({} units left)",
                u.search_score, u.display_name, u.price, u.real_available_units
            );
        }
    }
}

/// Turns a ranked result back into the cart line a till would send.
fn line_from(result: &SearchResult, qty: f64) -> SaleLine {
    match result {
        SearchResult::MainItem(m) => SaleLine {
            item_id: m.item_id.clone(),
            category_id: m.category_id.clone(),
            batch_id: m.batch_id.clone(),
            quantity: qty,
            kind: ResultKind::MainItem,
            conversion_factor: 1.0,
            unit: m.base_unit.clone(),
            name: m.name.clone(),
        },
        SearchResult::SellingUnit(u) => SaleLine {
            item_id: u.item_id.clone(),
            category_id: u.category_id.clone(),
            batch_id: u.batch_id.clone().unwrap_or_default(),
            quantity: qty,
            kind: ResultKind::SellingUnit,
            conversion_factor: u.conversion_factor,
            unit: u.name.clone(),
            name: u.display_name.clone(),
        },
    }
}
