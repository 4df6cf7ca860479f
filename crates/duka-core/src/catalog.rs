//! # Catalog Model
//!
//! The materialized catalog: what a shop is selling right now.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Catalog Snapshot                                 │
//! │                                                                         │
//! │  Snapshot                                                              │
//! │   └── CachedShop (id, name)                                            │
//! │        └── CachedCategory (id, name)                                   │
//! │             └── CachedItem (prices, stock, base unit)                  │
//! │                  ├── Batch[]        dated stock lots, FIFO order       │
//! │                  └── SellingUnit[]  alternate units of sale            │
//! │                       └── BatchLink[]  per-batch unit capacity         │
//! │                                                                         │
//! │  A Snapshot is immutable once built. The cache publishes a whole       │
//! │  new Snapshot on refresh; nothing ever patches one in place.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! These are the types the search path walks. The sale path re-reads the
//! store instead, but converts into the same [`Batch`] shape so both sides
//! share the allocation math in [`crate::allocation`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Batch
// =============================================================================

/// A dated lot of stock for an item.
///
/// Batches are consumed oldest-first. `remaining_quantity` is the
/// authoritative sellable amount; `quantity` mirrors it in the snapshot
/// (the store keeps only the remaining figure).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub remaining_quantity: f64,
    /// Unit label the batch was received in (e.g. "carton").
    pub unit: String,
    pub buy_price: f64,
    pub sell_price: f64,
    /// Intake time, epoch milliseconds. Drives FIFO order.
    pub timestamp: i64,
    /// Human-readable intake date as stored.
    pub date: String,
    pub added_by: String,
    /// Units already promised to a selling unit, keyed by selling-unit id.
    #[serde(default)]
    pub selling_unit_allocations: HashMap<String, f64>,
}

impl Batch {
    /// Creates a batch with the fields that matter for allocation.
    ///
    /// Remaining quantity starts equal to the intake quantity. Handy for
    /// seed data and tests; store-loaded batches come via `duka-store`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        sell_price: f64,
        timestamp: i64,
    ) -> Self {
        Batch {
            id: id.into(),
            name: name.into(),
            quantity,
            remaining_quantity: quantity,
            unit: String::new(),
            buy_price: 0.0,
            sell_price,
            timestamp,
            date: String::new(),
            added_by: String::new(),
            selling_unit_allocations: HashMap::new(),
        }
    }

    /// True if anything sellable is left.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.remaining_quantity > 0.0
    }
}

// =============================================================================
// Batch Link
// =============================================================================

/// Capacity record tying a selling unit to one batch.
///
/// `max_units_available` is how many selling units the batch was opened
/// into; `allocated_units` counts what has already been sold out of it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchLink {
    pub batch_id: String,
    /// Intake time of the linked batch, epoch milliseconds (FIFO key).
    pub batch_timestamp: i64,
    pub max_units_available: f64,
    pub allocated_units: f64,
    pub price_per_unit: f64,
}

impl BatchLink {
    /// Selling units still available from this link, clamped at zero.
    #[inline]
    pub fn available_units(&self) -> f64 {
        (self.max_units_available - self.allocated_units).max(0.0)
    }
}

// =============================================================================
// Selling Unit
// =============================================================================

/// An alternate unit of sale (e.g. a single stick from a carton).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SellingUnit {
    pub id: String,
    pub name: String,
    /// How many selling units one base unit yields. Must be > 0 to sell.
    pub conversion_factor: f64,
    pub sell_price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_base_unit: bool,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub batch_links: Vec<BatchLink>,
    /// Σ available units across links, precomputed at snapshot build.
    pub total_units_available: f64,
    pub has_batch_links: bool,
}

impl SellingUnit {
    /// Display label shown in search: "Stick (Safari Cigarettes)".
    pub fn display_name(&self, parent_name: &str) -> String {
        format!("{} ({})", self.name, parent_name)
    }

    /// Recomputes the link-derived fields after links change.
    ///
    /// The total is the raw Σ(max − allocated); an over-allocated link
    /// subtracts from it rather than clamping at zero.
    pub fn recompute_link_totals(&mut self) {
        self.total_units_available = self
            .batch_links
            .iter()
            .map(|l| l.max_units_available - l.allocated_units)
            .sum();
        self.has_batch_links = !self.batch_links.is_empty();
    }
}

// =============================================================================
// Item / Category / Shop
// =============================================================================

/// A sellable item inside one category of one shop.
///
/// `category_id`/`category_name` are denormalized so a search hit can be
/// turned into a result without walking back up the tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedItem {
    pub id: String,
    pub name: String,
    pub thumbnail: Option<String>,
    pub sell_price: f64,
    pub buy_price: f64,
    /// Effective stock: batch total when batches exist, stored figure otherwise.
    pub stock: f64,
    pub base_unit: String,
    pub category_id: String,
    pub category_name: String,
    pub batches: Vec<Batch>,
    pub selling_units: Vec<SellingUnit>,
}

impl CachedItem {
    #[inline]
    pub fn has_batches(&self) -> bool {
        !self.batches.is_empty()
    }
}

/// Effective stock for an item: batch-derived when any batch holds stock,
/// the stored item figure otherwise.
pub fn effective_stock(batches: &[Batch], stored_stock: f64) -> f64 {
    let batch_total: f64 = batches.iter().map(|b| b.quantity).sum();
    if batch_total > 0.0 {
        batch_total
    } else {
        stored_stock
    }
}

/// A category with at least one item. Empty categories never reach the
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedCategory {
    pub id: String,
    pub name: String,
    pub items: Vec<CachedItem>,
}

/// A shop with at least one non-empty category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedShop {
    pub id: String,
    pub name: String,
    pub categories: Vec<CachedCategory>,
}

// =============================================================================
// Snapshot
// =============================================================================

/// One fully-built materialization of every shop's catalog.
///
/// Published by the catalog cache via pointer swap; readers hold an `Arc`
/// to whichever snapshot was current when they started.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Snapshot {
    pub shops: Vec<CachedShop>,
    /// When this snapshot finished building. `None` only for the empty
    /// placeholder published before the first refresh.
    #[ts(as = "Option<String>")]
    pub built_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The placeholder snapshot published before the first refresh.
    pub fn empty() -> Self {
        Snapshot {
            shops: Vec::new(),
            built_at: None,
        }
    }

    pub fn find_shop(&self, shop_id: &str) -> Option<&CachedShop> {
        self.shops.iter().find(|s| s.id == shop_id)
    }

    /// Walks the snapshot and counts what it holds.
    pub fn stats(&self) -> SnapshotStats {
        let mut stats = SnapshotStats {
            shops: self.shops.len(),
            ..SnapshotStats::default()
        };
        for shop in &self.shops {
            stats.categories += shop.categories.len();
            for category in &shop.categories {
                stats.items += category.items.len();
                for item in &category.items {
                    stats.selling_units += item.selling_units.len();
                    stats.batches += item.batches.len();
                    if item.has_batches() {
                        stats.items_with_batches += 1;
                    } else {
                        stats.items_without_batches += 1;
                    }
                }
            }
        }
        stats
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::empty()
    }
}

/// Counts over a snapshot, used by introspection endpoints and refresh logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SnapshotStats {
    pub shops: usize,
    pub categories: usize,
    pub items: usize,
    pub selling_units: usize,
    pub batches: usize,
    pub items_with_batches: usize,
    pub items_without_batches: usize,
}

impl SnapshotStats {
    /// Share of items carrying batches, one decimal place. 0.0 when empty.
    pub fn percentage_with_batches(&self) -> f64 {
        if self.items == 0 {
            return 0.0;
        }
        let pct = self.items_with_batches as f64 / self.items as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
