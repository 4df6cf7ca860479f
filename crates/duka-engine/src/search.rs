//! # Search Engine
//!
//! Stock-aware relevance search over the published catalog snapshot.
//! Every result carries the batch the till should sell from, computed
//! availability, notifications and next-batch hints, so the frontend
//! renders straight from the response.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Search Pipeline                                 │
//! │                                                                         │
//! │  validate ──► find shop ──► scan items (with batches only)              │
//! │                               │                                         │
//! │              ┌────────────────┴───────────────┐                         │
//! │              ▼                                ▼                         │
//! │        score(name)                 composite unit score                 │
//! │        main result                 (name / display / parent×0.7)        │
//! │              │                                │                         │
//! │              └──────► select_batch (FIFO) ◄───┘                         │
//! │                        availability, notifications, next hints          │
//! │                               │                                         │
//! │                               ▼                                         │
//! │        rank: fulfillable > score > units > mains > name                 │
//! │                               ▼                                         │
//! │                  items[] + meta statistics                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Selling-unit availability multiplies the parent batch quantity by the
//! conversion factor (one carton of 20 means 20 sticks); prices divide
//! the batch price the same way.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use duka_core::allocation::{
    notifications, select_batch, NoReservations, ReservationSource, StockNotification,
};
use duka_core::catalog::{Batch, BatchLink, CachedItem, SellingUnit, Snapshot};
use duka_core::scoring::{
    compare_ranked, main_item_status, score, selling_unit_score, selling_unit_status, BatchStatus,
    MatchSource, RankKey, UnitScore,
};
use duka_core::types::UnitType;

// =============================================================================
// Rounding
// =============================================================================

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn elapsed_ms(started: Instant) -> f64 {
    round2(started.elapsed().as_secs_f64() * 1000.0)
}

// =============================================================================
// Results
// =============================================================================

/// One ranked search hit, tagged by what it sells.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchResult {
    MainItem(MainItemResult),
    SellingUnit(SellingUnitResult),
}

impl SearchResult {
    pub fn search_score(&self) -> f64 {
        match self {
            SearchResult::MainItem(r) => r.search_score,
            SearchResult::SellingUnit(r) => r.search_score,
        }
    }

    pub fn can_fulfill(&self) -> bool {
        match self {
            SearchResult::MainItem(r) => r.can_fulfill,
            SearchResult::SellingUnit(r) => r.can_fulfill,
        }
    }

    pub fn batch_switch_required(&self) -> bool {
        match self {
            SearchResult::MainItem(r) => r.batch_switch_required,
            SearchResult::SellingUnit(r) => r.batch_switch_required,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SearchResult::MainItem(r) => &r.name,
            SearchResult::SellingUnit(r) => &r.name,
        }
    }

    fn rank_key(&self) -> RankKey {
        match self {
            SearchResult::MainItem(r) => {
                // Main items do not compete on the unit-count axis.
                RankKey::new(r.can_fulfill, r.search_score, 0.0, false, &r.name)
            }
            SearchResult::SellingUnit(r) => RankKey::new(
                r.can_fulfill,
                r.search_score,
                r.real_available_units,
                true,
                &r.name,
            ),
        }
    }
}

/// An item sold in its base unit.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct MainItemResult {
    pub item_id: String,
    pub main_item_id: String,
    pub category_id: String,
    pub category_name: String,
    pub name: String,
    pub display_name: String,
    pub thumbnail: Option<String>,
    pub batch_status: BatchStatus,
    pub batch_id: String,
    pub batch_name: String,
    /// Base units left in the chosen batch after reservations.
    pub batch_remaining: f64,
    pub real_available: f64,
    pub price: f64,
    pub base_unit: String,
    pub batch_switch_required: bool,
    pub can_fulfill: bool,
    pub is_current_batch: bool,
    pub next_batch_available: bool,
    pub next_batch_id: Option<String>,
    pub next_batch_name: Option<String>,
    pub next_batch_price: Option<f64>,
    pub notifications: Vec<StockNotification>,
    pub unit_type: UnitType,
    pub search_score: f64,
    pub parent_item_name: String,
}

/// A selling unit of an item, priced per unit.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SellingUnitResult {
    pub item_id: String,
    pub main_item_id: String,
    pub sell_unit_id: String,
    pub category_id: String,
    pub category_name: String,
    pub name: String,
    pub display_name: String,
    pub parent_item_name: String,
    pub thumbnail: Option<String>,
    pub batch_status: BatchStatus,
    pub batch_id: Option<String>,
    pub batch_name: Option<String>,
    /// Base units left in the chosen batch.
    pub batch_remaining: f64,
    /// Selling units left: base units × conversion factor.
    pub real_available_units: f64,
    /// Price per selling unit, batch price ÷ conversion factor, 4dp.
    pub price: f64,
    /// Link-declared capacity: Σ(max − allocated) over batch links.
    pub available_stock: f64,
    pub conversion_factor: f64,
    pub base_unit: String,
    /// Requires a switch only when nothing is left at all.
    pub batch_switch_required: bool,
    pub can_fulfill: bool,
    pub is_current_batch: bool,
    pub next_batch_available: bool,
    pub next_batch_id: Option<String>,
    pub next_batch_name: Option<String>,
    pub next_batch_price: Option<f64>,
    pub has_batch_links: bool,
    pub batch_links: Vec<BatchLink>,
    pub notifications: Vec<StockNotification>,
    pub unit_type: UnitType,
    pub search_score: f64,
    pub matched_by: MatchSource,
}

// =============================================================================
// Meta
// =============================================================================

/// Statistics for a served search.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SearchStats {
    pub shop_id: String,
    pub shop_name: String,
    pub query: String,
    pub results: usize,
    /// Results with a positive score.
    pub scored_results: usize,
    /// Results scoring 80 or above.
    pub high_score_results: usize,
    pub main_items_count: usize,
    pub selling_units_count: usize,
    pub can_fulfill_count: usize,
    pub needs_switch_count: usize,
    /// Items with batches that were examined.
    pub items_scanned: usize,
    /// Selling units belonging to scanned items.
    pub selling_units_scanned: usize,
    pub processing_time_ms: f64,
    #[ts(as = "Option<String>")]
    pub cache_last_updated: Option<DateTime<Utc>>,
}

/// Minimal meta for requests that never reached the catalog.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SearchErrorMeta {
    pub error: String,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum SearchMeta {
    Error(SearchErrorMeta),
    Stats(Box<SearchStats>),
}

/// Complete search response: ranked items plus meta.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SearchResponse {
    pub items: Vec<SearchResult>,
    pub meta: SearchMeta,
}

impl SearchResponse {
    fn invalid(error: String, started: Instant) -> Self {
        SearchResponse {
            items: Vec::new(),
            meta: SearchMeta::Error(SearchErrorMeta {
                error,
                processing_time_ms: elapsed_ms(started),
            }),
        }
    }

    /// True when the request was rejected before scanning.
    pub fn is_error(&self) -> bool {
        matches!(self.meta, SearchMeta::Error(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.meta {
            SearchMeta::Error(e) => Some(&e.error),
            SearchMeta::Stats(_) => None,
        }
    }

    pub fn stats(&self) -> Option<&SearchStats> {
        match &self.meta {
            SearchMeta::Stats(s) => Some(s),
            SearchMeta::Error(_) => None,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Scores and ranks catalog entries against a query.
///
/// Stateless apart from the reservation hook; every call works off the
/// snapshot it is handed, so searches never block a cache refresh.
pub struct SearchEngine {
    reservations: Arc<dyn ReservationSource>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        SearchEngine::with_reservations(Arc::new(NoReservations))
    }

    /// Plugs in a live reservation source (e.g. open carts).
    pub fn with_reservations(reservations: Arc<dyn ReservationSource>) -> Self {
        SearchEngine { reservations }
    }

    /// Runs a search against `snapshot`.
    ///
    /// ## Rules
    /// - Empty query or shop id rejects the request with a message
    ///   naming exactly what was missing.
    /// - An unknown shop reports `Shop {id} not found`.
    /// - Items without batches are never candidates and do not count
    ///   as scanned, but they stay in the catalog.
    pub fn search(&self, snapshot: &Snapshot, shop_id: &str, query: &str) -> SearchResponse {
        let started = Instant::now();
        let shop_id = shop_id.trim();
        let normalized = query.trim().to_lowercase();

        if normalized.is_empty() || shop_id.is_empty() {
            let error = if normalized.is_empty() && shop_id.is_empty() {
                "Missing query and shop_id"
            } else if normalized.is_empty() {
                "Missing query"
            } else {
                "Missing shop_id"
            };
            debug!(error, "Rejected search request");
            return SearchResponse::invalid(error.to_string(), started);
        }

        let Some(shop) = snapshot.find_shop(shop_id) else {
            debug!(shop_id, "Search against shop missing from snapshot");
            return SearchResponse::invalid(format!("Shop {} not found", shop_id), started);
        };

        let mut results: Vec<SearchResult> = Vec::new();
        let mut items_scanned = 0usize;
        let mut selling_units_scanned = 0usize;

        for category in &shop.categories {
            for item in &category.items {
                if !item.has_batches() {
                    continue;
                }
                items_scanned += 1;
                selling_units_scanned += item.selling_units.len();

                let item_score = score(&item.name, &normalized);
                if item_score > 0.0 {
                    if let Some(hit) = self.main_item_result(item, item_score) {
                        results.push(SearchResult::MainItem(hit));
                    }
                }

                for unit in &item.selling_units {
                    let display_name = unit.display_name(&item.name);
                    let Some(unit_score) =
                        selling_unit_score(&unit.name, &display_name, &item.name, &normalized)
                    else {
                        continue;
                    };
                    if !unit_score.qualifies() {
                        continue;
                    }
                    // Checked after the threshold so a bad unit is skipped
                    // even when it matches well.
                    if unit.conversion_factor <= 0.0 {
                        debug!(
                            unit = %display_name,
                            conversion_factor = unit.conversion_factor,
                            "Skipping selling unit with non-positive conversion factor"
                        );
                        continue;
                    }
                    results.push(SearchResult::SellingUnit(self.selling_unit_result(
                        item,
                        unit,
                        display_name,
                        unit_score,
                    )));
                }
            }
        }

        let mut keyed: Vec<(RankKey, SearchResult)> =
            results.into_iter().map(|r| (r.rank_key(), r)).collect();
        keyed.sort_by(|a, b| compare_ranked(&a.0, &b.0));
        let items: Vec<SearchResult> = keyed.into_iter().map(|(_, r)| r).collect();

        let scored_results = items.iter().filter(|r| r.search_score() > 0.0).count();
        let high_score_results = items.iter().filter(|r| r.search_score() >= 80.0).count();
        let main_items_count = items
            .iter()
            .filter(|r| matches!(r, SearchResult::MainItem(_)))
            .count();
        let can_fulfill_count = items.iter().filter(|r| r.can_fulfill()).count();
        let needs_switch_count = items.iter().filter(|r| r.batch_switch_required()).count();
        let processing_time_ms = elapsed_ms(started);

        info!(
            shop_id,
            query = %normalized,
            results = items.len(),
            can_fulfill = can_fulfill_count,
            processing_time_ms,
            "Search served"
        );

        let stats = SearchStats {
            shop_id: shop_id.to_string(),
            shop_name: shop.name.clone(),
            query: normalized,
            results: items.len(),
            scored_results,
            high_score_results,
            main_items_count,
            selling_units_count: items.len() - main_items_count,
            can_fulfill_count,
            needs_switch_count,
            items_scanned,
            selling_units_scanned,
            processing_time_ms,
            cache_last_updated: snapshot.built_at,
        };

        SearchResponse {
            items,
            meta: SearchMeta::Stats(Box::new(stats)),
        }
    }

    fn main_item_result(&self, item: &CachedItem, item_score: f64) -> Option<MainItemResult> {
        let selection = select_batch(
            &item.batches,
            UnitType::Base,
            1.0,
            None,
            self.reservations.as_ref(),
            &item.id,
        )?;
        let chosen = &selection.chosen;
        let real = chosen.availability.real_quantity;
        let next = selection.next_available();

        Some(MainItemResult {
            item_id: item.id.clone(),
            main_item_id: item.id.clone(),
            category_id: item.category_id.clone(),
            category_name: item.category_name.clone(),
            name: item.name.clone(),
            display_name: item.name.clone(),
            thumbnail: item.thumbnail.clone(),
            batch_status: main_item_status(real),
            batch_id: chosen.batch.id.clone(),
            batch_name: chosen.batch.name.clone(),
            batch_remaining: real,
            real_available: real,
            price: round2(chosen.batch.sell_price),
            base_unit: base_unit_label(Some(chosen.batch), item),
            batch_switch_required: !chosen.can_fulfill,
            can_fulfill: chosen.can_fulfill,
            is_current_batch: chosen.is_current,
            next_batch_available: next.is_some(),
            next_batch_id: next.map(|c| c.batch.id.clone()),
            next_batch_name: next.map(|c| c.batch.name.clone()),
            next_batch_price: next.map(|c| round2(c.batch.sell_price)),
            notifications: notifications(chosen, UnitType::Base),
            unit_type: UnitType::Base,
            search_score: item_score,
            parent_item_name: item.name.clone(),
        })
    }

    fn selling_unit_result(
        &self,
        item: &CachedItem,
        unit: &SellingUnit,
        display_name: String,
        unit_score: UnitScore,
    ) -> SellingUnitResult {
        let conversion = unit.conversion_factor;
        let selection = select_batch(
            &item.batches,
            UnitType::SellingUnit,
            conversion,
            None,
            self.reservations.as_ref(),
            &item.id,
        );

        let (chosen_batch, batch_remaining, units, can_fulfill, is_current, status, notes, next) =
            match &selection {
                Some(sel) => {
                    let chosen = &sel.chosen;
                    let units = chosen.availability.available_selling_units;
                    let (status, notes) = if unit.has_batch_links {
                        (
                            selling_unit_status(units),
                            notifications(chosen, UnitType::SellingUnit),
                        )
                    } else {
                        // Sellable off the raw batch, but flagged so the
                        // shopkeeper knows no link backs this unit.
                        (
                            BatchStatus::NoBatchLink,
                            vec![StockNotification::no_batch_link()],
                        )
                    };
                    (
                        Some(chosen.batch),
                        chosen.availability.real_quantity,
                        units,
                        chosen.can_fulfill,
                        chosen.is_current,
                        status,
                        notes,
                        sel.next_available(),
                    )
                }
                None => (
                    None,
                    0.0,
                    0.0,
                    false,
                    false,
                    BatchStatus::NoBatches,
                    vec![StockNotification::no_batches()],
                    None,
                ),
            };

        let price = chosen_batch.map_or(0.0, |b| b.sell_price / conversion);
        let next_price = next
            .map(|c| c.batch.sell_price / conversion)
            .filter(|p| *p != 0.0)
            .map(round4);

        SellingUnitResult {
            item_id: item.id.clone(),
            main_item_id: item.id.clone(),
            sell_unit_id: unit.id.clone(),
            category_id: item.category_id.clone(),
            category_name: item.category_name.clone(),
            name: unit.name.clone(),
            display_name,
            parent_item_name: item.name.clone(),
            thumbnail: unit.thumbnail.clone().or_else(|| item.thumbnail.clone()),
            batch_status: status,
            batch_id: chosen_batch.map(|b| b.id.clone()),
            batch_name: chosen_batch.map(|b| b.name.clone()),
            batch_remaining,
            real_available_units: units,
            price: round4(price),
            available_stock: round2(unit.total_units_available),
            conversion_factor: conversion,
            base_unit: base_unit_label(chosen_batch, item),
            batch_switch_required: !can_fulfill && units <= 0.0,
            can_fulfill,
            is_current_batch: is_current,
            next_batch_available: next.is_some(),
            next_batch_id: next.map(|c| c.batch.id.clone()),
            next_batch_name: next.map(|c| c.batch.name.clone()),
            next_batch_price: next_price,
            has_batch_links: unit.has_batch_links,
            batch_links: unit.batch_links.clone(),
            notifications: notes,
            unit_type: UnitType::SellingUnit,
            search_score: unit_score.score,
            matched_by: unit_score.matched_by,
        }
    }
}

/// Unit label for display: the batch's unit, the item's base unit, or
/// plain "unit" when neither is set.
fn base_unit_label(batch: Option<&Batch>, item: &CachedItem) -> String {
    if let Some(batch) = batch {
        if !batch.unit.is_empty() {
            return batch.unit.clone();
        }
    }
    if !item.base_unit.is_empty() {
        return item.base_unit.clone();
    }
    "unit".to_string()
}

// =============================================================================
// Tests
// =============================================================================
