//! # Response Shapes
//!
//! Wire DTOs for the non-search surfaces: the sale response the till
//! consumes, plus the cache overview, batch statistics and status
//! summaries served by introspection endpoints.
//!
//! Sale responses are deliberately forgiving: only an outright rejected
//! request reports `success: false`. Line failures and even a failed
//! commit ride along inside an otherwise successful response so the
//! frontend never dead-ends mid-sale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use duka_core::catalog::{Snapshot, SnapshotStats};
use duka_core::types::{Receipt, ReceiptLine};

use crate::catalog::{CatalogCache, RefreshStats};
use crate::sale::{SaleOutcome, SaleReport};

// =============================================================================
// Sale response
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export)]
pub struct PaymentSummary {
    pub method: String,
    pub amount: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export)]
pub struct SaleSummary {
    pub total_amount: f64,
    pub items_processed: usize,
    pub items_failed: usize,
    pub payment: PaymentSummary,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export)]
pub struct SaleMetadata {
    pub processing_time_ms: u64,
    /// Lines in the request before the cap was applied.
    pub requested_items: usize,
    /// Lines dropped by the cap.
    pub truncated_items: usize,
}

/// What the till gets back for every sale request.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SaleResponse {
    pub success: bool,

    /// Set only when the request was rejected outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<String>,

    pub processed_items: Vec<ReceiptLine>,
    pub summary: SaleSummary,

    /// Per-line failure messages, same order they occurred.
    pub errors: Vec<String>,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,

    pub metadata: SaleMetadata,
}

impl SaleResponse {
    pub fn from_outcome(outcome: SaleOutcome) -> Self {
        match outcome {
            SaleOutcome::Completed(report) => Self::from_report(report),
            SaleOutcome::PartialFailure(report, _) => Self::from_report(report),
            SaleOutcome::Rejected(rejection) => {
                let message = rejection.to_string();
                SaleResponse {
                    success: false,
                    error: Some(message.clone()),
                    receipt_id: None,
                    processed_items: Vec::new(),
                    summary: SaleSummary::default(),
                    errors: Vec::new(),
                    message,
                    warning: None,
                    error_details: None,
                    metadata: SaleMetadata::default(),
                }
            }
        }
    }

    fn from_report(report: SaleReport) -> Self {
        let items_processed = report.receipt.items.len();
        let message = if items_processed > 0 {
            format!("Processed {} item(s) successfully", items_processed)
        } else {
            "No items processed".to_string()
        };

        SaleResponse {
            success: true,
            error: None,
            receipt_id: Some(report.receipt.id),
            summary: SaleSummary {
                total_amount: report.receipt.total_amount,
                items_processed,
                items_failed: report.receipt.errors.len(),
                payment: PaymentSummary {
                    method: report.receipt.payment_method,
                    amount: report.receipt.payment_amount,
                    notes: report.receipt.payment_notes,
                },
            },
            processed_items: report.receipt.items,
            errors: report.receipt.errors,
            message,
            warning: None,
            error_details: None,
            metadata: SaleMetadata {
                processing_time_ms: report.receipt.processing_time_ms,
                requested_items: report.requested_lines,
                truncated_items: report.truncated_lines,
            },
        }
    }

    /// Soft-success shape for faults outside the sale flow itself.
    ///
    /// Mirrors a completed sale closely enough that the till keeps
    /// working, but carries a warning telling the shopkeeper to verify
    /// stock by hand. Details are capped at 200 characters.
    pub fn from_fault(details: &str) -> Self {
        let truncated: String = details.chars().take(200).collect();
        SaleResponse {
            success: true,
            error: None,
            receipt_id: Some(Receipt::error_id(Utc::now().timestamp())),
            processed_items: Vec::new(),
            summary: SaleSummary {
                items_failed: 1,
                ..SaleSummary::default()
            },
            errors: Vec::new(),
            message: "Sale recorded with errors. Please verify stock.".to_string(),
            warning: Some(
                "Sale may not have been fully processed. Please check stock manually.".to_string(),
            ),
            error_details: Some(truncated),
            metadata: SaleMetadata::default(),
        }
    }
}

// =============================================================================
// Cache overview
// =============================================================================

/// Per-shop breakdown row in the cache overview.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ShopOverviewRow {
    pub shop_id: String,
    pub shop_name: String,
    pub categories: usize,
    pub items: usize,
    pub selling_units: usize,
    pub batches: usize,
}

/// How the last refresh went.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct RefreshSummary {
    #[ts(as = "String")]
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub quarantined: usize,
}

/// Everything the cache currently holds, summarized for operators.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct CacheOverview {
    pub totals: SnapshotStats,
    pub shops: Vec<ShopOverviewRow>,
    /// Absent until the first refresh completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<RefreshSummary>,
}

impl CacheOverview {
    pub fn build(snapshot: &Snapshot, last: Option<&RefreshStats>) -> Self {
        let shops = snapshot
            .shops
            .iter()
            .map(|shop| {
                let mut row = ShopOverviewRow {
                    shop_id: shop.id.clone(),
                    shop_name: shop.name.clone(),
                    categories: shop.categories.len(),
                    items: 0,
                    selling_units: 0,
                    batches: 0,
                };
                for category in &shop.categories {
                    row.items += category.items.len();
                    for item in &category.items {
                        row.selling_units += item.selling_units.len();
                        row.batches += item.batches.len();
                    }
                }
                row
            })
            .collect();

        CacheOverview {
            totals: snapshot.stats(),
            shops,
            last_refresh: last.map(|stats| RefreshSummary {
                finished_at: stats.finished_at,
                elapsed_ms: stats.elapsed_ms,
                quarantined: stats.quarantined,
            }),
        }
    }
}

// =============================================================================
// Batch statistics
// =============================================================================

/// Batch coverage across the cached catalog.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct BatchStatsReport {
    pub total_batches: usize,
    pub items_with_batches: usize,
    pub items_without_batches: usize,
    /// One decimal place; 0.0 for an empty catalog.
    pub percentage_with_batches: f64,
}

impl BatchStatsReport {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let stats = snapshot.stats();
        BatchStatsReport {
            total_batches: stats.batches,
            items_with_batches: stats.items_with_batches,
            items_without_batches: stats.items_without_batches,
            percentage_with_batches: stats.percentage_with_batches(),
        }
    }
}

// =============================================================================
// Status summary
// =============================================================================

/// Health-check answer.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct StatusSummary {
    pub cache_loaded: bool,
    pub shops_cached: usize,
    /// RFC 3339, `null` before the first refresh.
    #[ts(as = "Option<String>")]
    pub last_cache_update: Option<DateTime<Utc>>,
    pub service: String,
    pub version: String,
}

impl StatusSummary {
    pub fn collect(cache: &CatalogCache) -> Self {
        let snapshot = cache.current();
        StatusSummary {
            cache_loaded: cache.is_loaded(),
            shops_cached: snapshot.shops.len(),
            last_cache_update: cache.last_refresh(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::{SaleLineError, SaleRejection};
    use duka_core::catalog::{Batch, CachedCategory, CachedItem, CachedShop};
    use duka_core::types::Seller;

    fn receipt(items: Vec<ReceiptLine>, errors: Vec<String>) -> Receipt {
        let total = items.iter().map(|l| l.total_price).sum();
        Receipt {
            id: "RCPT_1700000000_shop".to_string(),
            shop_id: "shop1".to_string(),
            seller: Seller::default(),
            items,
            total_amount: total,
            payment_method: "cash".to_string(),
            payment_amount: total,
            payment_notes: String::new(),
            timestamp: Utc::now(),
            processing_time_ms: 12,
            status: "completed".to_string(),
            errors,
        }
    }

    fn receipt_line(total_price: f64) -> ReceiptLine {
        ReceiptLine {
            item_id: "i1".to_string(),
            item_name: "Rice".to_string(),
            item_type: duka_core::types::ResultKind::MainItem,
            batch_id: "b1".to_string(),
            quantity_sold: 2.0,
            base_units_deducted: 2.0,
            remaining_batch_quantity: 8.0,
            remaining_total_stock: 8.0,
            batch_exhausted: false,
            total_price,
        }
    }

    fn report(receipt: Receipt) -> SaleReport {
        SaleReport {
            receipt,
            receipt_persisted: true,
            requested_lines: 1,
            truncated_lines: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Sale responses
    // -------------------------------------------------------------------------

    #[test]
    fn completed_outcome_maps_to_success() {
        let outcome = SaleOutcome::Completed(report(receipt(vec![receipt_line(500.0)], vec![])));
        let resp = SaleResponse::from_outcome(outcome);

        assert!(resp.success);
        assert_eq!(resp.receipt_id.as_deref(), Some("RCPT_1700000000_shop"));
        assert_eq!(resp.processed_items.len(), 1);
        assert_eq!(resp.summary.total_amount, 500.0);
        assert_eq!(resp.summary.items_processed, 1);
        assert_eq!(resp.summary.items_failed, 0);
        assert_eq!(resp.summary.payment.method, "cash");
        assert_eq!(resp.message, "Processed 1 item(s) successfully");
        assert!(resp.error.is_none());
        assert!(resp.warning.is_none());
        assert_eq!(resp.metadata.processing_time_ms, 12);
        assert_eq!(resp.metadata.requested_items, 1);
    }

    #[test]
    fn partial_failure_keeps_success_with_errors_listed() {
        let errors = vec!["Insufficient stock for Rice: need 100, have 6".to_string()];
        let outcome = SaleOutcome::PartialFailure(
            report(receipt(vec![receipt_line(500.0)], errors.clone())),
            vec![SaleLineError::InsufficientStock {
                name: "Rice".to_string(),
                needed: 100.0,
                available: 6.0,
            }],
        );
        let resp = SaleResponse::from_outcome(outcome);

        assert!(resp.success);
        assert_eq!(resp.errors, errors);
        assert_eq!(resp.summary.items_failed, 1);
        assert_eq!(resp.message, "Processed 1 item(s) successfully");
    }

    #[test]
    fn nothing_processed_changes_the_message() {
        let errors = vec!["Item 1: Missing required fields".to_string()];
        let outcome = SaleOutcome::PartialFailure(
            report(receipt(vec![], errors)),
            vec![SaleLineError::MissingFields { index: 1 }],
        );
        let resp = SaleResponse::from_outcome(outcome);

        assert!(resp.success);
        assert_eq!(resp.message, "No items processed");
        assert_eq!(resp.summary.items_processed, 0);
    }

    #[test]
    fn rejection_is_the_only_unsuccessful_shape() {
        let resp = SaleResponse::from_outcome(SaleOutcome::Rejected(SaleRejection::MissingShopId));

        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Missing shop_id"));
        assert!(resp.receipt_id.is_none());

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("receipt_id").is_none());
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Missing shop_id");
    }

    #[test]
    fn fault_shape_soft_succeeds_with_a_warning() {
        let long_details = "x".repeat(300);
        let resp = SaleResponse::from_fault(&long_details);

        assert!(resp.success);
        assert!(resp.receipt_id.unwrap().starts_with("ERR_"));
        assert_eq!(
            resp.warning.as_deref(),
            Some("Sale may not have been fully processed. Please check stock manually.")
        );
        assert_eq!(resp.message, "Sale recorded with errors. Please verify stock.");
        assert_eq!(resp.error_details.unwrap().len(), 200);
        assert_eq!(resp.summary.items_failed, 1);
        assert!(resp.processed_items.is_empty());
    }

    // -------------------------------------------------------------------------
    // Introspection shapes
    // -------------------------------------------------------------------------

    fn snapshot_with_two_shops() -> Snapshot {
        let item_with_batches = CachedItem {
            id: "i1".to_string(),
            name: "Rice".to_string(),
            thumbnail: None,
            sell_price: 250.0,
            buy_price: 200.0,
            stock: 10.0,
            base_unit: "bag".to_string(),
            category_id: "c1".to_string(),
            category_name: "Grains".to_string(),
            batches: vec![
                Batch::new("b1", "Jan", 10.0, 250.0, 1_000),
                Batch::new("b2", "Feb", 5.0, 260.0, 2_000),
            ],
            selling_units: Vec::new(),
        };
        let mut item_without = item_with_batches.clone();
        item_without.id = "i2".to_string();
        item_without.batches.clear();

        Snapshot {
            shops: vec![
                CachedShop {
                    id: "s1".to_string(),
                    name: "Duka Moja".to_string(),
                    categories: vec![CachedCategory {
                        id: "c1".to_string(),
                        name: "Grains".to_string(),
                        items: vec![item_with_batches.clone(), item_without],
                    }],
                },
                CachedShop {
                    id: "s2".to_string(),
                    name: "Duka Mbili".to_string(),
                    categories: vec![CachedCategory {
                        id: "c2".to_string(),
                        name: "Drinks".to_string(),
                        items: vec![item_with_batches],
                    }],
                },
            ],
            built_at: Some(Utc::now()),
        }
    }

    #[test]
    fn cache_overview_breaks_totals_down_per_shop() {
        let snap = snapshot_with_two_shops();
        let last = RefreshStats {
            shops: 2,
            categories: 2,
            items: 3,
            selling_units: 0,
            batches: 4,
            quarantined: 1,
            elapsed_ms: 42,
            finished_at: Utc::now(),
        };

        let overview = CacheOverview::build(&snap, Some(&last));
        assert_eq!(overview.totals.shops, 2);
        assert_eq!(overview.totals.items, 3);
        assert_eq!(overview.totals.batches, 4);
        assert_eq!(overview.shops.len(), 2);
        assert_eq!(overview.shops[0].shop_name, "Duka Moja");
        assert_eq!(overview.shops[0].items, 2);
        assert_eq!(overview.shops[0].batches, 2);
        assert_eq!(overview.shops[1].items, 1);

        let refresh = overview.last_refresh.unwrap();
        assert_eq!(refresh.elapsed_ms, 42);
        assert_eq!(refresh.quarantined, 1);
    }

    #[test]
    fn cache_overview_before_first_refresh_has_no_summary() {
        let overview = CacheOverview::build(&Snapshot::empty(), None);
        assert!(overview.last_refresh.is_none());
        assert_eq!(overview.totals.shops, 0);

        let json = serde_json::to_value(&overview).unwrap();
        assert!(json.get("last_refresh").is_none());
    }

    #[test]
    fn batch_stats_round_coverage_to_one_decimal() {
        let report = BatchStatsReport::from_snapshot(&snapshot_with_two_shops());
        assert_eq!(report.total_batches, 4);
        assert_eq!(report.items_with_batches, 2);
        assert_eq!(report.items_without_batches, 1);
        assert_eq!(report.percentage_with_batches, 66.7);

        let empty = BatchStatsReport::from_snapshot(&Snapshot::empty());
        assert_eq!(empty.percentage_with_batches, 0.0);
    }

    #[test]
    fn status_summary_reports_null_before_first_refresh() {
        let store = std::sync::Arc::new(duka_store::memory::MemoryStore::new());
        let cache = CatalogCache::new(store);
        let status = StatusSummary::collect(&cache);

        assert!(!status.cache_loaded);
        assert_eq!(status.shops_cached, 0);
        assert!(status.last_cache_update.is_none());
        assert_eq!(status.service, "duka-engine");
        assert!(!status.version.is_empty());

        let json = serde_json::to_value(&status).unwrap();
        assert!(json["last_cache_update"].is_null());
    }
}
