//! # Sale Processor
//!
//! Deducts sold quantities from item batches, appends stock transactions
//! and writes a receipt, all in one pass per sale request.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Sale Pipeline                                  │
//! │                                                                         │
//! │  validate ──► cap lines ──► lock items (sorted paths)                   │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │              per line: fetch-or-reuse doc ──► find batch                │
//! │                        check stock ──► deduct ──► price ──► ledger      │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │              one atomic commit ──► receipt ──► SaleOutcome              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failed lines never abort the sale: each problem is recorded and the
//! remaining lines are still processed, so the till always gets a
//! receipt-shaped answer. Item documents are staged in memory per call,
//! which lets two lines against the same item compound before the single
//! commit.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use ts_rs::TS;

use duka_core::types::{PaymentInfo, Receipt, ReceiptLine, SaleLine, Seller, StockTransaction};
use duka_store::backend::{DocumentStore, WriteBatch};
use duka_store::docs::ItemDoc;
use duka_store::paths::{ItemPath, ReceiptPath};

// =============================================================================
// Request
// =============================================================================

/// A sale as submitted by the till.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    #[serde(default)]
    pub shop_id: String,

    #[serde(default)]
    pub seller: Seller,

    /// Cart lines. Anything past the configured cap is dropped.
    #[serde(default, rename = "items")]
    pub lines: Vec<SaleLine>,

    #[serde(default)]
    pub payment: PaymentInfo,
}

// =============================================================================
// Errors
// =============================================================================

/// Why a request was turned away before any line was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaleRejection {
    #[error("Missing shop_id")]
    MissingShopId,
    #[error("No items in sale")]
    NoLines,
}

/// What went wrong with one line, or with the final commit.
///
/// Line indices are one-based to match what the till displays.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaleLineError {
    #[error("Item {index}: Missing required fields")]
    MissingFields { index: usize },

    #[error("Item {name} not found in database")]
    ItemNotFound { name: String },

    #[error("Batch {batch_id} not found for {name}")]
    BatchNotFound { batch_id: String, name: String },

    #[error("Insufficient stock for {name}: need {needed}, have {available}")]
    InsufficientStock {
        name: String,
        needed: f64,
        available: f64,
    },

    #[error("Item {index}: {message}")]
    Storage { index: usize, message: String },

    #[error("Database update failed: {0}")]
    CommitFailed(String),
}

// =============================================================================
// Outcome
// =============================================================================

/// Everything one processed sale produced.
#[derive(Debug, Clone)]
pub struct SaleReport {
    pub receipt: Receipt,
    /// False when nothing was processed or the receipt write failed.
    pub receipt_persisted: bool,
    /// Lines in the original request, before the cap.
    pub requested_lines: usize,
    /// Lines dropped by the cap.
    pub truncated_lines: usize,
}

/// Result of one [`SaleProcessor::complete`] call.
///
/// Never an `Err`: line problems are carried inside the outcome so the
/// till always gets a usable response.
#[derive(Debug, Clone)]
pub enum SaleOutcome {
    /// Every line deducted and committed.
    Completed(SaleReport),
    /// Some lines failed; the rest went through.
    PartialFailure(SaleReport, Vec<SaleLineError>),
    /// The request never reached processing.
    Rejected(SaleRejection),
}

impl SaleOutcome {
    pub fn report(&self) -> Option<&SaleReport> {
        match self {
            SaleOutcome::Completed(r) | SaleOutcome::PartialFailure(r, _) => Some(r),
            SaleOutcome::Rejected(_) => None,
        }
    }

    pub fn errors(&self) -> &[SaleLineError] {
        match self {
            SaleOutcome::PartialFailure(_, errors) => errors,
            _ => &[],
        }
    }
}

// =============================================================================
// Processor
// =============================================================================

/// Mutable working set for one `complete` call.
struct SalePass<'a> {
    shop_id: &'a str,
    seller: &'a Seller,
    now: DateTime<Utc>,
    /// Item documents read so far, keyed by path. Later lines against
    /// the same item see earlier deductions.
    staged: HashMap<ItemPath, ItemDoc>,
    /// Paths actually modified; only these are committed.
    dirty: BTreeSet<ItemPath>,
}

/// Processes sales against the document store.
///
/// ## Rules
/// - A request without a shop id or without lines is rejected whole.
/// - Items are locked in sorted path order for the duration of the
///   call, so overlapping carts serialize instead of deadlocking.
/// - All deductions go out in a single atomic commit; a commit failure
///   is reported as a line error, not a failed sale.
pub struct SaleProcessor {
    store: Arc<dyn DocumentStore>,
    /// One async lock per item path, created on first touch.
    item_locks: Mutex<HashMap<ItemPath, Arc<AsyncMutex<()>>>>,
    max_line_items: usize,
}

impl SaleProcessor {
    pub fn new(store: Arc<dyn DocumentStore>, max_line_items: usize) -> Self {
        SaleProcessor {
            store,
            item_locks: Mutex::new(HashMap::new()),
            max_line_items,
        }
    }

    /// Runs a sale end to end. Infallible by contract: every failure
    /// mode is folded into the returned [`SaleOutcome`].
    pub async fn complete(&self, request: SaleRequest) -> SaleOutcome {
        let started = Instant::now();

        let shop_id = request.shop_id.trim().to_string();
        if shop_id.is_empty() {
            warn!("Sale rejected: no shop id");
            return SaleOutcome::Rejected(SaleRejection::MissingShopId);
        }
        if request.lines.is_empty() {
            warn!(shop_id = %shop_id, "Sale rejected: empty cart");
            return SaleOutcome::Rejected(SaleRejection::NoLines);
        }

        let requested_lines = request.lines.len();
        let mut lines = request.lines;
        let truncated_lines = lines.len().saturating_sub(self.max_line_items);
        if truncated_lines > 0 {
            lines.truncate(self.max_line_items);
            warn!(
                kept = self.max_line_items,
                dropped = truncated_lines,
                "Sale request over the line cap; extra lines dropped"
            );
        }

        info!(
            shop_id = %shop_id,
            lines = lines.len(),
            seller = request.seller.name.as_deref().unwrap_or("unknown"),
            "Processing sale"
        );

        let mut paths: Vec<ItemPath> = lines
            .iter()
            .filter(|l| !l.item_id.is_empty() && !l.category_id.is_empty())
            .map(|l| ItemPath::new(&shop_id, &l.category_id, &l.item_id))
            .collect();
        paths.sort();
        paths.dedup();
        let _guards = self.acquire_item_locks(&paths).await;

        let mut pass = SalePass {
            shop_id: &shop_id,
            seller: &request.seller,
            now: Utc::now(),
            staged: HashMap::new(),
            dirty: BTreeSet::new(),
        };
        let mut processed: Vec<ReceiptLine> = Vec::new();
        let mut errors: Vec<SaleLineError> = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            match self.process_line(&mut pass, line, index).await {
                Ok(receipt_line) => processed.push(receipt_line),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Sale line failed");
                    errors.push(e);
                }
            }
        }

        // One atomic commit for everything the loop deducted.
        if !pass.dirty.is_empty() {
            let mut write = WriteBatch::new();
            for path in &pass.dirty {
                if let Some(doc) = pass.staged.get(path) {
                    write.update_item(path.clone(), doc.clone());
                }
            }
            match self.store.commit(write).await {
                Ok(()) => debug!(items = pass.dirty.len(), "Stock updates committed"),
                Err(e) => {
                    error!(error = %e, "Stock commit failed");
                    errors.push(SaleLineError::CommitFailed(e.to_string()));
                }
            }
        }

        let total_amount: f64 = processed.iter().map(|l| l.total_price).sum();
        let epoch_secs = pass.now.timestamp();
        let receipt = Receipt {
            id: Receipt::make_id(&shop_id, epoch_secs),
            shop_id: shop_id.clone(),
            seller: request.seller.clone(),
            items: processed,
            total_amount,
            payment_method: request.payment.method.clone(),
            payment_amount: request.payment.cash_amount.unwrap_or(total_amount),
            payment_notes: request.payment.notes.clone(),
            timestamp: pass.now,
            processing_time_ms: started.elapsed().as_millis() as u64,
            status: "completed".to_string(),
            errors: errors.iter().map(|e| e.to_string()).collect(),
        };

        let mut receipt_persisted = false;
        if !receipt.items.is_empty() {
            match self.store.put_receipt(&shop_id, &receipt).await {
                Ok(()) => {
                    receipt_persisted = true;
                    let doc = ReceiptPath::new(&shop_id, &receipt.id);
                    info!(doc = %doc, total = total_amount, "Receipt saved");
                }
                Err(e) => {
                    // The deductions already went through; a lost receipt
                    // is logged, not surfaced.
                    warn!(receipt_id = %receipt.id, error = %e, "Could not save receipt");
                }
            }
        }

        let report = SaleReport {
            receipt,
            receipt_persisted,
            requested_lines,
            truncated_lines,
        };

        if errors.is_empty() {
            info!(
                shop_id = %shop_id,
                items = report.receipt.items.len(),
                total = total_amount,
                "Sale completed"
            );
            SaleOutcome::Completed(report)
        } else {
            warn!(
                shop_id = %shop_id,
                items = report.receipt.items.len(),
                failed = errors.len(),
                "Sale completed with line errors"
            );
            SaleOutcome::PartialFailure(report, errors)
        }
    }

    /// Validates and applies one cart line against the staged documents.
    async fn process_line(
        &self,
        pass: &mut SalePass<'_>,
        line: &SaleLine,
        index: usize,
    ) -> Result<ReceiptLine, SaleLineError> {
        let display_index = index + 1;
        if line.item_id.is_empty()
            || line.category_id.is_empty()
            || line.batch_id.is_empty()
            || line.quantity <= 0.0
        {
            return Err(SaleLineError::MissingFields {
                index: display_index,
            });
        }

        let base_qty = line.base_quantity();
        let path = ItemPath::new(pass.shop_id, &line.category_id, &line.item_id);

        let doc = match pass.staged.entry(path.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match self.store.get_item(entry.key()).await {
                Ok(Some(doc)) => entry.insert(doc),
                Ok(None) => {
                    return Err(SaleLineError::ItemNotFound {
                        name: line.name.clone(),
                    });
                }
                Err(e) => {
                    return Err(SaleLineError::Storage {
                        index: display_index,
                        message: e.to_string(),
                    });
                }
            },
        };

        let Some(batch) = doc.find_batch_mut(&line.batch_id) else {
            return Err(SaleLineError::BatchNotFound {
                batch_id: line.batch_id.clone(),
                name: line.name.clone(),
            });
        };

        if batch.quantity < base_qty {
            return Err(SaleLineError::InsufficientStock {
                name: line.name.clone(),
                needed: base_qty,
                available: batch.quantity,
            });
        }

        batch.quantity -= base_qty;
        let remaining_batch = batch.quantity;
        let sell_price = batch.sell_price;

        doc.stock -= base_qty;
        let remaining_stock = doc.stock;

        let is_selling_unit = line.kind.is_selling_unit();
        let (unit_price, total_price) = if is_selling_unit && line.conversion_factor > 0.0 {
            let per_unit = sell_price / line.conversion_factor;
            (per_unit, per_unit * line.quantity)
        } else {
            (sell_price, sell_price * base_qty)
        };

        let transaction_id = StockTransaction::make_id(pass.now.timestamp_millis(), index);
        doc.stock_transactions.push(StockTransaction {
            id: transaction_id.clone(),
            kind: "sale".to_string(),
            item_type: line.kind,
            batch_id: line.batch_id.clone(),
            quantity: base_qty,
            selling_units_quantity: is_selling_unit.then_some(line.quantity),
            unit: if line.unit.is_empty() {
                "unit".to_string()
            } else {
                line.unit.clone()
            },
            sell_price,
            unit_price,
            total_price,
            timestamp: pass.now.timestamp() as f64,
            performed_by: pass.seller.clone(),
            conversion_factor: if is_selling_unit {
                line.conversion_factor
            } else {
                1.0
            },
        });
        doc.last_stock_update = Some(pass.now.timestamp_millis());
        doc.last_transaction_id = Some(transaction_id);
        pass.dirty.insert(path);

        debug!(
            item = %line.name,
            deducted = base_qty,
            remaining = remaining_batch,
            "Deducted stock for sale line"
        );

        Ok(ReceiptLine {
            item_id: line.item_id.clone(),
            item_name: line.name.clone(),
            item_type: line.kind,
            batch_id: line.batch_id.clone(),
            quantity_sold: line.quantity,
            base_units_deducted: base_qty,
            remaining_batch_quantity: remaining_batch,
            remaining_total_stock: remaining_stock,
            batch_exhausted: remaining_batch <= 0.0,
            total_price,
        })
    }

    /// Takes the per-item locks for `paths` (already sorted and deduped).
    async fn acquire_item_locks(&self, paths: &[ItemPath]) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(paths.len());
        for path in paths {
            let lock = {
                let mut map = self.item_locks.lock().expect("Item lock map poisoned");
                Arc::clone(
                    map.entry(path.clone())
                        .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
                )
            };
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::types::ResultKind;
    use duka_store::docs::BatchDoc;
    use duka_store::memory::MemoryStore;

    fn seed_store() -> (Arc<MemoryStore>, ItemPath) {
        let store = Arc::new(MemoryStore::new());
        store.put_shop("shop1", "Duka Moja");
        store.put_category("shop1", "c1", "Grains");
        let path = ItemPath::new("shop1", "c1", "rice");
        let mut doc = ItemDoc::named("Rice");
        doc.stock = 10.0;
        doc.sell_price = 250.0;
        doc.batches
            .push(BatchDoc::new("b1", "January", 10.0, 250.0, 1_000));
        store.put_item(&path, doc);
        (store, path)
    }

    fn line(item: &str, batch: &str, qty: f64) -> SaleLine {
        SaleLine {
            item_id: item.to_string(),
            category_id: "c1".to_string(),
            batch_id: batch.to_string(),
            quantity: qty,
            kind: ResultKind::MainItem,
            conversion_factor: 1.0,
            unit: "bag".to_string(),
            name: "Rice".to_string(),
        }
    }

    fn request(lines: Vec<SaleLine>) -> SaleRequest {
        SaleRequest {
            shop_id: "shop1".to_string(),
            seller: Seller {
                id: Some("u1".to_string()),
                name: Some("Amina".to_string()),
            },
            lines,
            payment: PaymentInfo::default(),
        }
    }

    fn completed(outcome: SaleOutcome) -> SaleReport {
        match outcome {
            SaleOutcome::Completed(report) => report,
            other => panic!("expected completed sale, got {:?}", other),
        }
    }

    fn partial(outcome: SaleOutcome) -> (SaleReport, Vec<SaleLineError>) {
        match outcome {
            SaleOutcome::PartialFailure(report, errors) => (report, errors),
            other => panic!("expected partial failure, got {:?}", other),
        }
    }

    // -------------------------------------------------------------------------
    // Request validation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn missing_shop_or_empty_cart_is_rejected() {
        let (store, _) = seed_store();
        let processor = SaleProcessor::new(store, 10);

        let out = processor
            .complete(SaleRequest {
                lines: vec![line("rice", "b1", 1.0)],
                ..SaleRequest::default()
            })
            .await;
        assert!(matches!(
            out,
            SaleOutcome::Rejected(SaleRejection::MissingShopId)
        ));
        assert_eq!(
            SaleRejection::MissingShopId.to_string(),
            "Missing shop_id"
        );

        let out = processor.complete(request(vec![])).await;
        assert!(matches!(out, SaleOutcome::Rejected(SaleRejection::NoLines)));
        assert_eq!(SaleRejection::NoLines.to_string(), "No items in sale");
    }

    // -------------------------------------------------------------------------
    // Happy path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn single_line_deducts_logs_and_writes_a_receipt() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);

        let report = completed(processor.complete(request(vec![line("rice", "b1", 4.0)])).await);

        assert_eq!(report.receipt.items.len(), 1);
        let sold = &report.receipt.items[0];
        assert_eq!(sold.quantity_sold, 4.0);
        assert_eq!(sold.base_units_deducted, 4.0);
        assert_eq!(sold.remaining_batch_quantity, 6.0);
        assert_eq!(sold.remaining_total_stock, 6.0);
        assert!(!sold.batch_exhausted);
        assert_eq!(sold.total_price, 1000.0);

        assert_eq!(report.receipt.total_amount, 1000.0);
        // Cash amount defaults to the sale total.
        assert_eq!(report.receipt.payment_amount, 1000.0);
        assert_eq!(report.receipt.status, "completed");
        assert!(report.receipt.errors.is_empty());
        assert!(report.receipt.id.starts_with("RCPT_"));
        assert!(report.receipt_persisted);

        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 6.0);
        assert_eq!(doc.stock, 6.0);
        assert_eq!(doc.stock_transactions.len(), 1);
        let txn = &doc.stock_transactions[0];
        assert_eq!(txn.kind, "sale");
        assert_eq!(txn.quantity, 4.0);
        assert_eq!(txn.unit_price, 250.0);
        assert_eq!(txn.total_price, 1000.0);
        assert!(txn.selling_units_quantity.is_none());
        assert_eq!(doc.last_transaction_id.as_deref(), Some(txn.id.as_str()));
        assert!(doc.last_stock_update.is_some());

        let receipts = store.receipts("shop1");
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].id, report.receipt.id);
    }

    #[tokio::test]
    async fn selling_unit_line_converts_quantity_and_price() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);

        // 30 sticks out of bags of 20: 1.5 base units at 250/20 each.
        let mut su_line = line("rice", "b1", 30.0);
        su_line.kind = ResultKind::SellingUnit;
        su_line.conversion_factor = 20.0;
        su_line.unit = "stick".to_string();
        su_line.name = "Stick".to_string();

        let report = completed(processor.complete(request(vec![su_line])).await);
        let sold = &report.receipt.items[0];

        assert_eq!(sold.quantity_sold, 30.0);
        assert_eq!(sold.base_units_deducted, 1.5);
        assert_eq!(sold.remaining_batch_quantity, 8.5);
        assert_eq!(sold.total_price, 375.0);

        let doc = store.get_item(&path).await.unwrap().unwrap();
        let txn = &doc.stock_transactions[0];
        assert_eq!(txn.quantity, 1.5);
        assert_eq!(txn.selling_units_quantity, Some(30.0));
        assert_eq!(txn.unit_price, 12.5);
        assert_eq!(txn.conversion_factor, 20.0);
        assert_eq!(txn.unit, "stick");
    }

    #[tokio::test]
    async fn two_lines_on_one_item_compound_before_commit() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);

        let report = completed(
            processor
                .complete(request(vec![
                    line("rice", "b1", 4.0),
                    line("rice", "b1", 5.0),
                ]))
                .await,
        );

        assert_eq!(report.receipt.items[0].remaining_batch_quantity, 6.0);
        assert_eq!(report.receipt.items[1].remaining_batch_quantity, 1.0);
        assert_eq!(report.receipt.total_amount, 2250.0);

        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 1.0);
        assert_eq!(doc.stock, 1.0);
        assert_eq!(doc.stock_transactions.len(), 2);
        // Distinct ledger ids within the same millisecond.
        assert_ne!(doc.stock_transactions[0].id, doc.stock_transactions[1].id);
    }

    #[tokio::test]
    async fn payment_details_flow_to_the_receipt() {
        let (store, _) = seed_store();
        let processor = SaleProcessor::new(store, 10);

        let mut req = request(vec![line("rice", "b1", 2.0)]);
        req.payment = PaymentInfo {
            method: "mpesa".to_string(),
            cash_amount: Some(2000.0),
            notes: "till 1234".to_string(),
        };

        let report = completed(processor.complete(req).await);
        assert_eq!(report.receipt.payment_method, "mpesa");
        assert_eq!(report.receipt.payment_amount, 2000.0);
        assert_eq!(report.receipt.payment_notes, "till 1234");
    }

    // -------------------------------------------------------------------------
    // Line failures
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn bad_lines_fail_individually_with_exact_messages() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);

        let mut missing_batch = line("rice", "", 1.0);
        missing_batch.name = "Rice".to_string();
        let mut ghost = line("ghost", "b1", 1.0);
        ghost.name = "Ghost".to_string();
        let wrong_batch = line("rice", "zz", 1.0);

        let (report, errors) = partial(
            processor
                .complete(request(vec![missing_batch, ghost, wrong_batch]))
                .await,
        );

        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages[0], "Item 1: Missing required fields");
        assert_eq!(messages[1], "Item Ghost not found in database");
        assert_eq!(messages[2], "Batch zz not found for Rice");

        assert!(report.receipt.items.is_empty());
        assert_eq!(report.receipt.errors, messages);
        // Nothing processed, so no receipt is written.
        assert!(!report.receipt_persisted);
        assert!(store.receipts("shop1").is_empty());

        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 10.0);
    }

    #[tokio::test]
    async fn insufficient_line_fails_but_the_rest_commit() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);

        let (report, errors) = partial(
            processor
                .complete(request(vec![
                    line("rice", "b1", 4.0),
                    line("rice", "b1", 100.0),
                ]))
                .await,
        );

        assert_eq!(errors.len(), 1);
        // The second line sees the first deduction already applied.
        assert_eq!(
            errors[0].to_string(),
            "Insufficient stock for Rice: need 100, have 6"
        );
        assert_eq!(report.receipt.items.len(), 1);
        assert!(report.receipt_persisted);

        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 6.0);
        assert_eq!(doc.stock_transactions.len(), 1);
    }

    #[tokio::test]
    async fn commit_failure_is_reported_but_never_fails_the_sale() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);
        store.fail_next_commit();

        let (report, errors) =
            partial(processor.complete(request(vec![line("rice", "b1", 4.0)])).await);

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .starts_with("Database update failed:"));
        // The receipt is still written, with the error embedded.
        assert!(report.receipt_persisted);
        assert_eq!(report.receipt.errors.len(), 1);
        assert_eq!(report.receipt.items.len(), 1);

        // The store keeps its pre-sale state.
        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 10.0);
        assert!(doc.stock_transactions.is_empty());
    }

    #[tokio::test]
    async fn lines_past_the_cap_are_dropped_silently() {
        let (store, path) = seed_store();
        let processor = SaleProcessor::new(store.clone(), 10);

        let lines: Vec<SaleLine> = (0..11).map(|_| line("rice", "b1", 0.5)).collect();
        let report = completed(processor.complete(request(lines)).await);

        assert_eq!(report.requested_lines, 11);
        assert_eq!(report.truncated_lines, 1);
        assert_eq!(report.receipt.items.len(), 10);

        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 5.0);
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_sales_on_one_item_serialize() {
        let (store, path) = seed_store();
        let processor = Arc::new(SaleProcessor::new(store.clone(), 10));

        let first = {
            let p = Arc::clone(&processor);
            tokio::spawn(async move { p.complete(request(vec![line("rice", "b1", 7.0)])).await })
        };
        let second = {
            let p = Arc::clone(&processor);
            tokio::spawn(async move { p.complete(request(vec![line("rice", "b1", 7.0)])).await })
        };

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let completed_count = outcomes
            .iter()
            .filter(|o| matches!(o, SaleOutcome::Completed(_)))
            .count();
        assert_eq!(completed_count, 1);

        let failed = outcomes
            .iter()
            .find(|o| matches!(o, SaleOutcome::PartialFailure(..)))
            .unwrap();
        assert!(matches!(
            failed.errors()[0],
            SaleLineError::InsufficientStock { .. }
        ));

        // 10 − 7 = 3 left; only one sale got through.
        let doc = store.get_item(&path).await.unwrap().unwrap();
        assert_eq!(doc.batches[0].quantity, 3.0);
        assert_eq!(doc.stock_transactions.len(), 1);
    }
}
