//! # Domain Types
//!
//! Shared records for the sale path: cart lines, payments, the append-only
//! stock transaction log, and receipts.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    SaleLine     │   │ StockTransaction│   │    Receipt      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  item_id        │   │  id (sale_...)  │   │  id (RCPT_...)  │       │
//! │  │  batch_id       │   │  batch id       │   │  lines + errors │       │
//! │  │  quantity       │   │  qty deducted   │   │  total_amount   │       │
//! │  │  kind           │   │  prices         │   │  payment        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    UnitType     │   │   ResultKind    │                             │
//! │  │  base           │   │  main_item      │                             │
//! │  │  selling_unit   │   │  selling_unit   │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `StockTransaction` is appended to its item's transaction log and never
//! mutated afterwards; a `Receipt` is written once per sale call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Unit Kinds
// =============================================================================

/// Which unit a quantity is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// The item's base unit (what batches are counted in).
    Base,
    /// An alternate selling unit, related by a conversion factor.
    SellingUnit,
}

/// What kind of catalog entry a result or cart line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// The item itself, sold in base units.
    MainItem,
    /// One of the item's selling units.
    SellingUnit,
}

impl ResultKind {
    #[inline]
    pub fn is_selling_unit(&self) -> bool {
        matches!(self, ResultKind::SellingUnit)
    }

    /// The unit the quantity is denominated in for this kind.
    #[inline]
    pub fn unit_type(&self) -> UnitType {
        match self {
            ResultKind::MainItem => UnitType::Base,
            ResultKind::SellingUnit => UnitType::SellingUnit,
        }
    }
}

impl Default for ResultKind {
    fn default() -> Self {
        ResultKind::MainItem
    }
}

// =============================================================================
// Seller
// =============================================================================

/// Who performed a sale. Recorded on transactions and receipts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Seller {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Payment
// =============================================================================

/// Payment details attached to a sale request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInfo {
    /// Payment method label ("cash", "mpesa", ...).
    #[serde(default = "default_payment_method")]
    pub method: String,

    /// Cash tendered. When absent, the receipt records the sale total.
    #[serde(default)]
    pub cash_amount: Option<f64>,

    /// Free-form note from the cashier.
    #[serde(default)]
    pub notes: String,
}

fn default_payment_method() -> String {
    "cash".to_string()
}

impl Default for PaymentInfo {
    fn default() -> Self {
        PaymentInfo {
            method: default_payment_method(),
            cash_amount: None,
            notes: String::new(),
        }
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One requested line of a sale, as sent by the till.
///
/// `quantity` is denominated in the line's own unit: base units for
/// `main_item` lines, selling units for `selling_unit` lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    #[serde(default)]
    pub item_id: String,

    #[serde(default)]
    pub category_id: String,

    /// The batch the till resolved this line against.
    #[serde(default)]
    pub batch_id: String,

    #[serde(default)]
    pub quantity: f64,

    #[serde(rename = "type", default)]
    pub kind: ResultKind,

    /// Selling units per base unit. Ignored for main-item lines.
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,

    /// Unit label for the transaction log.
    #[serde(default)]
    pub unit: String,

    /// Display name, used in error messages when the item is unreadable.
    #[serde(default = "default_line_name")]
    pub name: String,
}

fn default_conversion_factor() -> f64 {
    1.0
}

fn default_line_name() -> String {
    "Unknown Item".to_string()
}

impl SaleLine {
    /// The base-unit quantity this line deducts from its batch.
    ///
    /// Selling-unit lines divide by the conversion factor; a non-positive
    /// factor falls back to the raw quantity rather than dividing by zero.
    pub fn base_quantity(&self) -> f64 {
        if self.kind.is_selling_unit() && self.conversion_factor > 0.0 {
            self.quantity / self.conversion_factor
        } else {
            self.quantity
        }
    }
}

// =============================================================================
// Stock Transaction
// =============================================================================

/// Append-only ledger entry recorded on the item for every deduction.
///
/// Field names follow the stored wire format, which mixes cases; keep the
/// renames in sync with what the dashboards already read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockTransaction {
    pub id: String,

    /// Always "sale" for entries written by the sale processor.
    #[serde(rename = "type")]
    pub kind: String,

    pub item_type: ResultKind,

    #[serde(rename = "batchId")]
    pub batch_id: String,

    /// Base units deducted from the batch.
    pub quantity: f64,

    /// Selling units sold, when the line was a selling-unit line.
    #[serde(default)]
    pub selling_units_quantity: Option<f64>,

    pub unit: String,

    #[serde(rename = "sellPrice")]
    pub sell_price: f64,

    #[serde(rename = "unitPrice")]
    pub unit_price: f64,

    #[serde(rename = "totalPrice")]
    pub total_price: f64,

    /// Epoch seconds at deduction time.
    pub timestamp: f64,

    #[serde(rename = "performedBy")]
    pub performed_by: Seller,

    pub conversion_factor: f64,
}

impl StockTransaction {
    /// Ledger id: `sale_{epochMillis}_{lineIndex}`.
    pub fn make_id(epoch_millis: i64, line_index: usize) -> String {
        format!("sale_{}_{}", epoch_millis, line_index)
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Summary of one successfully processed sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLine {
    pub item_id: String,
    pub item_name: String,
    pub item_type: ResultKind,
    pub batch_id: String,
    /// Quantity in the line's own unit.
    pub quantity_sold: f64,
    pub base_units_deducted: f64,
    pub remaining_batch_quantity: f64,
    pub remaining_total_stock: f64,
    pub batch_exhausted: bool,
    pub total_price: f64,
}

/// The durable record of a completed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    /// `RCPT_{epochSeconds}_{shopPrefix}`.
    pub id: String,
    pub shop_id: String,
    pub seller: Seller,
    pub items: Vec<ReceiptLine>,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_amount: f64,
    pub payment_notes: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    /// "completed" for every receipt the processor writes.
    pub status: String,
    /// Per-line error messages; empty when every line went through.
    pub errors: Vec<String>,
}

impl Receipt {
    /// Receipt id: `RCPT_{epochSeconds}_{first 4 chars of shopId}`.
    pub fn make_id(shop_id: &str, epoch_secs: i64) -> String {
        let prefix: String = shop_id.chars().take(4).collect();
        format!("RCPT_{}_{}", epoch_secs, prefix)
    }

    /// Placeholder id used when a sale fails before a receipt exists.
    pub fn error_id(epoch_secs: i64) -> String {
        format!("ERR_{}", epoch_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_line_defaults_from_minimal_json() {
        let line: SaleLine = serde_json::from_str(
            r#"{"item_id": "i1", "category_id": "c1", "batch_id": "b1", "quantity": 2}"#,
        )
        .unwrap();
        assert_eq!(line.kind, ResultKind::MainItem);
        assert_eq!(line.conversion_factor, 1.0);
        assert_eq!(line.name, "Unknown Item");
        assert_eq!(line.base_quantity(), 2.0);
    }

    #[test]
    fn test_selling_unit_line_base_quantity() {
        let line = SaleLine {
            item_id: "i1".to_string(),
            category_id: "c1".to_string(),
            batch_id: "b1".to_string(),
            quantity: 25.0,
            kind: ResultKind::SellingUnit,
            conversion_factor: 10.0,
            unit: "stick".to_string(),
            name: "Single Stick".to_string(),
        };
        assert_eq!(line.base_quantity(), 2.5);

        // Non-positive factor falls back to the raw quantity
        let broken = SaleLine {
            conversion_factor: 0.0,
            ..line
        };
        assert_eq!(broken.base_quantity(), 25.0);
    }

    #[test]
    fn test_result_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ResultKind::MainItem).unwrap(),
            r#""main_item""#
        );
        assert_eq!(
            serde_json::to_string(&ResultKind::SellingUnit).unwrap(),
            r#""selling_unit""#
        );
        assert_eq!(
            serde_json::to_string(&UnitType::Base).unwrap(),
            r#""base""#
        );
    }

    #[test]
    fn test_stock_transaction_wire_names() {
        let txn = StockTransaction {
            id: StockTransaction::make_id(1_700_000_000_000, 0),
            kind: "sale".to_string(),
            item_type: ResultKind::MainItem,
            batch_id: "b1".to_string(),
            quantity: 2.0,
            selling_units_quantity: None,
            unit: "pcs".to_string(),
            sell_price: 50.0,
            unit_price: 50.0,
            total_price: 100.0,
            timestamp: 1_700_000_000.0,
            performed_by: Seller::default(),
            conversion_factor: 1.0,
        };
        assert_eq!(txn.id, "sale_1700000000000_0");

        let json = serde_json::to_value(&txn).unwrap();
        assert!(json.get("batchId").is_some());
        assert!(json.get("sellPrice").is_some());
        assert!(json.get("unitPrice").is_some());
        assert!(json.get("totalPrice").is_some());
        assert!(json.get("performedBy").is_some());
        assert_eq!(json["type"], "sale");
        assert_eq!(json["item_type"], "main_item");
    }

    #[test]
    fn test_receipt_id_formats() {
        assert_eq!(
            Receipt::make_id("shop_abc123", 1_700_000_000),
            "RCPT_1700000000_shop"
        );
        // Short shop ids keep whatever is there
        assert_eq!(Receipt::make_id("s1", 1_700_000_000), "RCPT_1700000000_s1");
        assert_eq!(Receipt::error_id(1_700_000_000), "ERR_1700000000");
    }

    #[test]
    fn test_payment_defaults() {
        let payment: PaymentInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(payment.method, "cash");
        assert!(payment.cash_amount.is_none());
        assert!(payment.notes.is_empty());
    }
}
