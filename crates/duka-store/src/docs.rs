//! # Wire Documents
//!
//! Typed shapes of the documents as they live in the store, camelCase on
//! the wire. Reads validate here, at the boundary: a document that fails
//! conversion into core catalog types is quarantined by the cache
//! builder instead of poisoning the snapshot or defaulting silently.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   Store (camelCase JSON)              Core (snapshot types)            │
//! │                                                                         │
//! │   ItemDoc  {sellPrice, baseUnit,      CachedItem {sell_price,          │
//! │             batches[], ...}     ───►              base_unit,            │
//! │                                  ▲                batches[], ...}       │
//! │   SellUnitDoc {conversionFactor, │    SellingUnit {conversion_factor,   │
//! │                batchLinks[]}    ─┘                 total_units, ...}    │
//! │                                                                         │
//! │   validate() fails ──► DocValidationError ──► quarantined (skip+count) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use duka_core::catalog::{effective_stock, Batch, BatchLink, CachedItem, SellingUnit};
use duka_core::types::StockTransaction;

use crate::error::DocValidationError;

fn default_unit() -> String {
    "unit".to_string()
}

fn default_batch_name() -> String {
    "Batch".to_string()
}

fn default_conversion() -> f64 {
    1.0
}

// =============================================================================
// Shop / Category
// =============================================================================

/// Root shop document. Only the display name matters to this service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDoc {
    #[serde(default)]
    pub name: String,
}

/// Category document under a shop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDoc {
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Item
// =============================================================================

/// Item document, batches embedded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDoc {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sell_price: f64,
    #[serde(default)]
    pub buy_price: f64,
    /// Stored stock figure; superseded by the batch total when batches exist.
    #[serde(default)]
    pub stock: f64,
    #[serde(default = "default_unit")]
    pub base_unit: String,
    #[serde(default)]
    pub batches: Vec<BatchDoc>,
    /// Append-only ledger of stock movements, newest last.
    #[serde(default)]
    pub stock_transactions: Vec<StockTransaction>,
    /// Epoch milliseconds of the last stock write, set by the sale path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_stock_update: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction_id: Option<String>,
}

impl ItemDoc {
    /// An item with just a name; everything else defaulted.
    pub fn named(name: impl Into<String>) -> Self {
        ItemDoc {
            name: name.into(),
            base_unit: default_unit(),
            ..ItemDoc::default()
        }
    }

    /// Mutable handle to the embedded batch with `batch_id`.
    pub fn find_batch_mut(&mut self, batch_id: &str) -> Option<&mut BatchDoc> {
        self.batches.iter_mut().find(|b| b.id == batch_id)
    }

    /// Checks the document can be represented in the catalog.
    ///
    /// ## Rules
    /// - Name must be non-empty
    /// - Every batch needs an id, a finite non-negative quantity and
    ///   finite prices
    pub fn validate(&self) -> Result<(), DocValidationError> {
        if self.name.trim().is_empty() {
            return Err(DocValidationError::EmptyName);
        }
        for (index, batch) in self.batches.iter().enumerate() {
            if batch.id.trim().is_empty() {
                return Err(DocValidationError::BatchMissingId { index });
            }
            if !batch.quantity.is_finite() || batch.quantity < 0.0 {
                return Err(DocValidationError::InvalidQuantity {
                    batch_id: batch.id.clone(),
                });
            }
            if !batch.sell_price.is_finite() || !batch.buy_price.is_finite() {
                return Err(DocValidationError::InvalidPrice {
                    batch_id: batch.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Converts into a snapshot item (selling units attached separately).
    ///
    /// Stock becomes the batch total when any batch holds stock,
    /// otherwise the stored figure stands.
    pub fn to_cached_item(
        &self,
        item_id: &str,
        category_id: &str,
        category_name: &str,
    ) -> Result<CachedItem, DocValidationError> {
        self.validate()?;

        let batches: Vec<Batch> = self.batches.iter().map(BatchDoc::to_batch).collect();
        let stock = effective_stock(&batches, self.stock);

        Ok(CachedItem {
            id: item_id.to_string(),
            name: self.name.clone(),
            thumbnail: self.images.first().cloned(),
            sell_price: self.sell_price,
            buy_price: self.buy_price,
            stock,
            base_unit: self.base_unit.clone(),
            category_id: category_id.to_string(),
            category_name: category_name.to_string(),
            batches,
            selling_units: Vec::new(),
        })
    }
}

// =============================================================================
// Batch
// =============================================================================

/// One batch embedded in an item document.
///
/// `quantity` is the remaining sellable amount; sales deduct from it in
/// place. The intake amount is not kept on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDoc {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_batch_name")]
    pub batch_name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub buy_price: f64,
    #[serde(default)]
    pub sell_price: f64,
    /// Intake time, epoch milliseconds. Drives FIFO order.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub added_by: String,
    #[serde(default)]
    pub selling_unit_allocations: HashMap<String, f64>,
}

impl BatchDoc {
    /// A batch with the fields that matter for allocation and seeding.
    pub fn new(
        id: impl Into<String>,
        batch_name: impl Into<String>,
        quantity: f64,
        sell_price: f64,
        timestamp: i64,
    ) -> Self {
        BatchDoc {
            id: id.into(),
            batch_name: batch_name.into(),
            quantity,
            unit: default_unit(),
            sell_price,
            timestamp,
            ..BatchDoc::default()
        }
    }

    /// Snapshot form of this batch. Remaining quantity mirrors the wire
    /// quantity; the snapshot never mutates it.
    pub fn to_batch(&self) -> Batch {
        Batch {
            id: self.id.clone(),
            name: self.batch_name.clone(),
            quantity: self.quantity,
            remaining_quantity: self.quantity,
            unit: self.unit.clone(),
            buy_price: self.buy_price,
            sell_price: self.sell_price,
            timestamp: self.timestamp,
            date: self.date.clone(),
            added_by: self.added_by.clone(),
            selling_unit_allocations: self.selling_unit_allocations.clone(),
        }
    }
}

// =============================================================================
// Selling Unit
// =============================================================================

/// Selling-unit document under an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellUnitDoc {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_conversion")]
    pub conversion_factor: f64,
    #[serde(default)]
    pub sell_price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_base_unit: bool,
    #[serde(default)]
    pub batch_links: Vec<BatchLink>,
}

impl Default for SellUnitDoc {
    fn default() -> Self {
        SellUnitDoc {
            name: String::new(),
            conversion_factor: default_conversion(),
            sell_price: 0.0,
            images: Vec::new(),
            is_base_unit: false,
            batch_links: Vec::new(),
        }
    }
}

impl SellUnitDoc {
    pub fn new(name: impl Into<String>, conversion_factor: f64, sell_price: f64) -> Self {
        SellUnitDoc {
            name: name.into(),
            conversion_factor,
            sell_price,
            ..SellUnitDoc::default()
        }
    }

    /// Checks the document can be represented in the catalog.
    ///
    /// A non-positive conversion factor is allowed through (the search
    /// path skips such units), but it must at least be a finite number.
    pub fn validate(&self) -> Result<(), DocValidationError> {
        if self.name.trim().is_empty() {
            return Err(DocValidationError::EmptyName);
        }
        if !self.conversion_factor.is_finite() {
            return Err(DocValidationError::InvalidConversionFactor);
        }
        for link in &self.batch_links {
            if !link.max_units_available.is_finite()
                || !link.allocated_units.is_finite()
                || !link.price_per_unit.is_finite()
            {
                return Err(DocValidationError::InvalidLink {
                    batch_id: link.batch_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Converts into a snapshot selling unit with link totals precomputed.
    pub fn to_selling_unit(&self, sell_unit_id: &str) -> Result<SellingUnit, DocValidationError> {
        self.validate()?;

        let mut unit = SellingUnit {
            id: sell_unit_id.to_string(),
            name: self.name.clone(),
            conversion_factor: self.conversion_factor,
            sell_price: self.sell_price,
            images: self.images.clone(),
            is_base_unit: self.is_base_unit,
            thumbnail: self.images.first().cloned(),
            batch_links: self.batch_links.clone(),
            total_units_available: 0.0,
            has_batch_links: false,
        };
        unit.recompute_link_totals();
        Ok(unit)
    }
}

// =============================================================================
// Tests
// =============================================================================
