//! # Allocation: Availability and FIFO Batch Consumption
//!
//! One place answers "how much can this batch actually sell?" for both
//! search and sale, so the two paths can never disagree.
//!
//! ## FIFO Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     FIFO Allocation Pipeline                            │
//! │                                                                         │
//! │   batches ──► sort by (timestamp, id) ──► oldest first                 │
//! │                                                                         │
//! │   ┌──────────┐   ┌──────────┐   ┌──────────┐                          │
//! │   │ January  │   │ February │   │  March   │   request: 12            │
//! │   │ 10 left  │──►│  5 left  │──►│  8 left  │                          │
//! │   │ take 10  │   │  take 2  │   │ untouched│                          │
//! │   └──────────┘   └──────────┘   └──────────┘                          │
//! │                                                                         │
//! │   draws: [(January, 10), (February, 2)]                                │
//! │   total: 10 × batch price + 2 × batch price                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Conversion Rule
//!
//! A batch holding 2 cartons with a conversion factor of 10 offers
//! `2 × 10 = 20` sticks. Availability **multiplies** by the conversion
//! factor; dividing here silently hides stock and was the root cause of
//! phantom "out of stock" results.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::{Batch, BatchLink};
use crate::types::UnitType;
use crate::{FULFILL_EPSILON, LOW_STOCK_BASE_THRESHOLD, LOW_STOCK_SELLING_THRESHOLD};

pub use crate::error::AllocationError;

// =============================================================================
// Reservation Hook
// =============================================================================

/// Source of quantities already promised elsewhere (e.g. open carts).
///
/// Availability subtracts the reserved amount before anything else. The
/// default implementation reserves nothing; a cart service can plug in
/// a real one without touching the math below.
pub trait ReservationSource: Send + Sync {
    /// Base units of `batch_id` on `item_id` that are spoken for.
    fn reserved_quantity(&self, item_id: &str, batch_id: &str) -> f64;
}

/// Reservation source that never reserves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReservations;

impl ReservationSource for NoReservations {
    fn reserved_quantity(&self, _item_id: &str, _batch_id: &str) -> f64 {
        0.0
    }
}

// =============================================================================
// Availability
// =============================================================================

/// What one batch can fulfil, in base units and in selling units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Availability {
    /// Base units left after reservations, clamped at zero.
    pub real_quantity: f64,
    /// `real_quantity × conversion_factor`; zero for base-unit queries.
    pub available_selling_units: f64,
    /// Base sales need at least one whole base unit.
    pub can_fulfill_base: bool,
    /// Selling units sell down to the last sliver of a batch.
    pub can_fulfill_selling_unit: bool,
    /// Less than one whole selling unit left.
    pub is_partial: bool,
}

impl Availability {
    /// Fulfilment answer for the unit type being sold.
    pub fn can_fulfill(&self, unit_type: UnitType) -> bool {
        match unit_type {
            UnitType::Base => self.can_fulfill_base,
            UnitType::SellingUnit => self.can_fulfill_selling_unit,
        }
    }
}

/// Computes what `batch` can fulfil for the given unit type.
///
/// ## Rules
/// - `real_quantity = max(0, remaining − reserved)`
/// - Selling units multiply: `available = real_quantity × conversion_factor`
/// - A base sale needs `real_quantity ≥ 1`; a fraction of a carton cannot
///   be sold as a carton
/// - A selling-unit sale goes through while `available > FULFILL_EPSILON`
///
/// ## Example
/// ```rust
/// use duka_core::allocation::availability;
/// use duka_core::catalog::Batch;
/// use duka_core::types::UnitType;
///
/// let batch = Batch::new("b1", "January", 2.0, 500.0, 1_000);
///
/// let a = availability(&batch, UnitType::SellingUnit, 10.0, 0.0);
/// assert_eq!(a.available_selling_units, 20.0);
/// assert!(a.can_fulfill_selling_unit);
/// ```
pub fn availability(
    batch: &Batch,
    unit_type: UnitType,
    conversion_factor: f64,
    reserved: f64,
) -> Availability {
    let real_quantity = (batch.remaining_quantity - reserved).max(0.0);

    if unit_type == UnitType::SellingUnit && conversion_factor > 0.0 {
        let units = real_quantity * conversion_factor;
        Availability {
            real_quantity,
            available_selling_units: units,
            can_fulfill_base: real_quantity >= 1.0,
            can_fulfill_selling_unit: units > FULFILL_EPSILON,
            is_partial: units < 1.0,
        }
    } else {
        Availability {
            real_quantity,
            available_selling_units: 0.0,
            can_fulfill_base: real_quantity >= 1.0,
            can_fulfill_selling_unit: false,
            is_partial: false,
        }
    }
}

// =============================================================================
// Batch Selection
// =============================================================================

/// One batch examined during selection, with its computed availability.
#[derive(Debug, Clone)]
pub struct BatchCandidate<'a> {
    pub batch: &'a Batch,
    pub availability: Availability,
    /// Fulfilment verdict for the unit type the caller is selling.
    pub can_fulfill: bool,
    /// True when this batch is the one the caller was already on.
    pub is_current: bool,
    /// True when no batch could fulfil and the oldest was chosen anyway.
    pub is_fallback: bool,
}

/// Outcome of [`select_batch`]: the batch to show plus the rest in FIFO order.
#[derive(Debug, Clone)]
pub struct BatchSelection<'a> {
    pub chosen: BatchCandidate<'a>,
    pub alternatives: Vec<BatchCandidate<'a>>,
}

impl<'a> BatchSelection<'a> {
    /// The next batch worth switching to, if any alternative can fulfil.
    pub fn next_available(&self) -> Option<&BatchCandidate<'a>> {
        self.alternatives.iter().find(|c| c.can_fulfill)
    }
}

/// Picks the batch a sale should draw from.
///
/// ## Rules
/// 1. Batches are ordered oldest-first by `(timestamp, id)`; the id
///    tie-break keeps same-millisecond intakes deterministic.
/// 2. A preferred batch that can fulfil wins outright (no surprise
///    switches mid-sale).
/// 3. Otherwise the oldest batch that can fulfil wins.
/// 4. If nothing can fulfil, the oldest batch is returned with
///    `is_fallback` set so the caller can still render it.
///
/// Returns `None` only when `batches` is empty.
pub fn select_batch<'a>(
    batches: &'a [Batch],
    unit_type: UnitType,
    conversion_factor: f64,
    preferred_batch_id: Option<&str>,
    reservations: &dyn ReservationSource,
    item_id: &str,
) -> Option<BatchSelection<'a>> {
    if batches.is_empty() {
        return None;
    }

    let mut sorted: Vec<&Batch> = batches.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut candidates: Vec<BatchCandidate<'a>> = sorted
        .into_iter()
        .map(|batch| {
            let reserved = reservations.reserved_quantity(item_id, &batch.id);
            let availability = availability(batch, unit_type, conversion_factor, reserved);
            BatchCandidate {
                can_fulfill: availability.can_fulfill(unit_type),
                is_current: preferred_batch_id == Some(batch.id.as_str()),
                is_fallback: false,
                availability,
                batch,
            }
        })
        .collect();

    let chosen_idx = match candidates.iter().position(|c| c.is_current && c.can_fulfill) {
        Some(idx) => idx,
        None => match candidates.iter().position(|c| c.can_fulfill) {
            Some(idx) => idx,
            None => {
                // Nothing can fulfil: show the oldest batch anyway.
                candidates[0].is_fallback = true;
                0
            }
        },
    };

    let chosen = candidates.remove(chosen_idx);
    Some(BatchSelection {
        chosen,
        alternatives: candidates,
    })
}

// =============================================================================
// Stock Notifications
// =============================================================================

/// How loudly a notification should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Machine-readable notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStockWarning,
    PartialStock,
    InsufficientForBase,
    OutOfStock,
    LimitedStock,
    NoBatchLink,
    NoBatches,
}

/// A stock condition worth telling the seller about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl StockNotification {
    fn new(kind: NotificationKind, message: impl Into<String>, severity: Severity) -> Self {
        StockNotification {
            kind,
            message: message.into(),
            severity,
            suggestion: None,
        }
    }

    /// Shown when a selling unit has no link and is rendered off a raw batch.
    pub fn no_batch_link() -> Self {
        StockNotification::new(
            NotificationKind::NoBatchLink,
            "No batch link configured",
            Severity::Warning,
        )
    }

    /// Shown when there is no batch at all to render.
    pub fn no_batches() -> Self {
        StockNotification::new(
            NotificationKind::NoBatches,
            "No stock batches available",
            Severity::Error,
        )
    }
}

/// Notifications for the batch a result will display.
///
/// ## Rules
/// - Base units: warn under [`LOW_STOCK_BASE_THRESHOLD`]; error when a
///   fraction of a base unit is left (suggests selling units instead).
/// - Selling units: warn under [`LOW_STOCK_SELLING_THRESHOLD`]; an info
///   note marks partial stock (< 1 unit); out-of-stock only when truly
///   nothing is left, otherwise "limited".
pub fn notifications(candidate: &BatchCandidate<'_>, unit_type: UnitType) -> Vec<StockNotification> {
    let mut out = Vec::new();
    let avail = &candidate.availability;
    let batch_name = &candidate.batch.name;

    match unit_type {
        UnitType::Base => {
            if avail.real_quantity > 0.0 && avail.real_quantity < LOW_STOCK_BASE_THRESHOLD {
                out.push(StockNotification::new(
                    NotificationKind::LowStockWarning,
                    format!(
                        "Only {:.1} base units left in '{}' batch",
                        avail.real_quantity, batch_name
                    ),
                    Severity::Warning,
                ));
            }
            if !candidate.can_fulfill {
                let mut note = StockNotification::new(
                    NotificationKind::InsufficientForBase,
                    "Not enough for base units (needs ≥1)",
                    Severity::Error,
                );
                note.suggestion = Some("Try selling units instead".to_string());
                out.push(note);
            }
        }
        UnitType::SellingUnit => {
            let units = avail.available_selling_units;
            if units > 0.0 {
                if units < LOW_STOCK_SELLING_THRESHOLD {
                    out.push(StockNotification::new(
                        NotificationKind::LowStockWarning,
                        format!("Only {:.1} selling units left in '{}' batch", units, batch_name),
                        Severity::Warning,
                    ));
                }
                if units < 1.0 {
                    out.push(StockNotification::new(
                        NotificationKind::PartialStock,
                        format!("Partial stock available ({:.2} units)", units),
                        Severity::Info,
                    ));
                }
            }
            if !candidate.can_fulfill {
                if units <= 0.0 {
                    out.push(StockNotification::new(
                        NotificationKind::OutOfStock,
                        "Out of stock for selling units",
                        Severity::Error,
                    ));
                } else {
                    out.push(StockNotification::new(
                        NotificationKind::LimitedStock,
                        "Limited stock available",
                        Severity::Warning,
                    ));
                }
            }
        }
    }

    out
}

// =============================================================================
// Base-Unit Allocation
// =============================================================================

/// One draw against a batch during allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDraw {
    pub batch_id: String,
    pub batch_name: String,
    /// Base units taken from this batch.
    pub quantity: f64,
    /// Unit sell price of the batch at draw time.
    pub price: f64,
    pub unit: String,
}

/// A fully satisfied allocation across one or more batches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    pub draws: Vec<BatchDraw>,
    /// Σ quantity × batch price across draws.
    pub total_price: f64,
}

impl Allocation {
    /// Base units drawn in total.
    pub fn total_quantity(&self) -> f64 {
        self.draws.iter().map(|d| d.quantity).sum()
    }
}

/// Allocates `requested` base units across `batches`, oldest first.
///
/// Either the whole request is satisfied or the allocation fails with
/// the satisfied amount and the shortfall; there are no partial
/// successes to reconcile.
///
/// ## Example
/// ```rust
/// use duka_core::allocation::allocate;
/// use duka_core::catalog::Batch;
///
/// let batches = vec![
///     Batch::new("b1", "January", 10.0, 50.0, 1_000),
///     Batch::new("b2", "February", 5.0, 55.0, 2_000),
/// ];
///
/// let allocation = allocate(&batches, 12.0).unwrap();
/// assert_eq!(allocation.total_quantity(), 12.0);
/// assert_eq!(allocation.total_price, 10.0 * 50.0 + 2.0 * 55.0);
/// ```
pub fn allocate(batches: &[Batch], requested: f64) -> Result<Allocation, AllocationError> {
    if batches.is_empty() {
        return Err(AllocationError::NoBatches);
    }

    let mut sorted: Vec<&Batch> = batches.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut draws = Vec::new();
    let mut remaining = requested;
    let mut total_price = 0.0;

    for batch in sorted {
        if remaining <= 0.0 {
            break;
        }
        let available = batch.remaining_quantity;
        if available <= 0.0 {
            continue;
        }

        let take = available.min(remaining);
        draws.push(BatchDraw {
            batch_id: batch.id.clone(),
            batch_name: batch.name.clone(),
            quantity: take,
            price: batch.sell_price,
            unit: batch.unit.clone(),
        });
        total_price += take * batch.sell_price;
        remaining -= take;
    }

    if remaining > 0.0 {
        return Err(AllocationError::InsufficientStock {
            requested,
            satisfied: requested - remaining,
            shortfall: remaining,
        });
    }

    Ok(Allocation { draws, total_price })
}

// =============================================================================
// Selling-Unit Allocation
// =============================================================================

/// One draw against a batch link during selling-unit allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDraw {
    pub batch_id: String,
    /// Selling units taken from this link.
    pub units_taken: f64,
    /// The same draw expressed in base units, for stock deduction.
    pub base_units_taken: f64,
    pub price_per_unit: f64,
    pub line_total: f64,
}

/// A satisfied selling-unit allocation across batch links.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitAllocation {
    pub draws: Vec<UnitDraw>,
    pub total_price: f64,
}

impl UnitAllocation {
    /// Selling units drawn in total.
    pub fn total_units(&self) -> f64 {
        self.draws.iter().map(|d| d.units_taken).sum()
    }

    /// Base units the stock ledger must lose for this allocation.
    pub fn total_base_units(&self) -> f64 {
        self.draws.iter().map(|d| d.base_units_taken).sum()
    }
}

/// Allocates `requested_units` selling units across `links`, oldest first.
///
/// Links are ordered by the linked batch's intake `(timestamp, id)`.
/// Each draw is also expressed in base units (`units ÷ conversion`) so
/// the caller can deduct parent stock; a non-positive conversion factor
/// falls back to 1:1 rather than dividing by zero.
pub fn allocate_selling_units(
    links: &[BatchLink],
    requested_units: f64,
    conversion_factor: f64,
) -> Result<UnitAllocation, AllocationError> {
    if links.is_empty() {
        return Err(AllocationError::NoBatchLinks);
    }

    let mut sorted: Vec<&BatchLink> = links.iter().collect();
    sorted.sort_by(|a, b| {
        a.batch_timestamp
            .cmp(&b.batch_timestamp)
            .then_with(|| a.batch_id.cmp(&b.batch_id))
    });

    let mut draws = Vec::new();
    let mut remaining = requested_units;
    let mut total_price = 0.0;

    for link in sorted {
        if remaining <= 0.0 {
            break;
        }
        let available = link.available_units();
        if available <= 0.0 {
            continue;
        }

        let take = available.min(remaining);
        let base_units = if conversion_factor > 0.0 {
            take / conversion_factor
        } else {
            take
        };

        draws.push(UnitDraw {
            batch_id: link.batch_id.clone(),
            units_taken: take,
            base_units_taken: base_units,
            price_per_unit: link.price_per_unit,
            line_total: take * link.price_per_unit,
        });
        total_price += take * link.price_per_unit;
        remaining -= take;
    }

    if remaining > 0.0 {
        return Err(AllocationError::InsufficientStock {
            requested: requested_units,
            satisfied: requested_units - remaining,
            shortfall: remaining,
        });
    }

    Ok(UnitAllocation { draws, total_price })
}

// =============================================================================
// Tests
// =============================================================================
