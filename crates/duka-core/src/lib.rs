//! # duka-core: Pure Business Logic for Duka POS
//!
//! This crate is the **heart** of Duka POS. It contains all inventory and
//! point-of-sale business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Duka POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Transport (HTTP / IPC / gRPC)                   │   │
//! │  │        search, complete sale, cache introspection              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                duka-engine (Service Layer)                      │   │
//! │  │     CatalogCache ── SearchEngine ── SaleProcessor              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ duka-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  catalog  │  │allocation │  │  scoring  │  │   types   │  │   │
//! │  │   │ Snapshot  │  │   FIFO    │  │  ladder   │  │  Receipt  │  │   │
//! │  │   │   Item    │  │ batches   │  │  ranking  │  │  SaleLine │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 duka-store (Document Store)                     │   │
//! │  │        Shop → Category → Item → Batches / SellingUnits         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Materialized catalog model (Shop, Item, Batch, SellingUnit)
//! - [`allocation`] - FIFO availability and batch allocation
//! - [`scoring`] - Search scoring ladder, ranking order, batch status
//! - [`types`] - Shared domain records (Receipt, Transaction, sale lines)
//! - [`error`] - Domain error types
//! - [`validation`] - Request field validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **One Definition of Available**: search and sale both ask this crate
//!    what a batch can fulfill, so they can never disagree
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use duka_core::allocation::{allocate, AllocationError};
//! use duka_core::catalog::Batch;
//!
//! let batches = vec![
//!     Batch::new("b1", "January", 10.0, 50.0, 1_000),
//!     Batch::new("b2", "February", 5.0, 55.0, 2_000),
//! ];
//!
//! // 12 units: drains the January batch, then takes 2 from February
//! let allocation = allocate(&batches, 12.0).unwrap();
//! assert_eq!(allocation.draws.len(), 2);
//! assert_eq!(allocation.total_price, 10.0 * 50.0 + 2.0 * 55.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod catalog;
pub mod error;
pub mod scoring;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use duka_core::Snapshot` instead of
// `use duka_core::catalog::Snapshot`

pub use allocation::{
    allocate, allocate_selling_units, availability, notifications, select_batch, Allocation,
    AllocationError, Availability, BatchSelection, NoReservations, ReservationSource,
    StockNotification,
};
pub use catalog::{Batch, BatchLink, CachedCategory, CachedItem, CachedShop, SellingUnit, Snapshot};
pub use error::{CoreError, CoreResult, ValidationError};
pub use scoring::{
    compare_ranked, main_item_status, score, selling_unit_score, selling_unit_status, BatchStatus,
    MatchSource, RankKey,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum line items processed per sale call.
///
/// ## Why a constant?
/// Lines beyond the cap are dropped, not rejected, so one runaway cart cannot
/// stage an unbounded multi-document commit. The engine exposes this as a
/// config knob; this is the default it starts from.
pub const DEFAULT_MAX_SALE_ITEMS: usize = 10;

/// Base-unit quantity below which a batch counts as low stock.
pub const LOW_STOCK_BASE_THRESHOLD: f64 = 5.0;

/// Selling-unit quantity below which a batch counts as low stock.
pub const LOW_STOCK_SELLING_THRESHOLD: f64 = 3.0;

/// Tolerance for "has any sellable quantity" comparisons.
///
/// ## Why an epsilon?
/// Selling-unit availability is `remaining × conversionFactor` on f64 stock
/// figures; a batch drained by fractional sales can land at 1e-15 instead of
/// exactly zero.
pub const FULFILL_EPSILON: f64 = 1e-6;
