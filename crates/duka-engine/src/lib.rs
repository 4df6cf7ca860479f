//! # duka-engine: Catalog Cache, Search and Sales for Duka POS
//!
//! The operational layer between the document store and the till: an
//! in-memory catalog snapshot kept fresh by a change-feed watcher, a
//! stock-aware search over that snapshot, and a sale processor that
//! deducts batches oldest-first and writes receipts.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             Engine Layout                               │
//! │                                                                         │
//! │  DocumentStore ──► CatalogRefresher ──► CatalogCache ──► Snapshot       │
//! │   (documents)      (watch + coalesce)   (atomic swap)     (Arc)         │
//! │       ▲                                                     │           │
//! │       │                  SearchEngine ◄─────────────────────┤           │
//! │       │                  (score, pick batch, rank)          │           │
//! │       │                                                     ▼           │
//! │       └── WriteBatch ◄── SaleProcessor ◄─────────────── till requests   │
//! │                          (FIFO deduction, receipts)                     │
//! │                                                                         │
//! │  SalesService: facade wiring lifecycle, search, sales and reports       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Snapshot cache: full rebuild from the store, atomic swap
//! - [`refresher`] - Background watcher turning change feeds into rebuilds
//! - [`search`] - Scoring, batch-aware ranking and result shaping
//! - [`sale`] - FIFO stock deduction, receipts, per-item serialization
//! - [`response`] - Wire-facing sale responses and operator reports
//! - [`service`] - [`SalesService`] facade over the whole engine
//! - [`config`] - TOML service configuration
//! - [`error`] - Engine error types
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use duka_engine::{SalesService, ServiceConfig};
//! use duka_store::{BatchDoc, ItemDoc, ItemPath, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! store.put_shop("shop1", "Mama Njeri's Duka");
//! store.put_category("shop1", "cat1", "Grains");
//!
//! let mut doc = ItemDoc::named("Basmati Rice");
//! doc.stock = 10.0;
//! doc.sell_price = 250.0;
//! doc.batches
//!     .push(BatchDoc::new("b1", "Fresh stock", 10.0, 250.0, 1_000));
//! store.put_item(&ItemPath::new("shop1", "cat1", "rice"), doc);
//!
//! let service = SalesService::new(store, ServiceConfig::default());
//! service.start().await.unwrap();
//!
//! let found = service.search("shop1", "rice");
//! assert_eq!(found.items.len(), 1);
//!
//! service.shutdown().await.unwrap();
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod error;
pub mod refresher;
pub mod response;
pub mod sale;
pub mod search;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::{CatalogCache, RefreshStats};
pub use config::{CacheSettings, SaleSettings, ServiceConfig};
pub use error::{EngineError, EngineResult};
pub use refresher::{CatalogRefresher, RefresherHandle};
pub use response::{BatchStatsReport, CacheOverview, SaleResponse, StatusSummary};
pub use sale::{SaleOutcome, SaleProcessor, SaleReport, SaleRequest};
pub use search::{SearchEngine, SearchResponse, SearchResult, SearchStats};
pub use service::SalesService;
