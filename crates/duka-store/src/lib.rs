//! # duka-store: Document Store for Duka POS
//!
//! The persistence layer behind the catalog: a hierarchical document
//! store of shops, categories, items and selling units, addressed by
//! logical paths and observed through collection-group change channels.
//!
//! ## Document Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Document Hierarchy                               │
//! │                                                                         │
//! │  Shops/{shopId}                                    ShopDoc              │
//! │    ├── categories/{categoryId}                     CategoryDoc          │
//! │    │     └── items/{itemId}                        ItemDoc              │
//! │    │           │     • batches[] (embedded)        BatchDoc             │
//! │    │           │     • stockTransactions[]                              │
//! │    │           └── sellUnits/{sellUnitId}          SellUnitDoc          │
//! │    │                       • batchLinks[]                               │
//! │    └── receipts/{receiptId}                        Receipt              │
//! │                                                                         │
//! │  Collection groups: "items" and "sellUnits" fan out change events      │
//! │  across every shop and category, feeding the catalog refresher.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`backend`] - The `DocumentStore` contract, write batches, change events
//! - [`docs`] - Typed camelCase wire documents and validation into core types
//! - [`paths`] - Logical document paths (`Shops/{s}/categories/{c}/items/{i}`)
//! - [`memory`] - In-memory reference backend with seeding helpers
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust
//! use duka_store::{DocumentStore, ItemDoc, ItemPath, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new();
//! store.put_shop("shop1", "Mama Njeri's Duka");
//!
//! let path = ItemPath::new("shop1", "cat1", "item1");
//! store.put_item(&path, ItemDoc::named("Basmati Rice"));
//!
//! let item = store.get_item(&path).await.unwrap();
//! assert_eq!(item.unwrap().name, "Basmati Rice");
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod docs;
pub mod error;
pub mod memory;
pub mod paths;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{ChangeEvent, ChangeKind, CollectionGroup, DocumentStore, WriteBatch};
pub use docs::{BatchDoc, CategoryDoc, ItemDoc, SellUnitDoc, ShopDoc};
pub use error::{DocValidationError, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use paths::{ItemPath, ReceiptPath, SellUnitPath};
