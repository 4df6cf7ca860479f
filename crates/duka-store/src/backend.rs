//! # Document Store Contract
//!
//! The async trait the engine talks to. Backends expose the shop
//! hierarchy as listable collections, point reads of item documents,
//! atomic write batches and collection-group change feeds.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  list_shops ─┬─ list_categories ─┬─ list_items ─┬─ list_sell_units │
//! │              │                   │              │                 │
//! │              ▼                   ▼              ▼                 │
//! │          (id, ShopDoc)   (id, CategoryDoc)  (id, ItemDoc)         │
//! │                                                                   │
//! │  get_item / commit(WriteBatch)        ── read-modify-write path   │
//! │  watch(group) ──► mpsc::Receiver<ChangeEvent>  ── refresh trigger │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Contract notes:
//! - Listing under a missing parent yields an empty `Vec`, not an error.
//! - `commit` is all-or-nothing: if any targeted item is missing, no
//!   update in the batch is applied.
//! - Watch channels are bounded; a backend drops events for receivers
//!   that have fallen behind rather than blocking writers.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use duka_core::types::Receipt;

use crate::docs::{CategoryDoc, ItemDoc, SellUnitDoc, ShopDoc};
use crate::error::StoreResult;
use crate::paths::ItemPath;

// =============================================================================
// Change feed
// =============================================================================

/// Collection groups observable across the whole shop tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionGroup {
    /// Item documents, any shop, any category.
    Items,
    /// Selling-unit documents under any item.
    SellUnits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// One observed document change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub group: CollectionGroup,
    pub kind: ChangeKind,
    /// Item the change happened at (or under, for selling units).
    pub item: ItemPath,
    /// Id of the changed document within its collection.
    pub doc_id: String,
}

// =============================================================================
// Write batch
// =============================================================================

/// Item updates buffered for one atomic commit.
///
/// Order is preserved; a later update to the same path wins.
#[derive(Debug, Default)]
pub struct WriteBatch {
    updates: Vec<(ItemPath, ItemDoc)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Stages a full-document replacement of the item at `path`.
    pub fn update_item(&mut self, path: ItemPath, doc: ItemDoc) {
        self.updates.push((path, doc));
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn updates(&self) -> &[(ItemPath, ItemDoc)] {
        &self.updates
    }

    pub fn into_updates(self) -> Vec<(ItemPath, ItemDoc)> {
        self.updates
    }
}

// =============================================================================
// Trait
// =============================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All shop documents, id plus body.
    async fn list_shops(&self) -> StoreResult<Vec<(String, ShopDoc)>>;

    /// Categories under one shop. Empty when the shop does not exist.
    async fn list_categories(&self, shop_id: &str) -> StoreResult<Vec<(String, CategoryDoc)>>;

    /// Items under one category. Empty when the parent does not exist.
    async fn list_items(
        &self,
        shop_id: &str,
        category_id: &str,
    ) -> StoreResult<Vec<(String, ItemDoc)>>;

    /// Selling units under one item. Empty when the item does not exist.
    async fn list_sell_units(&self, item: &ItemPath) -> StoreResult<Vec<(String, SellUnitDoc)>>;

    /// Point read of an item document.
    async fn get_item(&self, item: &ItemPath) -> StoreResult<Option<ItemDoc>>;

    /// Applies every update in the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Appends a receipt under the shop. Receipts are write-only here.
    async fn put_receipt(&self, shop_id: &str, receipt: &Receipt) -> StoreResult<()>;

    /// Subscribes to changes across a collection group.
    fn watch(&self, group: CollectionGroup, buffer: usize) -> mpsc::Receiver<ChangeEvent>;

    /// `watch` wrapped as a `Stream` for select-loop consumers.
    fn watch_stream(&self, group: CollectionGroup, buffer: usize) -> ReceiverStream<ChangeEvent> {
        ReceiverStream::new(self.watch(group, buffer))
    }
}

// =============================================================================
// Tests
// =============================================================================
