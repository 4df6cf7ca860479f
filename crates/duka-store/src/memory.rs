//! # In-Memory Backend
//!
//! Reference [`DocumentStore`] keeping the whole shop tree in nested
//! maps behind one mutex. Backs the test suites and the demo binary;
//! the engine never assumes more than the trait contract.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Mutex<Inner>                                                    │
//! │  └─ shops: BTreeMap<ShopId, ShopNode>                            │
//! │      ├─ doc: ShopDoc                                             │
//! │      └─ categories: BTreeMap<CategoryId, CategoryNode>           │
//! │          ├─ doc: CategoryDoc                                     │
//! │          └─ items: BTreeMap<ItemId, ItemNode>                    │
//! │              ├─ doc: ItemDoc   version: u64                      │
//! │              └─ sell_units: BTreeMap<SellUnitId, SellUnitDoc>    │
//! │                                                                  │
//! │  receipts: BTreeMap<ShopId, Vec<Receipt>>   (append-only)        │
//! │  watchers ──try_send──► bounded channels, full feeds drop        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! BTreeMaps make listings deterministic, which keeps test assertions
//! on ordering honest. Versions count successful writes per item.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use duka_core::types::Receipt;

use crate::backend::{ChangeEvent, ChangeKind, CollectionGroup, DocumentStore, WriteBatch};
use crate::docs::{CategoryDoc, ItemDoc, SellUnitDoc, ShopDoc};
use crate::error::{StoreError, StoreResult};
use crate::paths::ItemPath;

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Default)]
struct ItemNode {
    doc: ItemDoc,
    version: u64,
    sell_units: BTreeMap<String, SellUnitDoc>,
}

#[derive(Debug, Default)]
struct CategoryNode {
    doc: CategoryDoc,
    items: BTreeMap<String, ItemNode>,
}

#[derive(Debug, Default)]
struct ShopNode {
    doc: ShopDoc,
    categories: BTreeMap<String, CategoryNode>,
}

#[derive(Debug, Default)]
struct Inner {
    shops: BTreeMap<String, ShopNode>,
    receipts: BTreeMap<String, Vec<Receipt>>,
    fail_next_commit: bool,
}

impl Inner {
    fn item_node(&self, path: &ItemPath) -> Option<&ItemNode> {
        self.shops
            .get(&path.shop_id)?
            .categories
            .get(&path.category_id)?
            .items
            .get(&path.item_id)
    }

    fn item_node_mut(&mut self, path: &ItemPath) -> Option<&mut ItemNode> {
        self.shops
            .get_mut(&path.shop_id)?
            .categories
            .get_mut(&path.category_id)?
            .items
            .get_mut(&path.item_id)
    }

    /// Walks to the item node, creating missing parents on the way.
    fn item_node_entry(&mut self, path: &ItemPath) -> (&mut ItemNode, bool) {
        let shop = self.shops.entry(path.shop_id.clone()).or_default();
        let category = shop.categories.entry(path.category_id.clone()).or_default();
        let existed = category.items.contains_key(&path.item_id);
        (category.items.entry(path.item_id.clone()).or_default(), existed)
    }
}

struct Watcher {
    group: CollectionGroup,
    tx: mpsc::Sender<ChangeEvent>,
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Inner>,
    watchers: Mutex<Vec<Watcher>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    // -------------------------------------------------------------------------
    // Seeding helpers (synchronous, used by tests and the demo binary)
    // -------------------------------------------------------------------------

    /// Creates or renames a shop. Existing categories survive a rename.
    pub fn put_shop(&self, shop_id: impl Into<String>, name: impl Into<String>) {
        let mut data = self.data.lock().expect("Store mutex poisoned");
        data.shops.entry(shop_id.into()).or_default().doc = ShopDoc { name: name.into() };
    }

    /// Creates or renames a category, creating the shop if needed.
    pub fn put_category(
        &self,
        shop_id: impl Into<String>,
        category_id: impl Into<String>,
        name: impl Into<String>,
    ) {
        let mut data = self.data.lock().expect("Store mutex poisoned");
        let shop = data.shops.entry(shop_id.into()).or_default();
        shop.categories.entry(category_id.into()).or_default().doc =
            CategoryDoc { name: name.into() };
    }

    /// Writes an item document, creating missing parents, and notifies
    /// item watchers.
    pub fn put_item(&self, path: &ItemPath, doc: ItemDoc) {
        let kind = {
            let mut data = self.data.lock().expect("Store mutex poisoned");
            let (node, existed) = data.item_node_entry(path);
            node.doc = doc;
            if existed {
                node.version += 1;
                ChangeKind::Updated
            } else {
                ChangeKind::Added
            }
        };
        self.emit(vec![ChangeEvent {
            group: CollectionGroup::Items,
            kind,
            item: path.clone(),
            doc_id: path.item_id.clone(),
        }]);
    }

    /// Writes a selling-unit document under an item, creating missing
    /// parents, and notifies selling-unit watchers.
    pub fn put_sell_unit(&self, item: &ItemPath, sell_unit_id: impl Into<String>, doc: SellUnitDoc) {
        let sell_unit_id = sell_unit_id.into();
        let kind = {
            let mut data = self.data.lock().expect("Store mutex poisoned");
            let (node, _) = data.item_node_entry(item);
            let existed = node.sell_units.contains_key(&sell_unit_id);
            node.sell_units.insert(sell_unit_id.clone(), doc);
            if existed {
                ChangeKind::Updated
            } else {
                ChangeKind::Added
            }
        };
        self.emit(vec![ChangeEvent {
            group: CollectionGroup::SellUnits,
            kind,
            item: item.clone(),
            doc_id: sell_unit_id,
        }]);
    }

    /// Deletes an item (and its selling units). Returns whether it existed.
    pub fn remove_item(&self, path: &ItemPath) -> bool {
        let removed = {
            let mut data = self.data.lock().expect("Store mutex poisoned");
            data.shops
                .get_mut(&path.shop_id)
                .and_then(|s| s.categories.get_mut(&path.category_id))
                .and_then(|c| c.items.remove(&path.item_id))
                .is_some()
        };
        if removed {
            self.emit(vec![ChangeEvent {
                group: CollectionGroup::Items,
                kind: ChangeKind::Removed,
                item: path.clone(),
                doc_id: path.item_id.clone(),
            }]);
        }
        removed
    }

    /// Makes the next `commit` fail with an injected error, once.
    pub fn fail_next_commit(&self) {
        self.data.lock().expect("Store mutex poisoned").fail_next_commit = true;
    }

    /// Write count for the item, `None` if it does not exist.
    pub fn item_version(&self, path: &ItemPath) -> Option<u64> {
        let data = self.data.lock().expect("Store mutex poisoned");
        data.item_node(path).map(|n| n.version)
    }

    /// Receipts stored for a shop, oldest first.
    pub fn receipts(&self, shop_id: &str) -> Vec<Receipt> {
        let data = self.data.lock().expect("Store mutex poisoned");
        data.receipts.get(shop_id).cloned().unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Change fan-out
    // -------------------------------------------------------------------------

    fn emit(&self, events: Vec<ChangeEvent>) {
        if events.is_empty() {
            return;
        }
        let mut watchers = self.watchers.lock().expect("Store watcher mutex poisoned");
        watchers.retain(|w| !w.tx.is_closed());
        for event in events {
            for watcher in watchers.iter() {
                if watcher.group != event.group {
                    continue;
                }
                match watcher.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(group = ?event.group, doc_id = %event.doc_id, "change feed full, dropping event");
                    }
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        }
    }
}

// =============================================================================
// DocumentStore impl
// =============================================================================

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_shops(&self) -> StoreResult<Vec<(String, ShopDoc)>> {
        let data = self.data.lock().expect("Store mutex poisoned");
        Ok(data
            .shops
            .iter()
            .map(|(id, node)| (id.clone(), node.doc.clone()))
            .collect())
    }

    async fn list_categories(&self, shop_id: &str) -> StoreResult<Vec<(String, CategoryDoc)>> {
        let data = self.data.lock().expect("Store mutex poisoned");
        Ok(data
            .shops
            .get(shop_id)
            .map(|shop| {
                shop.categories
                    .iter()
                    .map(|(id, node)| (id.clone(), node.doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_items(
        &self,
        shop_id: &str,
        category_id: &str,
    ) -> StoreResult<Vec<(String, ItemDoc)>> {
        let data = self.data.lock().expect("Store mutex poisoned");
        Ok(data
            .shops
            .get(shop_id)
            .and_then(|shop| shop.categories.get(category_id))
            .map(|category| {
                category
                    .items
                    .iter()
                    .map(|(id, node)| (id.clone(), node.doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_sell_units(&self, item: &ItemPath) -> StoreResult<Vec<(String, SellUnitDoc)>> {
        let data = self.data.lock().expect("Store mutex poisoned");
        Ok(data
            .item_node(item)
            .map(|node| {
                node.sell_units
                    .iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_item(&self, item: &ItemPath) -> StoreResult<Option<ItemDoc>> {
        let data = self.data.lock().expect("Store mutex poisoned");
        Ok(data.item_node(item).map(|node| node.doc.clone()))
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let events = {
            let mut data = self.data.lock().expect("Store mutex poisoned");
            if data.fail_next_commit {
                data.fail_next_commit = false;
                return Err(StoreError::CommitFailed("injected failure".to_string()));
            }
            // Validate every target first so a bad batch changes nothing.
            for (path, _) in batch.updates() {
                if data.item_node(path).is_none() {
                    return Err(StoreError::not_found("item", path.to_string()));
                }
            }
            let mut events = Vec::with_capacity(batch.len());
            for (path, doc) in batch.into_updates() {
                match data.item_node_mut(&path) {
                    Some(node) => {
                        node.doc = doc;
                        node.version += 1;
                        events.push(ChangeEvent {
                            group: CollectionGroup::Items,
                            kind: ChangeKind::Updated,
                            doc_id: path.item_id.clone(),
                            item: path,
                        });
                    }
                    None => return Err(StoreError::not_found("item", path.to_string())),
                }
            }
            events
        };
        self.emit(events);
        Ok(())
    }

    async fn put_receipt(&self, shop_id: &str, receipt: &Receipt) -> StoreResult<()> {
        let mut data = self.data.lock().expect("Store mutex poisoned");
        data.receipts
            .entry(shop_id.to_string())
            .or_default()
            .push(receipt.clone());
        Ok(())
    }

    fn watch(&self, group: CollectionGroup, buffer: usize) -> mpsc::Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel(buffer);
        self.watchers
            .lock()
            .expect("Store watcher mutex poisoned")
            .push(Watcher { group, tx });
        rx
    }
}

// =============================================================================
// Tests
// =============================================================================
