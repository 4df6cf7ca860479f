//! # Catalog Cache
//!
//! Full-scan snapshot builder over the document store. Each refresh
//! walks shops, categories, items and selling units, converts wire
//! documents into catalog types, and atomically swaps the published
//! snapshot. Readers clone an `Arc` and never block a rebuild.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Refresh Pipeline                               │
//! │                                                                         │
//! │  list_shops ─► list_categories ─► list_items ─► list_sell_units        │
//! │                                      │                │                 │
//! │                          to_cached_item()   to_selling_unit()           │
//! │                                      │                │                 │
//! │                                 ok ──┴── err ► quarantine (warn+count)  │
//! │                                      │                                  │
//! │   drop categories with no items, shops with no categories               │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                published: RwLock<Arc<Snapshot>>  (swap)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A malformed document never fails the refresh: it is skipped, logged
//! and counted, and the rest of the catalog goes live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use ts_rs::TS;

use duka_core::catalog::{CachedCategory, CachedShop, Snapshot};
use duka_store::{DocumentStore, ItemPath};

use crate::error::EngineResult;

// =============================================================================
// Refresh Stats
// =============================================================================

/// Outcome of one full snapshot rebuild.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct RefreshStats {
    pub shops: usize,
    pub categories: usize,
    pub items: usize,
    pub selling_units: usize,
    pub batches: usize,
    /// Documents skipped because they failed conversion.
    pub quarantined: usize,
    pub elapsed_ms: u64,
    #[ts(as = "String")]
    pub finished_at: DateTime<Utc>,
}

// =============================================================================
// Catalog Cache
// =============================================================================

pub struct CatalogCache {
    store: Arc<dyn DocumentStore>,
    published: RwLock<Arc<Snapshot>>,
    last_stats: RwLock<Option<RefreshStats>>,
    refreshes: AtomicU64,
}

impl CatalogCache {
    /// Starts with an empty snapshot; call [`refresh`](Self::refresh) to load.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        CatalogCache {
            store,
            published: RwLock::new(Arc::new(Snapshot::empty())),
            last_stats: RwLock::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    /// The currently published snapshot. Cheap; clones an `Arc`.
    pub fn current(&self) -> Arc<Snapshot> {
        self.published
            .read()
            .expect("Catalog snapshot lock poisoned")
            .clone()
    }

    /// Whether a snapshot has ever been built.
    pub fn is_loaded(&self) -> bool {
        self.current().built_at.is_some()
    }

    /// When the published snapshot was built.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.current().built_at
    }

    /// Stats from the most recent rebuild.
    pub fn last_stats(&self) -> Option<RefreshStats> {
        self.last_stats
            .read()
            .expect("Catalog stats lock poisoned")
            .clone()
    }

    /// Number of completed rebuilds since startup.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Rebuilds the snapshot from a full store scan and publishes it.
    ///
    /// Categories with no valid items and shops with no surviving
    /// categories are dropped. Items without batches stay cached; the
    /// search side decides what to do with them.
    pub async fn refresh(&self) -> EngineResult<RefreshStats> {
        let started = Instant::now();
        let mut quarantined = 0usize;
        let mut shops = Vec::new();

        for (shop_id, shop_doc) in self.store.list_shops().await? {
            let mut categories = Vec::new();

            for (category_id, category_doc) in self.store.list_categories(&shop_id).await? {
                let mut items = Vec::new();

                for (item_id, item_doc) in self.store.list_items(&shop_id, &category_id).await? {
                    let mut item =
                        match item_doc.to_cached_item(&item_id, &category_id, &category_doc.name) {
                            Ok(item) => item,
                            Err(e) => {
                                quarantined += 1;
                                warn!(shop = %shop_id, item = %item_id, error = %e, "Quarantined item document");
                                continue;
                            }
                        };

                    let path = ItemPath::new(&shop_id, &category_id, &item_id);
                    for (unit_id, unit_doc) in self.store.list_sell_units(&path).await? {
                        match unit_doc.to_selling_unit(&unit_id) {
                            Ok(unit) => item.selling_units.push(unit),
                            Err(e) => {
                                quarantined += 1;
                                warn!(doc = %path.sell_unit(&unit_id), error = %e, "Quarantined selling unit document");
                            }
                        }
                    }

                    items.push(item);
                }

                if items.is_empty() {
                    continue;
                }
                categories.push(CachedCategory {
                    id: category_id,
                    name: category_doc.name,
                    items,
                });
            }

            if categories.is_empty() {
                continue;
            }
            shops.push(CachedShop {
                id: shop_id,
                name: shop_doc.name,
                categories,
            });
        }

        let snapshot = Arc::new(Snapshot {
            shops,
            built_at: Some(Utc::now()),
        });
        let counts = snapshot.stats();
        let stats = RefreshStats {
            shops: counts.shops,
            categories: counts.categories,
            items: counts.items,
            selling_units: counts.selling_units,
            batches: counts.batches,
            quarantined,
            elapsed_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        };

        *self
            .published
            .write()
            .expect("Catalog snapshot lock poisoned") = snapshot;
        *self.last_stats.write().expect("Catalog stats lock poisoned") = Some(stats.clone());
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        info!(
            shops = stats.shops,
            items = stats.items,
            selling_units = stats.selling_units,
            quarantined = stats.quarantined,
            elapsed_ms = stats.elapsed_ms,
            "Catalog snapshot rebuilt"
        );
        Ok(stats)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::catalog::BatchLink;
    use duka_store::{BatchDoc, ItemDoc, MemoryStore, SellUnitDoc};

    fn path(item: &str) -> ItemPath {
        ItemPath::new("s1", "c1", item)
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.put_shop("s1", "Mama Njeri's Duka");
        store.put_category("s1", "c1", "Grains");

        let mut rice = ItemDoc::named("Basmati Rice");
        rice.sell_price = 250.0;
        rice.images = vec!["rice.jpg".to_string()];
        rice.batches.push(BatchDoc::new("b1", "January", 10.0, 250.0, 1_000));
        rice.batches.push(BatchDoc::new("b2", "February", 5.0, 260.0, 2_000));
        store.put_item(&path("rice"), rice);

        store
    }

    #[tokio::test]
    async fn refresh_builds_the_published_snapshot() {
        let store = seeded();
        let cache = CatalogCache::new(store.clone());
        assert!(!cache.is_loaded());

        let stats = cache.refresh().await.unwrap();
        assert_eq!(stats.shops, 1);
        assert_eq!(stats.items, 1);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.quarantined, 0);

        let snapshot = cache.current();
        assert!(cache.is_loaded());
        let shop = snapshot.find_shop("s1").unwrap();
        assert_eq!(shop.name, "Mama Njeri's Duka");
        let item = &shop.categories[0].items[0];
        assert_eq!(item.name, "Basmati Rice");
        assert_eq!(item.category_name, "Grains");
        assert_eq!(item.thumbnail.as_deref(), Some("rice.jpg"));
        // Batch totals override the stored stock figure.
        assert_eq!(item.stock, 15.0);
    }

    #[tokio::test]
    async fn empty_categories_and_shops_are_dropped() {
        let store = seeded();
        store.put_category("s1", "c-empty", "Empty Shelf");
        store.put_shop("s2", "No Stock Yet");

        let cache = CatalogCache::new(store);
        let stats = cache.refresh().await.unwrap();

        assert_eq!(stats.shops, 1);
        assert_eq!(stats.categories, 1);
        let snapshot = cache.current();
        assert!(snapshot.find_shop("s2").is_none());
    }

    #[tokio::test]
    async fn batchless_items_stay_cached() {
        let store = seeded();
        let mut salt = ItemDoc::named("Salt");
        salt.stock = 30.0;
        store.put_item(&path("salt"), salt);

        let cache = CatalogCache::new(store);
        let stats = cache.refresh().await.unwrap();
        assert_eq!(stats.items, 2);

        let snapshot = cache.current();
        let items = &snapshot.find_shop("s1").unwrap().categories[0].items;
        let salt = items.iter().find(|i| i.name == "Salt").unwrap();
        assert!(!salt.has_batches());
        assert_eq!(salt.stock, 30.0);
    }

    #[tokio::test]
    async fn invalid_documents_are_quarantined_not_fatal() {
        let store = seeded();
        store.put_item(&path("broken"), ItemDoc::named("   "));

        let mut bad_unit = SellUnitDoc::new("Cup", f64::NAN, 5.0);
        bad_unit.batch_links = Vec::new();
        store.put_sell_unit(&path("rice"), "su-bad", bad_unit);

        let cache = CatalogCache::new(store);
        let stats = cache.refresh().await.unwrap();

        assert_eq!(stats.quarantined, 2);
        // The valid item still made it in, minus the bad unit.
        assert_eq!(stats.items, 1);
        assert_eq!(stats.selling_units, 0);
    }

    #[tokio::test]
    async fn selling_units_attach_with_precomputed_totals() {
        let store = seeded();
        let mut stick = SellUnitDoc::new("Stick", 20.0, 10.0);
        stick.batch_links = vec![BatchLink {
            batch_id: "b1".to_string(),
            batch_timestamp: 1_000,
            max_units_available: 40.0,
            allocated_units: 5.0,
            price_per_unit: 10.0,
        }];
        store.put_sell_unit(&path("rice"), "su1", stick);

        let cache = CatalogCache::new(store);
        cache.refresh().await.unwrap();

        let snapshot = cache.current();
        let item = &snapshot.find_shop("s1").unwrap().categories[0].items[0];
        assert_eq!(item.selling_units.len(), 1);
        assert_eq!(item.selling_units[0].total_units_available, 35.0);
        assert!(item.selling_units[0].has_batch_links);
    }

    #[tokio::test]
    async fn refresh_swaps_snapshots_and_counts() {
        let store = seeded();
        let cache = CatalogCache::new(store.clone());

        cache.refresh().await.unwrap();
        let before = cache.current();
        assert_eq!(cache.refresh_count(), 1);

        let mut salt = ItemDoc::named("Salt");
        salt.stock = 30.0;
        store.put_item(&path("salt"), salt);

        // Published snapshot is immutable until the next refresh.
        assert_eq!(before.stats().items, 1);
        cache.refresh().await.unwrap();
        assert_eq!(cache.current().stats().items, 2);
        assert_eq!(cache.refresh_count(), 2);
        assert!(cache.last_stats().unwrap().finished_at >= before.built_at.unwrap());
    }
}
