//! # Catalog Refresher
//!
//! Background task that keeps the snapshot current. It watches both
//! collection groups plus a manual trigger channel and rebuilds the
//! whole snapshot on any signal, coalescing bursts into single passes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Refresh Coalescing                               │
//! │                                                                         │
//! │  items feed ────┐                                                       │
//! │  sellUnits feed ┼──► select! ──► drain all queues ──► cache.refresh()  │
//! │  trigger ───────┘                                                       │
//! │                                                                         │
//! │  Signals arriving MID-rebuild stay queued; the loop wakes once more,   │
//! │  drains them all, and runs exactly one follow-up rebuild:              │
//! │                                                                         │
//! │    rebuild #1 ████████████                                              │
//! │    signals      ▲ ▲ ▲ ▲  (queued)                                       │
//! │    rebuild #2              ████████████   (one pass for all four)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A full rebuild per signal sounds heavy but the catalog is small and
//! the alternative, patching the snapshot in place, has ordering bugs
//! this service never needs to risk.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use duka_store::{ChangeEvent, CollectionGroup, DocumentStore};

use crate::catalog::CatalogCache;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Handle
// =============================================================================

/// Handle for controlling the refresher task.
#[derive(Clone)]
pub struct RefresherHandle {
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefresherHandle {
    /// Requests a rebuild. Returns once the request is queued, not done.
    pub async fn trigger(&self) -> EngineResult<()> {
        self.trigger_tx
            .send(())
            .await
            .map_err(|_| EngineError::Channel("Refresh trigger channel closed".into()))
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| EngineError::Channel("Refresher shutdown channel closed".into()))
    }
}

// =============================================================================
// Refresher
// =============================================================================

/// Drives cache rebuilds from store change feeds.
pub struct CatalogRefresher {
    cache: Arc<CatalogCache>,
    item_events: mpsc::Receiver<ChangeEvent>,
    unit_events: mpsc::Receiver<ChangeEvent>,
    trigger_rx: mpsc::Receiver<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl CatalogRefresher {
    /// Subscribes to both collection groups and returns the task plus
    /// its handle. Spawn [`run`](Self::run) to start refreshing.
    pub fn new(
        cache: Arc<CatalogCache>,
        store: &dyn DocumentStore,
        watch_buffer: usize,
    ) -> (Self, RefresherHandle) {
        let item_events = store.watch(CollectionGroup::Items, watch_buffer);
        let unit_events = store.watch(CollectionGroup::SellUnits, watch_buffer);
        let (trigger_tx, trigger_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let refresher = CatalogRefresher {
            cache,
            item_events,
            unit_events,
            trigger_rx,
            shutdown_rx,
        };
        let handle = RefresherHandle {
            trigger_tx,
            shutdown_tx,
        };

        (refresher, handle)
    }

    /// Runs the refresh loop. Spawn as a background task; stops on
    /// shutdown or when the handle is dropped.
    pub async fn run(mut self) {
        info!("Catalog refresher started");

        loop {
            tokio::select! {
                Some(event) = self.item_events.recv() => {
                    debug!(doc_id = %event.doc_id, kind = ?event.kind, "Item change observed");
                    self.rebuild().await;
                }

                Some(event) = self.unit_events.recv() => {
                    debug!(doc_id = %event.doc_id, kind = ?event.kind, "Selling-unit change observed");
                    self.rebuild().await;
                }

                Some(()) = self.trigger_rx.recv() => {
                    debug!("Manual refresh requested");
                    self.rebuild().await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Catalog refresher shutting down");
                    break;
                }
            }
        }

        info!("Catalog refresher stopped");
    }

    /// Drains everything already queued, then rebuilds once for the lot.
    async fn rebuild(&mut self) {
        let coalesced = self.drain_pending();
        if coalesced > 0 {
            debug!(coalesced, "Coalesced queued change signals");
        }
        if let Err(e) = self.cache.refresh().await {
            error!(error = %e, "Catalog refresh failed; keeping previous snapshot");
        }
    }

    fn drain_pending(&mut self) -> usize {
        let mut drained = 0;
        while self.item_events.try_recv().is_ok() {
            drained += 1;
        }
        while self.unit_events.try_recv().is_ok() {
            drained += 1;
        }
        while self.trigger_rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use duka_core::types::Receipt;
    use duka_store::{
        CategoryDoc, ItemDoc, ItemPath, MemoryStore, SellUnitDoc, ShopDoc, StoreResult,
        WriteBatch,
    };

    async fn wait_for_refreshes(cache: &CatalogCache, at_least: u64) {
        for _ in 0..100 {
            if cache.refresh_count() >= at_least {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "cache never reached {} refreshes (got {})",
            at_least,
            cache.refresh_count()
        );
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.put_shop("s1", "Duka Moja");
        store.put_category("s1", "c1", "Grains");
        store.put_item(&ItemPath::new("s1", "c1", "rice"), ItemDoc::named("Rice"));
        store
    }

    #[tokio::test]
    async fn item_changes_drive_rebuilds() {
        let store = seeded();
        let cache = Arc::new(CatalogCache::new(store.clone()));
        let (refresher, handle) = CatalogRefresher::new(cache.clone(), store.as_ref(), 8);
        let task = tokio::spawn(refresher.run());

        store.put_item(&ItemPath::new("s1", "c1", "salt"), ItemDoc::named("Salt"));
        wait_for_refreshes(&cache, 1).await;
        assert!(cache.current().stats().items >= 2);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn selling_unit_changes_drive_rebuilds() {
        let store = seeded();
        let cache = Arc::new(CatalogCache::new(store.clone()));
        let (refresher, handle) = CatalogRefresher::new(cache.clone(), store.as_ref(), 8);
        let task = tokio::spawn(refresher.run());

        store.put_sell_unit(
            &ItemPath::new("s1", "c1", "rice"),
            "su1",
            SellUnitDoc::new("Cup", 4.0, 70.0),
        );
        wait_for_refreshes(&cache, 1).await;
        assert_eq!(cache.current().stats().selling_units, 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn manual_trigger_rebuilds() {
        let store = seeded();
        let cache = Arc::new(CatalogCache::new(store.clone()));
        let (refresher, handle) = CatalogRefresher::new(cache.clone(), store.as_ref(), 8);
        let task = tokio::spawn(refresher.run());

        handle.trigger().await.unwrap();
        wait_for_refreshes(&cache, 1).await;
        assert!(cache.is_loaded());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    // -------------------------------------------------------------------------
    // Coalescing
    // -------------------------------------------------------------------------

    /// Store wrapper that blocks each full scan on a semaphore permit,
    /// so a test can hold a rebuild mid-flight.
    struct GatedStore {
        inner: MemoryStore,
        gate: Semaphore,
        scans: AtomicU64,
    }

    impl GatedStore {
        fn new(inner: MemoryStore) -> Self {
            GatedStore {
                inner,
                gate: Semaphore::new(0),
                scans: AtomicU64::new(0),
            }
        }

        fn release_scan(&self) {
            self.gate.add_permits(1);
        }

        fn scans(&self) -> u64 {
            self.scans.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for GatedStore {
        async fn list_shops(&self) -> StoreResult<Vec<(String, ShopDoc)>> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            self.inner.list_shops().await
        }

        async fn list_categories(&self, shop_id: &str) -> StoreResult<Vec<(String, CategoryDoc)>> {
            self.inner.list_categories(shop_id).await
        }

        async fn list_items(
            &self,
            shop_id: &str,
            category_id: &str,
        ) -> StoreResult<Vec<(String, ItemDoc)>> {
            self.inner.list_items(shop_id, category_id).await
        }

        async fn list_sell_units(
            &self,
            item: &ItemPath,
        ) -> StoreResult<Vec<(String, SellUnitDoc)>> {
            self.inner.list_sell_units(item).await
        }

        async fn get_item(&self, item: &ItemPath) -> StoreResult<Option<ItemDoc>> {
            self.inner.get_item(item).await
        }

        async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
            self.inner.commit(batch).await
        }

        async fn put_receipt(&self, shop_id: &str, receipt: &Receipt) -> StoreResult<()> {
            self.inner.put_receipt(shop_id, receipt).await
        }

        fn watch(
            &self,
            group: CollectionGroup,
            buffer: usize,
        ) -> mpsc::Receiver<ChangeEvent> {
            self.inner.watch(group, buffer)
        }
    }

    #[tokio::test]
    async fn signals_during_a_rebuild_coalesce_into_one_pass() {
        let inner = MemoryStore::new();
        inner.put_shop("s1", "Duka Moja");
        inner.put_category("s1", "c1", "Grains");
        inner.put_item(&ItemPath::new("s1", "c1", "rice"), ItemDoc::named("Rice"));

        let store = Arc::new(GatedStore::new(inner));
        let cache = Arc::new(CatalogCache::new(store.clone()));
        let (refresher, handle) = CatalogRefresher::new(cache.clone(), store.as_ref(), 8);
        let task = tokio::spawn(refresher.run());

        // Start one rebuild and hold it at the scan gate.
        handle.trigger().await.unwrap();
        for _ in 0..100 {
            if store.scans() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.scans(), 1);

        // Five more requests pile up behind the held rebuild.
        for _ in 0..5 {
            handle.trigger().await.unwrap();
        }

        store.release_scan();
        wait_for_refreshes(&cache, 1).await;

        // All five drain into exactly one follow-up rebuild.
        store.release_scan();
        wait_for_refreshes(&cache, 2).await;
        assert_eq!(store.scans(), 2);

        // And nothing is left over to start a third.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.refresh_count(), 2);
        assert_eq!(store.scans(), 2);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
