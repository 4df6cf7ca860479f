//! # Sales Service
//!
//! The facade transport adapters talk to. Wires one document store into
//! the catalog cache, search engine and sale processor, and owns the
//! background refresher's lifecycle.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SalesService                                   │
//! │                                                                         │
//! │   search ──────────► SearchEngine ──reads──► CatalogCache (snapshot)    │
//! │   complete_sale ───► SaleProcessor ─writes─► DocumentStore              │
//! │   status/overview ─► CatalogCache                  │                    │
//! │                                                    │ change events      │
//! │                      CatalogRefresher ◄────────────┘                    │
//! │                        (spawned by start, stopped by shutdown)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use duka_store::DocumentStore;

use crate::catalog::{CatalogCache, RefreshStats};
use crate::config::ServiceConfig;
use crate::error::EngineResult;
use crate::refresher::{CatalogRefresher, RefresherHandle};
use crate::response::{BatchStatsReport, CacheOverview, SaleResponse, StatusSummary};
use crate::sale::{SaleProcessor, SaleRequest};
use crate::search::{SearchEngine, SearchResponse};

/// One service instance over one document store.
pub struct SalesService {
    store: Arc<dyn DocumentStore>,
    config: ServiceConfig,
    cache: Arc<CatalogCache>,
    search: SearchEngine,
    sales: SaleProcessor,
    refresher: Mutex<Option<RefresherHandle>>,
}

impl SalesService {
    /// Wires the cache, search engine and sale processor onto `store`.
    /// Nothing runs until [`start`](Self::start).
    pub fn new(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        let cache = Arc::new(CatalogCache::new(Arc::clone(&store)));
        let sales = SaleProcessor::new(Arc::clone(&store), config.sale.max_line_items);
        SalesService {
            cache,
            search: SearchEngine::new(),
            sales,
            refresher: Mutex::new(None),
            store,
            config,
        }
    }

    /// Warms the cache (when configured) and spawns the background
    /// refresher. Calling it again is a logged no-op.
    pub async fn start(&self) -> EngineResult<()> {
        if self
            .refresher
            .lock()
            .expect("Refresher slot poisoned")
            .is_some()
        {
            warn!("Service already started, ignoring");
            return Ok(());
        }

        if self.config.cache.warm_on_start {
            match self.cache.refresh().await {
                Ok(stats) => {
                    info!(shops = stats.shops, items = stats.items, "Catalog warmed")
                }
                Err(e) => {
                    // Serve the empty snapshot and let the refresher
                    // retry on the next store change.
                    error!(error = %e, "Initial catalog refresh failed; starting empty")
                }
            }
        }

        let (refresher, handle) = CatalogRefresher::new(
            Arc::clone(&self.cache),
            self.store.as_ref(),
            self.config.cache.watch_buffer,
        );
        *self.refresher.lock().expect("Refresher slot poisoned") = Some(handle);
        tokio::spawn(refresher.run());

        info!("Sales service started");
        Ok(())
    }

    /// Stops the background refresher. Idempotent.
    pub async fn shutdown(&self) -> EngineResult<()> {
        let handle = self
            .refresher
            .lock()
            .expect("Refresher slot poisoned")
            .take();
        if let Some(handle) = handle {
            handle.shutdown().await?;
            info!("Sales service stopped");
        }
        Ok(())
    }

    /// Stock-aware search against the current snapshot.
    pub fn search(&self, shop_id: &str, query: &str) -> SearchResponse {
        self.search.search(&self.cache.current(), shop_id, query)
    }

    /// Processes a sale and maps it onto the wire response.
    pub async fn complete_sale(&self, request: SaleRequest) -> SaleResponse {
        SaleResponse::from_outcome(self.sales.complete(request).await)
    }

    /// Forces a synchronous catalog rebuild, bypassing the watch loop.
    pub async fn refresh_catalog(&self) -> EngineResult<RefreshStats> {
        self.cache.refresh().await
    }

    pub fn cache_overview(&self) -> CacheOverview {
        let last = self.cache.last_stats();
        CacheOverview::build(&self.cache.current(), last.as_ref())
    }

    pub fn batch_stats(&self) -> BatchStatsReport {
        BatchStatsReport::from_snapshot(&self.cache.current())
    }

    pub fn status(&self) -> StatusSummary {
        StatusSummary::collect(&self.cache)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

// =============================================================================
// Tests
// =============================================================================
