//! Single-Flight Page Resolver
//!
//! Read-through resolution of short ids with request coalescing.
//!
//! A cold short id hit by many visitors at once triggers exactly one durable
//! store fetch in this process: the first caller starts a flight, later
//! callers join it, and every caller receives the same outcome. The fetch runs
//! on its own task, so a caller going away does not cancel it.
//!
//! The in-flight map is process-local. Several processes behind a load
//! balancer may each fetch the same cold id once.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::pages::{Page, PageLookupCache, StatsCounter};
use crate::store::{DurableStore, StoreError};

// == Resolve Error ==
/// Failure shared with every caller of a flight.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("page lookup failed: {0}")]
    Store(#[from] StoreError),

    /// The fetch task ended without producing a result
    #[error("page lookup for '{0}' was aborted")]
    Aborted(String),
}

/// Outcome of one flight.
pub type FlightResult = Result<Option<Page>, ResolveError>;

type FlightCell = watch::Receiver<Option<FlightResult>>;

// == Flight Guard ==
/// Removes the flight's map entry when dropped, whether the fetch finished,
/// failed or panicked.
struct FlightGuard {
    inflight: Arc<DashMap<String, FlightCell>>,
    short_id: String,
    cell: FlightCell,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inflight
            .remove_if(&self.short_id, |_, cell| cell.same_channel(&self.cell));
    }
}

// == Page Resolver ==
#[derive(Clone)]
pub struct PageResolver {
    store: Arc<dyn DurableStore>,
    lookup: PageLookupCache,
    stats: StatsCounter,
    inflight: Arc<DashMap<String, FlightCell>>,
}

impl PageResolver {
    pub fn new(store: Arc<dyn DurableStore>, lookup: PageLookupCache, stats: StatsCounter) -> Self {
        Self {
            store,
            lookup,
            stats,
            inflight: Arc::new(DashMap::new()),
        }
    }

    pub fn lookup(&self) -> &PageLookupCache {
        &self.lookup
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// Number of fetches currently in flight.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    // == Resolve ==
    /// Resolves a short id to its page, `Ok(None)` if no such page exists.
    ///
    /// State checks (inactive, expired, not launched) are left to the caller.
    pub async fn resolve(&self, short_id: &str) -> FlightResult {
        if let Some(page) = self.lookup.get_page_from_cache(short_id).await {
            debug!(short_id, "page cache hit");
            self.count_view(&page);
            return Ok(Some(page));
        }

        let mut cell = self.join_or_start(short_id);
        // A closed channel without a value means the fetch task died.
        let outcome = cell
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|result| result.clone());
        outcome.unwrap_or_else(|| Err(ResolveError::Aborted(short_id.to_string())))
    }

    /// Returns the flight for `short_id`, starting one if none is running.
    fn join_or_start(&self, short_id: &str) -> FlightCell {
        // The shard lock is released at the end of the match, before spawning.
        let (cell, sender) = match self.inflight.entry(short_id.to_string()) {
            Entry::Occupied(existing) => {
                debug!(short_id, "joining in-flight page lookup");
                (existing.get().clone(), None)
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(rx.clone());
                (rx, Some(tx))
            }
        };

        if let Some(tx) = sender {
            let guard = FlightGuard {
                inflight: self.inflight.clone(),
                short_id: short_id.to_string(),
                cell: cell.clone(),
            };
            let resolver = self.clone();
            let short_id = short_id.to_string();
            tokio::spawn(async move {
                let result = resolver.fetch(&short_id).await;
                drop(guard);
                tx.send_replace(Some(result));
            });
        }

        cell
    }

    async fn fetch(&self, short_id: &str) -> FlightResult {
        debug!(short_id, "fetching page from durable store");
        let page = match self.store.page_by_short_id(short_id).await {
            Ok(page) => page,
            Err(err) => {
                warn!(short_id, error = %err, "durable store lookup failed");
                return Err(err.into());
            }
        };

        // Misses are not cached: a page created a moment later must show up.
        let Some(page) = page else {
            return Ok(None);
        };

        if let Err(err) = self.lookup.cache_page(&page).await {
            warn!(short_id, error = %err, "failed to cache resolved page");
        }
        self.count_view(&page);
        Ok(Some(page))
    }

    /// Fire-and-forget view increment.
    fn count_view(&self, page: &Page) {
        let stats = self.stats.clone();
        let page_id = page.id;
        tokio::spawn(async move {
            if let Err(err) = stats.increment_page_views(page_id).await {
                warn!(%page_id, error = %err, "failed to record page view");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::expiration::ExpirationSetting;
    use crate::kv::MemoryKv;
    use crate::pages::PageVersion;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    /// Store wrapper that counts short-id lookups, holds them for a while and
    /// can be told to fail.
    struct SlowStore {
        inner: MemoryStore,
        fetches: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl DurableStore for SlowStore {
        async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
            self.inner.page_by_id(id).await
        }
        async fn page_by_short_id(&self, short_id: &str) -> Result<Option<Page>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.inner.page_by_short_id(short_id).await
        }
        async fn version(&self, id: Uuid) -> Result<Option<PageVersion>, StoreError> {
            self.inner.version(id).await
        }
        async fn published_versions_with_expiration(
            &self,
        ) -> Result<Vec<PageVersion>, StoreError> {
            self.inner.published_versions_with_expiration().await
        }
        async fn set_version_published(&self, id: Uuid, p: bool) -> Result<bool, StoreError> {
            self.inner.set_version_published(id, p).await
        }
        async fn mark_page_expired(
            &self,
            id: Uuid,
            url: Option<String>,
            at: DateTime<Utc>,
        ) -> Result<Option<Page>, StoreError> {
            self.inner.mark_page_expired(id, url, at).await
        }
        async fn expiration_setting(
            &self,
            id: Uuid,
        ) -> Result<Option<ExpirationSetting>, StoreError> {
            self.inner.expiration_setting(id).await
        }
        async fn insert_expiration_setting(
            &self,
            s: ExpirationSetting,
        ) -> Result<(), StoreError> {
            self.inner.insert_expiration_setting(s).await
        }
        async fn update_expiration_setting(
            &self,
            s: ExpirationSetting,
        ) -> Result<bool, StoreError> {
            self.inner.update_expiration_setting(s).await
        }
        async fn delete_expiration_setting(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.delete_expiration_setting(id).await
        }
        async fn attach_expiration(
            &self,
            v: Uuid,
            s: Option<Uuid>,
        ) -> Result<bool, StoreError> {
            self.inner.attach_expiration(v, s).await
        }
    }

    struct Harness {
        resolver: PageResolver,
        store: Arc<SlowStore>,
        memory: MemoryStore,
        kv: MemoryKv,
        clock: Arc<ManualClock>,
    }

    fn harness(fail: bool) -> Harness {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let memory = MemoryStore::new();
        let store = Arc::new(SlowStore {
            inner: memory.clone(),
            fetches: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
            fail,
        });
        let kv = MemoryKv::new(100, clock.clone());
        let lookup = PageLookupCache::new(Arc::new(kv.clone()), clock.clone());
        let stats = StatsCounter::new(Arc::new(kv.clone()));
        Harness {
            resolver: PageResolver::new(store.clone(), lookup, stats),
            store,
            memory,
            kv,
            clock,
        }
    }

    async fn wait_for_views(stats: &StatsCounter, page_id: Uuid, at_least: u64) -> u64 {
        for _ in 0..100 {
            let views = stats.get_page_stats(page_id).await.unwrap().unwrap().views;
            if views >= at_least {
                return views;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stats.get_page_stats(page_id).await.unwrap().unwrap().views
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_fetch() {
        let h = harness(false);
        let page = Page::new("blast", Uuid::new_v4(), h.clock.now());
        h.memory.insert_page(page.clone()).await.unwrap();

        let calls: Vec<_> = (0..32)
            .map(|_| {
                let resolver = h.resolver.clone();
                tokio::spawn(async move { resolver.resolve("blast").await })
            })
            .collect();

        for call in calls {
            assert_eq!(call.await.unwrap(), Ok(Some(page.clone())));
        }
        assert_eq!(h.store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.resolver.inflight_len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_reaches_every_waiter_and_clears_entry() {
        let h = harness(true);

        let calls: Vec<_> = (0..8)
            .map(|_| {
                let resolver = h.resolver.clone();
                tokio::spawn(async move { resolver.resolve("down").await })
            })
            .collect();

        for call in calls {
            assert!(matches!(call.await.unwrap(), Err(ResolveError::Store(_))));
        }
        assert_eq!(h.store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.resolver.inflight_len(), 0);

        // A later request retries instead of replaying the failure.
        let _ = h.resolver.resolve("down").await;
        assert_eq!(h.store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let h = harness(false);

        assert_eq!(h.resolver.resolve("later").await, Ok(None));
        assert!(h.kv.is_empty().await);

        let page = Page::new("later", Uuid::new_v4(), h.clock.now());
        h.memory.insert_page(page.clone()).await.unwrap();

        assert_eq!(h.resolver.resolve("later").await, Ok(Some(page)));
        assert_eq!(h.store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_store_and_counts_views() {
        let h = harness(false);
        let page = Page::new("warm", Uuid::new_v4(), h.clock.now());
        h.memory.insert_page(page.clone()).await.unwrap();

        for expected in 1..=3 {
            h.resolver.resolve("warm").await.unwrap();
            assert_eq!(wait_for_views(h.resolver.stats(), page.id, expected).await, expected);
        }

        assert_eq!(h.store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_fetch() {
        let h = harness(false);
        let page = Page::new("abandon", Uuid::new_v4(), h.clock.now());
        h.memory.insert_page(page.clone()).await.unwrap();

        let first = {
            let resolver = h.resolver.clone();
            tokio::spawn(async move { resolver.resolve("abandon").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();

        assert_eq!(h.resolver.resolve("abandon").await, Ok(Some(page)));
        assert_eq!(h.store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inactive_page_resolves_but_is_not_cached() {
        let h = harness(false);
        let mut page = Page::new("draft", Uuid::new_v4(), h.clock.now());
        page.active = false;
        h.memory.insert_page(page.clone()).await.unwrap();

        assert_eq!(h.resolver.resolve("draft").await, Ok(Some(page)));
        assert!(h.resolver.lookup().get_page_from_cache("draft").await.is_none());
    }
}
