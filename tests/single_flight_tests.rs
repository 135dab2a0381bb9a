//! Integration Tests for Request Coalescing
//!
//! Drives many concurrent visitors at cold short ids and checks how often the
//! durable store is actually hit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use page_resolver::{
    api::create_router,
    clock::{Clock, SystemClock},
    expiration::ExpirationSetting,
    kv::{KeyValueCache, KvError, MemoryKv},
    pages::{Page, PageResolver, PageLookupCache, PageVersion, ResolveError, StatsCounter},
    store::{DurableStore, MemoryStore, StoreError},
    AppState,
};
use tokio::sync::Notify;
use tokio_test::assert_ok;
use tower::ServiceExt;
use uuid::Uuid;

// == Test Doubles ==

/// Counts short-id lookups and holds each one until released.
struct GatedStore {
    inner: MemoryStore,
    fetches: AtomicUsize,
    gate: Notify,
    fail: bool,
}

impl GatedStore {
    fn new(inner: MemoryStore, fail: bool) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
            gate: Notify::new(),
            fail,
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for GatedStore {
    async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        self.inner.page_by_id(id).await
    }

    async fn page_by_short_id(&self, short_id: &str) -> Result<Option<Page>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        if self.fail {
            return Err(StoreError::Unavailable("primary is read-only".to_string()));
        }
        self.inner.page_by_short_id(short_id).await
    }

    async fn version(&self, id: Uuid) -> Result<Option<PageVersion>, StoreError> {
        self.inner.version(id).await
    }

    async fn published_versions_with_expiration(&self) -> Result<Vec<PageVersion>, StoreError> {
        self.inner.published_versions_with_expiration().await
    }

    async fn set_version_published(&self, id: Uuid, published: bool) -> Result<bool, StoreError> {
        self.inner.set_version_published(id, published).await
    }

    async fn mark_page_expired(
        &self,
        page_id: Uuid,
        redirect_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Page>, StoreError> {
        self.inner.mark_page_expired(page_id, redirect_url, at).await
    }

    async fn expiration_setting(&self, id: Uuid) -> Result<Option<ExpirationSetting>, StoreError> {
        self.inner.expiration_setting(id).await
    }

    async fn insert_expiration_setting(
        &self,
        setting: ExpirationSetting,
    ) -> Result<(), StoreError> {
        self.inner.insert_expiration_setting(setting).await
    }

    async fn update_expiration_setting(
        &self,
        setting: ExpirationSetting,
    ) -> Result<bool, StoreError> {
        self.inner.update_expiration_setting(setting).await
    }

    async fn delete_expiration_setting(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_expiration_setting(id).await
    }

    async fn attach_expiration(
        &self,
        version_id: Uuid,
        setting_id: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        self.inner.attach_expiration(version_id, setting_id).await
    }
}

/// Cache backend that is always down.
struct DownKv;

#[async_trait]
impl KeyValueCache for DownKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Err(KvError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: String, _ttl: Option<u64>) -> Result<(), KvError> {
        Err(KvError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), KvError> {
        Err(KvError::Unavailable("connection refused".to_string()))
    }
}

// == Helpers ==

fn resolver_over(store: Arc<GatedStore>, kv: Arc<dyn KeyValueCache>) -> PageResolver {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    PageResolver::new(
        store,
        PageLookupCache::new(kv.clone(), clock),
        StatsCounter::new(kv),
    )
}

/// Releases the gate once `expected` fetches are parked on it.
async fn release_when_parked(store: &GatedStore, expected: usize) {
    while store.fetches() < expected {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    // Let stragglers reach the in-flight map before the flight lands.
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.gate.notify_waiters();
}

// == Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cold_stampede_hits_store_once() {
    let memory = MemoryStore::new();
    let page = Page::new("launch-day", Uuid::new_v4(), Utc::now());
    memory.insert_page(page.clone()).await.unwrap();
    let store = Arc::new(GatedStore::new(memory, false));
    let kv: Arc<dyn KeyValueCache> = Arc::new(MemoryKv::new(100, Arc::new(SystemClock)));
    let resolver = resolver_over(store.clone(), kv);

    let visitors: Vec<_> = (0..64)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("launch-day").await })
        })
        .collect();

    release_when_parked(&store, 1).await;

    for visitor in visitors {
        let result = assert_ok!(visitor.await);
        assert_eq!(result, Ok(Some(page.clone())));
    }
    assert_eq!(store.fetches(), 1);
    assert_eq!(resolver.inflight_len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stampede_failure_is_shared_then_retried() {
    let store = Arc::new(GatedStore::new(MemoryStore::new(), true));
    let kv: Arc<dyn KeyValueCache> = Arc::new(MemoryKv::new(100, Arc::new(SystemClock)));
    let resolver = resolver_over(store.clone(), kv);

    let visitors: Vec<_> = (0..16)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("broken").await })
        })
        .collect();

    release_when_parked(&store, 1).await;

    for visitor in visitors {
        assert!(matches!(
            visitor.await.unwrap(),
            Err(ResolveError::Store(StoreError::Unavailable(_)))
        ));
    }
    assert_eq!(store.fetches(), 1);
    assert_eq!(resolver.inflight_len(), 0);

    let retry = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("broken").await })
    };
    release_when_parked(&store, 2).await;
    assert!(retry.await.unwrap().is_err());
    assert_eq!(store.fetches(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_ids_fetch_independently() {
    let memory = MemoryStore::new();
    for short_id in ["a", "b", "c"] {
        memory
            .insert_page(Page::new(short_id, Uuid::new_v4(), Utc::now()))
            .await
            .unwrap();
    }
    let store = Arc::new(GatedStore::new(memory, false));
    let kv: Arc<dyn KeyValueCache> = Arc::new(MemoryKv::new(100, Arc::new(SystemClock)));
    let resolver = resolver_over(store.clone(), kv);

    let visitors: Vec<_> = ["a", "b", "c", "a", "b", "c"]
        .into_iter()
        .map(|short_id| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(short_id).await })
        })
        .collect();

    release_when_parked(&store, 3).await;

    for visitor in visitors {
        assert!(visitor.await.unwrap().unwrap().is_some());
    }
    assert_eq!(store.fetches(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cache_outage_still_serves_pages() {
    let memory = MemoryStore::new();
    let page = Page::new("resilient", Uuid::new_v4(), Utc::now());
    memory.insert_page(page.clone()).await.unwrap();
    let store = Arc::new(GatedStore::new(memory, false));
    let resolver = resolver_over(store.clone(), Arc::new(DownKv));

    let visitor = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("resilient").await })
    };
    release_when_parked(&store, 1).await;

    assert_eq!(visitor.await.unwrap(), Ok(Some(page)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_http_stampede_through_router() {
    let memory = MemoryStore::new();
    memory
        .insert_page(Page::new("promo", Uuid::new_v4(), Utc::now()))
        .await
        .unwrap();
    let store = Arc::new(GatedStore::new(memory, false));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let kv = MemoryKv::new(100, clock.clone());
    let router: Router = create_router(AppState::new(store.clone(), Arc::new(kv), clock));

    let requests: Vec<_> = (0..32)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .oneshot(Request::builder().uri("/p/promo").body(Body::empty()).unwrap())
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    release_when_parked(&store, 1).await;

    for request in requests {
        assert_eq!(request.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(store.fetches(), 1);
}
