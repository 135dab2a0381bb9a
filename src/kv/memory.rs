//! In-Memory KV Backend
//!
//! HashMap storage with recency tracking and clock-driven TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::kv::{KeyValueCache, KvEntry, KvError, RecencyIndex, MAX_KEY_LENGTH, MAX_VALUE_SIZE};

// == KV Counters ==
/// Backend performance counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct KvCounters {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads for missing or lapsed keys
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    /// Entries currently held (lapsed ones included until purged)
    pub total_entries: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, KvEntry>,
    recency: RecencyIndex,
    counters: KvCounters,
}

impl Inner {
    fn drop_key(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.remove(key);
        self.counters.total_entries = self.entries.len();
    }
}

// == Memory KV ==
/// Process-local [`KeyValueCache`] with TTL and LRU eviction.
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct MemoryKv {
    inner: Arc<RwLock<Inner>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryKv {
    // == Constructor ==
    /// Creates an empty cache holding at most `max_entries` keys.
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            clock,
            max_entries: max_entries.max(1),
        }
    }

    // == Purge Expired ==
    /// Removes every lapsed entry and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.write().await;

        let lapsed: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &lapsed {
            inner.drop_key(key);
        }
        lapsed.len()
    }

    // == Remaining TTL ==
    /// Remaining lifetime of a live key in milliseconds.
    ///
    /// Outer `None` means the key is absent or lapsed; inner `None` means it
    /// has no TTL.
    pub async fn ttl_remaining_ms(&self, key: &str) -> Option<Option<i64>> {
        let now = self.clock.now_ms();
        let inner = self.inner.read().await;
        let entry = inner.entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(entry.ttl_remaining_ms(now))
    }

    /// Snapshot of the backend counters.
    pub async fn counters(&self) -> KvCounters {
        let inner = self.inner.read().await;
        let mut counters = inner.counters.clone();
        counters.total_entries = inner.entries.len();
        counters
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueCache for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = self.clock.now_ms();
        // Write lock: reads move the key in the recency index.
        let mut inner = self.inner.write().await;

        let value = match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => None,
            Some(entry) => Some(entry.value.clone()),
            None => {
                inner.counters.misses += 1;
                return Ok(None);
            }
        };

        match value {
            Some(value) => {
                inner.counters.hits += 1;
                inner.recency.touch(key);
                Ok(Some(value))
            }
            None => {
                inner.drop_key(key);
                inner.counters.misses += 1;
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> Result<(), KvError> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(KvError::Invalid(format!(
                "Key must be between 1 and {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(KvError::Invalid(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let now = self.clock.now_ms();
        let mut inner = self.inner.write().await;

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            match inner.recency.evict_oldest() {
                Some(evicted) => {
                    inner.entries.remove(&evicted);
                    inner.counters.evictions += 1;
                }
                None => {
                    return Err(KvError::Unavailable(
                        "Cache is full and eviction failed".to_string(),
                    ))
                }
            }
        }

        inner
            .entries
            .insert(key.to_string(), KvEntry::new(value, now, ttl_seconds));
        inner.recency.touch(key);
        inner.counters.total_entries = inner.entries.len();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut inner = self.inner.write().await;
        inner.drop_key(key);
        Ok(())
    }

    async fn backend_counters(&self) -> Option<KvCounters> {
        Some(self.counters().await)
    }
}
