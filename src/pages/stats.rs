//! Stats Counter
//!
//! View and conversion counters kept in the key-value cache.
//!
//! Increments are a plain read-modify-write: two concurrent increments of the
//! same page can lose one update. Counts are approximate.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::kv::{KeyValueCache, KvError};
use crate::pages::codec::{decode_stats, encode_stats};
use crate::pages::PageStats;

/// Cache key of a page's stats record.
pub fn stats_key(page_id: Uuid) -> String {
    format!("stats:{}", page_id)
}

#[derive(Clone)]
pub struct StatsCounter {
    kv: Arc<dyn KeyValueCache>,
}

impl StatsCounter {
    pub fn new(kv: Arc<dyn KeyValueCache>) -> Self {
        Self { kv }
    }

    /// Adds one view and returns the updated record.
    pub async fn increment_page_views(&self, page_id: Uuid) -> Result<PageStats, KvError> {
        self.update(page_id, PageStats::record_view).await
    }

    /// Adds one conversion and returns the updated record.
    pub async fn increment_conversions(&self, page_id: Uuid) -> Result<PageStats, KvError> {
        self.update(page_id, PageStats::record_conversion).await
    }

    // == Get Page Stats ==
    /// Current stats of a page.
    ///
    /// A page that was never counted yields zeroed stats. `Ok(None)` means the
    /// stored record exists but could not be parsed.
    pub async fn get_page_stats(&self, page_id: Uuid) -> Result<Option<PageStats>, KvError> {
        match self.kv.get(&stats_key(page_id)).await? {
            Some(raw) => Ok(decode_stats(&raw)),
            None => Ok(Some(PageStats::default())),
        }
    }

    async fn update(
        &self,
        page_id: Uuid,
        apply: fn(&mut PageStats),
    ) -> Result<PageStats, KvError> {
        let key = stats_key(page_id);
        let mut stats = match self.kv.get(&key).await? {
            Some(raw) => decode_stats(&raw).unwrap_or_else(|| {
                warn!(%page_id, "resetting corrupt stats record");
                PageStats::default()
            }),
            None => PageStats::default(),
        };

        apply(&mut stats);
        self.kv.put(&key, encode_stats(&stats)?, None).await?;
        Ok(stats)
    }
}
