//! Page Lookup Cache
//!
//! Page-aware facade over the key-value cache: key layout, TTL derived from
//! the page's own expiry, and tolerant reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::kv::{KeyValueCache, KvError};
use crate::pages::codec::{decode_page, encode_page};
use crate::pages::Page;

/// Cache key of a page snapshot.
pub fn page_key(short_id: &str) -> String {
    format!("page:{}", short_id)
}

/// TTL for a cached page at `now`.
///
/// A future `expires_at` gives the remaining whole seconds, rounded up so the
/// entry never outlives the page by less than a second. Anything else caches
/// without TTL.
pub fn page_ttl(page: &Page, now: DateTime<Utc>) -> Option<u64> {
    let expires_at = page.expires_at?;
    let remaining_ms = (expires_at - now).num_milliseconds();
    if remaining_ms <= 0 {
        return None;
    }
    Some(((remaining_ms + 999) / 1000) as u64)
}

// == Page Lookup Cache ==
#[derive(Clone)]
pub struct PageLookupCache {
    kv: Arc<dyn KeyValueCache>,
    clock: Arc<dyn Clock>,
}

impl PageLookupCache {
    pub fn new(kv: Arc<dyn KeyValueCache>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    // == Cache Page ==
    /// Stores a snapshot of an active page. Inactive pages are never cached.
    pub async fn cache_page(&self, page: &Page) -> Result<(), KvError> {
        if !page.active {
            debug!(short_id = %page.short_id, "skipping cache write for inactive page");
            return Ok(());
        }

        let ttl = page_ttl(page, self.clock.now());
        let value = encode_page(page)?;
        self.kv.put(&page_key(&page.short_id), value, ttl).await?;

        debug!(short_id = %page.short_id, ttl = ?ttl, "cached page");
        Ok(())
    }

    // == Get Page From Cache ==
    /// Reads a cached snapshot. Corrupt entries and backend failures are
    /// reported as misses.
    pub async fn get_page_from_cache(&self, short_id: &str) -> Option<Page> {
        match self.kv.get(&page_key(short_id)).await {
            Ok(Some(raw)) => decode_page(&raw),
            Ok(None) => None,
            Err(err) => {
                warn!(short_id, error = %err, "page cache read failed, treating as miss");
                None
            }
        }
    }

    // == Invalidate ==
    /// Drops a cached snapshot. Idempotent.
    pub async fn invalidate_page_cache(&self, short_id: &str) -> Result<(), KvError> {
        self.kv.delete(&page_key(short_id)).await?;
        debug!(short_id, "invalidated page cache");
        Ok(())
    }
}
