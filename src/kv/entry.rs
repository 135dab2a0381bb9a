//! KV Entry Module
//!
//! A stored cache value with its absolute expiry.

// == KV Entry ==
/// Represents a single cache value with metadata.
///
/// Timestamps are Unix milliseconds taken from the cache's clock, never from
/// the operating system directly, so tests can move time.
#[derive(Debug, Clone)]
pub struct KvEntry {
    /// The stored value
    pub value: String,
    /// Write timestamp (Unix milliseconds)
    pub written_at: i64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl KvEntry {
    // == Constructor ==
    /// Creates an entry written at `now_ms` with optional TTL in seconds.
    pub fn new(value: String, now_ms: i64, ttl_seconds: Option<u64>) -> Self {
        let expires_at = ttl_seconds.map(|ttl| now_ms.saturating_add((ttl as i64).saturating_mul(1000)));

        Self {
            value,
            written_at: now_ms,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has lapsed at `now_ms`.
    ///
    /// An entry is expired once `now_ms >= expires_at`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self, now_ms: i64) -> Option<i64> {
        self.expires_at.map(|expires| (expires - now_ms).max(0))
    }
}
