//! Key-Value Cache Module
//!
//! The string-keyed cache sitting in front of the durable store. Backends
//! implement [`KeyValueCache`]; [`MemoryKv`] is the in-process backend with
//! TTL expiration and LRU eviction.

mod entry;
mod memory;
mod recency;

use async_trait::async_trait;
use thiserror::Error;

pub(crate) use entry::KvEntry;
pub use memory::{KvCounters, MemoryKv};
pub(crate) use recency::RecencyIndex;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Backend Error ==
/// Failure reported by a cache backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    /// Key or value rejected by the backend
    #[error("Invalid cache write: {0}")]
    Invalid(String),

    /// Backend could not be reached or failed internally
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

// == Key-Value Cache Trait ==
/// Minimal get/put/delete contract of a cache backend.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Reads a key. Expired or missing keys yield `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Writes a key, replacing any previous value and TTL.
    ///
    /// `ttl_seconds = None` stores the value until it is deleted or evicted.
    async fn put(&self, key: &str, value: String, ttl_seconds: Option<u64>)
        -> Result<(), KvError>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Hit/miss/eviction counters, if the backend keeps any.
    async fn backend_counters(&self) -> Option<KvCounters> {
        None
    }
}
