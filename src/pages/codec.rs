//! Cache Entry Codec
//!
//! JSON encoding of pages and stats for the key-value cache. Decoding never
//! fails loudly: a value that does not parse is reported as absent.

use tracing::warn;

use crate::kv::KvError;
use crate::pages::{Page, PageStats};

/// Serializes a page snapshot.
pub fn encode_page(page: &Page) -> Result<String, KvError> {
    serde_json::to_string(page).map_err(|e| KvError::Invalid(e.to_string()))
}

/// Parses a page snapshot, `None` if the value is corrupt.
pub fn decode_page(raw: &str) -> Option<Page> {
    match serde_json::from_str(raw) {
        Ok(page) => Some(page),
        Err(err) => {
            warn!(error = %err, "discarding corrupt page cache entry");
            None
        }
    }
}

/// Serializes a stats record.
pub fn encode_stats(stats: &PageStats) -> Result<String, KvError> {
    serde_json::to_string(stats).map_err(|e| KvError::Invalid(e.to_string()))
}

/// Parses a stats record, `None` if the value is corrupt.
pub fn decode_stats(raw: &str) -> Option<PageStats> {
    match serde_json::from_str(raw) {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!(error = %err, "discarding corrupt stats cache entry");
            None
        }
    }
}
