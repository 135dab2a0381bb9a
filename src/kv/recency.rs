//! Recency Index Module
//!
//! Least-recently-used ordering for cache eviction.

use std::collections::{BTreeMap, HashMap};

// == Recency Index ==
/// Orders keys by last access.
///
/// Every touch stamps the key with a fresh monotonically increasing tick;
/// the smallest tick is the least recently used key.
#[derive(Debug, Default)]
pub struct RecencyIndex {
    tick: u64,
    by_key: HashMap<String, u64>,
    by_tick: BTreeMap<u64, String>,
}

impl RecencyIndex {
    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        self.tick += 1;
        if let Some(old) = self.by_key.insert(key.to_string(), self.tick) {
            self.by_tick.remove(&old);
        }
        self.by_tick.insert(self.tick, key.to_string());
    }

    // == Remove ==
    /// Forgets a key.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.by_key.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_tick.pop_first()?;
        self.by_key.remove(&key);
        Some(key)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.by_key.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
