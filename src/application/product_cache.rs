//! Read-through cache of catalog entries with a fixed time-to-live.
//!
//! Expiry is checked lazily on read. Concurrent misses for the same key are
//! not coalesced; each caller loads from the store and the last `put` wins.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::domain::catalog::Product;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    product: Product,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ProductCache {
    ttl: Duration,
    max_entries: Option<usize>,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ProductCache {
    /// An unbounded cache; entries only leave when they are overwritten.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A cache holding at most `max_entries` products. When full, expired
    /// entries are purged first, then the entry closest to expiry is evicted.
    pub fn with_capacity_limit(ttl: Duration, max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ..Self::new(ttl)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, id: i64) -> Option<Product> {
        self.get_at(id, Instant::now())
    }

    pub fn put(&self, id: i64, product: Product) {
        self.put_at(id, product, Instant::now());
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn get_at(&self, id: i64, now: Instant) -> Option<Product> {
        self.entries.read()
            .get(&id)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.product.clone())
    }

    fn put_at(&self, id: i64, product: Product, now: Instant) {
        let mut entries = self.entries.write();
        if let Some(max) = self.max_entries {
            if !entries.contains_key(&id) && entries.len() >= max {
                entries.retain(|_, entry| now < entry.expires_at);
                if entries.len() >= max {
                    let oldest = entries
                        .iter()
                        .min_by_key(|(_, entry)| entry.expires_at)
                        .map(|(key, _)| *key);
                    if let Some(key) = oldest {
                        entries.remove(&key);
                    }
                }
            }
        }
        entries.insert(
            id,
            CacheEntry {
                product,
                expires_at: now + self.ttl,
            },
        );
    }
}
