//! Bounded, thread-safe LRU response store.
//!
//! # Responsibilities
//! - Map cache keys to immutable response payloads
//! - Keep a strict MRU → LRU order, promoting on every hit and every put
//! - Keep the running total of payload sizes within `max_cache_size`
//! - Refuse payloads larger than `max_object_size`
//!
//! # Design Decisions
//! - One mutex covers the index, the recency list, and the size total;
//!   `get` reorders the list, so reads take the same exclusive lock as writes
//! - Payloads are `Bytes`: callers get a reference-counted handle to
//!   immutable data, never a reference into the store itself
//! - Replacement is remove-then-insert so size accounting stays exact

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::lru::{LruList, NodeId};
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Result of a [`CacheStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// A new entry was inserted after evicting `evicted` LRU entries.
    Stored { evicted: usize },
    /// An existing entry for the key was replaced.
    Replaced { evicted: usize },
    /// The payload exceeds the per-object limit; nothing changed.
    TooLarge,
}

/// Counters accumulated since the store was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    list: LruList,
    index: HashMap<String, NodeId>,
    total_size: usize,
    stats: CacheStats,
}

impl CacheState {
    fn remove(&mut self, id: NodeId) -> usize {
        match self.list.remove(id) {
            Some(node) => {
                self.index.remove(&node.key);
                self.total_size -= node.payload.len();
                node.payload.len()
            }
            None => 0,
        }
    }
}

/// The shared response cache.
#[derive(Debug)]
pub struct CacheStore {
    state: Mutex<CacheState>,
    max_cache_size: usize,
    max_object_size: usize,
}

impl CacheStore {
    /// Create an empty store with the given limits.
    pub fn new(max_cache_size: usize, max_object_size: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_cache_size,
            max_object_size,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_cache_size, config.max_object_size)
    }

    pub fn max_cache_size(&self) -> usize {
        self.max_cache_size
    }

    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }

    /// Whether a payload of `size` bytes would be accepted by `put`.
    pub fn is_cacheable(&self, size: usize) -> bool {
        size <= self.max_object_size && size <= self.max_cache_size
    }

    /// Look up `key`, promoting it to most recently used on a hit.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.lock().expect("cache mutex poisoned");

        let found = state.index.get(key).copied();
        let Some(id) = found else {
            state.stats.misses += 1;
            return None;
        };

        state.list.move_to_front(id);
        state.stats.hits += 1;
        state.list.get(id).map(|node| node.payload.clone())
    }

    /// Insert `payload` under `key` as the most recently used entry.
    ///
    /// Oversized payloads are silently refused. An existing entry for the
    /// key is removed first, then LRU entries are evicted until the new
    /// payload fits.
    pub fn put(&self, key: impl Into<String>, payload: Bytes) -> PutOutcome {
        let size = payload.len();
        if !self.is_cacheable(size) {
            metrics::record_cache_rejected();
            return PutOutcome::TooLarge;
        }

        let key = key.into();
        let mut state = self.state.lock().expect("cache mutex poisoned");

        let replaced = match state.index.get(&key).copied() {
            Some(id) => {
                state.remove(id);
                true
            }
            None => false,
        };

        let mut evicted = 0;
        while state.total_size + size > self.max_cache_size {
            let Some(victim) = state.list.back() else {
                break;
            };
            let freed = state.remove(victim);
            evicted += 1;
            tracing::trace!(freed, "cache entry evicted");
        }

        let id = state.list.push_front(key.clone(), payload);
        state.index.insert(key, id);
        state.total_size += size;
        state.stats.insertions += 1;
        state.stats.evictions += evicted as u64;

        let (entries, bytes) = (state.list.len(), state.total_size);
        drop(state);

        metrics::record_cache_usage(entries, bytes);
        if evicted > 0 {
            metrics::record_evictions(evicted);
        }

        if replaced {
            PutOutcome::Replaced { evicted }
        } else {
            PutOutcome::Stored { evicted }
        }
    }

    /// Whether `key` is cached. Does not affect recency.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.lock().expect("cache mutex poisoned");
        state.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("cache mutex poisoned");
        state.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all cached payload sizes in bytes.
    pub fn total_size(&self) -> usize {
        let state = self.state.lock().expect("cache mutex poisoned");
        state.total_size
    }

    /// Snapshot of the cached keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.lock().expect("cache mutex poisoned");
        state.list.iter().map(|node| node.key.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache mutex poisoned");
        state.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn payload(len: usize) -> Bytes {
        Bytes::from(vec![b'x'; len])
    }

    /// Checks every structural invariant under the lock.
    fn assert_consistent(store: &CacheStore) {
        let state = store.state.lock().unwrap();
        let sum: usize = state.list.iter().map(|n| n.payload.len()).sum();
        assert_eq!(sum, state.total_size);
        assert!(state.total_size <= store.max_cache_size);
        assert_eq!(state.list.len(), state.index.len());
        assert_eq!(state.list.iter().count(), state.list.len());
        for node in state.list.iter() {
            assert!(node.payload.len() <= store.max_object_size);
            assert!(state.index.contains_key(&node.key));
        }
    }

    #[test]
    fn miss_then_hit() {
        let store = CacheStore::new(1000, 100);
        assert!(store.get("example.com/").is_none());

        assert_eq!(
            store.put("example.com/", Bytes::from_static(b"HTTP/1.0 200 OK\r\n\r\nhi")),
            PutOutcome::Stored { evicted: 0 }
        );
        assert_eq!(
            store.get("example.com/").unwrap(),
            Bytes::from_static(b"HTTP/1.0 200 OK\r\n\r\nhi")
        );

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[test]
    fn oversize_payload_is_not_cached() {
        let store = CacheStore::new(1000, 100);
        assert_eq!(store.put("big", payload(101)), PutOutcome::TooLarge);
        assert!(store.get("big").is_none());
        assert_eq!(store.total_size(), 0);

        assert_eq!(store.put("edge", payload(100)), PutOutcome::Stored { evicted: 0 });
        assert!(store.contains("edge"));
    }

    #[test]
    fn oversize_put_leaves_existing_entry() {
        let store = CacheStore::new(1000, 100);
        store.put("k", payload(10));
        assert_eq!(store.put("k", payload(500)), PutOutcome::TooLarge);
        assert_eq!(store.get("k").unwrap().len(), 10);
    }

    #[test]
    fn replacement_does_not_double_count() {
        let store = CacheStore::new(1000, 100);
        store.put("a", payload(60));
        store.put("b", payload(30));
        assert_eq!(store.total_size(), 90);

        assert_eq!(store.put("a", payload(40)), PutOutcome::Replaced { evicted: 0 });
        assert_eq!(store.total_size(), 70);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().len(), 40);
        assert_consistent(&store);
    }

    #[test]
    fn replacement_resets_recency() {
        let store = CacheStore::new(1000, 100);
        store.put("a", payload(1));
        store.put("b", payload(1));
        store.put("a", payload(2));
        assert_eq!(store.keys(), ["a", "b"]);
    }

    #[test]
    fn hit_promotes_to_most_recent() {
        let store = CacheStore::new(1000, 100);
        store.put("a", payload(1));
        store.put("b", payload(1));
        store.put("c", payload(1));
        assert_eq!(store.keys(), ["c", "b", "a"]);

        store.get("a");
        assert_eq!(store.keys(), ["a", "c", "b"]);
    }

    #[test]
    fn contains_does_not_promote() {
        let store = CacheStore::new(1000, 100);
        store.put("a", payload(1));
        store.put("b", payload(1));
        assert!(store.contains("a"));
        assert_eq!(store.keys(), ["b", "a"]);
    }

    #[test]
    fn evicts_least_recently_used_first() {
        let store = CacheStore::new(300, 100);
        store.put("a", payload(100));
        store.put("b", payload(100));
        store.put("c", payload(100));

        // Touch "a" so "b" becomes the LRU entry.
        store.get("a");

        assert_eq!(store.put("d", payload(100)), PutOutcome::Stored { evicted: 1 });
        assert!(!store.contains("b"));
        assert!(store.contains("a"));
        assert!(store.contains("c"));
        assert!(store.contains("d"));
        assert_eq!(store.total_size(), 300);
        assert_eq!(store.stats().evictions, 1);
        assert_consistent(&store);
    }

    #[test]
    fn evicts_as_many_as_needed() {
        let store = CacheStore::new(100, 100);
        for i in 0..10 {
            store.put(format!("k{i}"), payload(10));
        }
        assert_eq!(store.total_size(), 100);

        assert_eq!(store.put("big", payload(95)), PutOutcome::Stored { evicted: 10 });
        assert_eq!(store.keys(), ["big"]);
        assert_consistent(&store);
    }

    #[test]
    fn cumulative_inserts_keep_most_recent_entries() {
        let store = CacheStore::new(250, 50);
        for i in 0..20 {
            store.put(format!("k{i}"), payload(50));
        }
        assert_eq!(store.keys(), ["k19", "k18", "k17", "k16", "k15"]);
        for i in 0..15 {
            assert!(store.get(&format!("k{i}")).is_none());
        }
        assert_consistent(&store);
    }

    #[test]
    fn object_limit_is_capped_by_cache_limit() {
        let store = CacheStore::new(50, 100);
        assert_eq!(store.put("k", payload(60)), PutOutcome::TooLarge);
        assert_consistent(&store);
    }

    #[test]
    fn returned_payload_outlives_eviction() {
        let store = CacheStore::new(100, 100);
        store.put("a", Bytes::from_static(b"first"));
        let held = store.get("a").unwrap();

        store.put("b", payload(100));
        assert!(!store.contains("a"));
        assert_eq!(held, Bytes::from_static(b"first"));
    }

    #[test]
    fn random_operations_preserve_invariants() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let store = CacheStore::new(2_000, 300);
        let mut last_hit: Option<String> = None;

        for _ in 0..5_000 {
            let key = format!("host{}/p", rng.usize(0..40));
            if rng.bool() {
                store.put(key, payload(rng.usize(0..400)));
            } else if store.get(&key).is_some() {
                last_hit = Some(key);
            }
            assert_consistent(&store);
            if let Some(hit) = last_hit.take() {
                assert_eq!(store.keys().first(), Some(&hit));
            }
        }
    }

    #[test]
    fn concurrent_disjoint_keys() {
        let store = Arc::new(CacheStore::new(64 * 1024, 1024));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("worker{t}/obj{i}");
                        store.put(key.clone(), Bytes::from(key.clone().into_bytes()));
                        if let Some(bytes) = store.get(&key) {
                            assert_eq!(bytes, key.as_bytes());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_consistent(&store);
        let stats = store.stats();
        assert_eq!(stats.insertions, 8 * 200);
        assert_eq!(stats.insertions - stats.evictions, store.len() as u64);
    }
}
