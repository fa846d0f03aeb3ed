//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! connection worker
//!     → CacheStore::get(key)      hit: payload handle, entry promoted to MRU
//!     → (miss) origin response assembled by http::response
//!     → CacheStore::put(key, payload)
//!           remove old entry for key
//!           evict from LRU tail until it fits
//!           insert at MRU
//! ```
//!
//! # Design Decisions
//! - The store is a single owned object shared via `Arc`, not process-global state
//! - Hash index plus arena-backed recency list: O(1) lookup, promotion and eviction
//! - Keys are `host ++ path`; scheme and port are not part of the key

pub mod lru;
pub mod store;

pub use store::{CacheStats, CacheStore, PutOutcome};

/// Build the cache key for a request: host followed by path.
pub fn cache_key(host: &str, path: &str) -> String {
    let mut key = String::with_capacity(host.len() + path.len());
    key.push_str(host);
    key.push_str(path);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_host_then_path() {
        assert_eq!(cache_key("example.com", "/a/b"), "example.com/a/b");
        assert_eq!(cache_key("example.com", "/"), "example.com/");
    }
}
