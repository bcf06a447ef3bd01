//! Expiring key/value storage.
//!
//! Each store is an LRU map guarded by one `RwLock`. Entries carry the
//! instant they were stored and become unreadable once the store's TTL has
//! elapsed; expired entries are dropped lazily on read and eagerly by
//! [`CacheStore::purge_expired`].

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const METRIC_HIT: &str = "kurohelper_cache_hit_total";
const METRIC_MISS: &str = "kurohelper_cache_miss_total";
const METRIC_EXPIRED: &str = "kurohelper_cache_expired_total";
const METRIC_EVICT: &str = "kurohelper_cache_evict_total";

/// Why a lookup found nothing.
///
/// A miss is the expected outcome for first-time lookups and cold sessions;
/// it is a control-flow signal, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheMiss {
    #[error("no entry for key")]
    Absent,
    #[error("entry outlived its ttl")]
    Expired,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= ttl
    }
}

/// Something the expiry sweeper can purge.
pub trait Expiring: Send + Sync {
    fn name(&self) -> &'static str;

    /// Drop every expired entry, returning how many were removed.
    fn purge_expired(&self) -> usize;
}

/// Generic TTL cache with LRU capacity bound.
///
/// Readers receive clones; wrap large values in `Arc` to share them.
pub struct CacheStore<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<LruCache<K, CacheEntry<V>>>,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the stored value if present and not expired.
    pub fn get<Q>(&self, key: &Q) -> Result<V, CacheMiss>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, self.name, "get");

        match entries.get(key) {
            None => {
                counter!(METRIC_MISS, "store" => self.name).increment(1);
                return Err(CacheMiss::Absent);
            }
            Some(entry) if !entry.is_expired(self.ttl, now) => {
                counter!(METRIC_HIT, "store" => self.name).increment(1);
                return Ok(entry.value.clone());
            }
            Some(_) => {}
        }

        entries.pop(key);
        counter!(METRIC_EXPIRED, "store" => self.name).increment(1);
        Err(CacheMiss::Expired)
    }

    /// Insert or overwrite, restarting the TTL clock for `key`.
    pub fn set(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        let probe = key.clone();
        let displaced = rw_write(&self.entries, self.name, "set").push(key, entry);
        if let Some((displaced_key, _)) = displaced
            && displaced_key != probe
        {
            counter!(METRIC_EVICT, "store" => self.name).increment(1);
        }
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, self.name, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Expiring for CacheStore<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, self.name, "purge_expired");
        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn store(ttl: Duration, capacity: usize) -> CacheStore<String, Arc<Vec<u32>>> {
        CacheStore::new(
            "test",
            ttl,
            NonZeroUsize::new(capacity).expect("non-zero capacity"),
        )
    }

    #[test]
    fn miss_then_set_then_hit() {
        let store = store(Duration::from_secs(60), 8);

        assert_eq!(store.get("foo"), Err(CacheMiss::Absent));

        let value = Arc::new(vec![1, 2, 3]);
        store.set("foo".to_string(), Arc::clone(&value));

        let cached = store.get("foo").expect("cached value");
        assert_eq!(cached, value);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = store(Duration::from_secs(60), 8);
        store.set("foo".to_string(), Arc::new(vec![1]));
        store.set("foo".to_string(), Arc::new(vec![2]));

        assert_eq!(store.get("foo").expect("cached"), Arc::new(vec![2]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn entries_are_absent_after_ttl() {
        let store = store(Duration::ZERO, 8);
        store.set("foo".to_string(), Arc::new(vec![1]));

        assert_eq!(store.get("foo"), Err(CacheMiss::Expired));
        // Lazily dropped on the expired read.
        assert_eq!(store.get("foo"), Err(CacheMiss::Absent));
        assert!(store.is_empty());
    }

    #[test]
    fn short_ttl_expires_after_sleep() {
        let store = store(Duration::from_millis(20), 8);
        store.set("foo".to_string(), Arc::new(vec![1]));
        assert!(store.get("foo").is_ok());

        thread::sleep(Duration::from_millis(40));
        assert_eq!(store.get("foo"), Err(CacheMiss::Expired));
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let expiring = store(Duration::ZERO, 8);
        expiring.set("a".to_string(), Arc::new(vec![]));
        expiring.set("b".to_string(), Arc::new(vec![]));
        assert_eq!(expiring.purge_expired(), 2);
        assert!(expiring.is_empty());

        let fresh = store(Duration::from_secs(60), 8);
        fresh.set("a".to_string(), Arc::new(vec![]));
        assert_eq!(fresh.purge_expired(), 0);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let store = store(Duration::from_secs(60), 2);
        store.set("a".to_string(), Arc::new(vec![1]));
        store.set("b".to_string(), Arc::new(vec![2]));

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(store.get("a").is_ok());
        store.set("c".to_string(), Arc::new(vec![3]));

        assert!(store.get("a").is_ok());
        assert_eq!(store.get("b"), Err(CacheMiss::Absent));
        assert!(store.get("c").is_ok());
    }

    #[test]
    fn concurrent_readers_and_writers_see_whole_values() {
        let store = Arc::new(store(Duration::from_secs(60), 64));
        let handles: Vec<_> = (0..8u32)
            .map(|worker| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for round in 0..200u32 {
                        let value = Arc::new(vec![worker, round, worker ^ round]);
                        store.set("shared".to_string(), value);
                        if let Ok(seen) = store.get("shared") {
                            assert_eq!(seen.len(), 3);
                            assert_eq!(seen[2], seen[0] ^ seen[1]);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker finished");
        }
        assert!(store.get("shared").is_ok());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = store(Duration::from_secs(60), 8);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set("foo".to_string(), Arc::new(vec![7]));
        assert_eq!(store.get("foo").expect("cached"), Arc::new(vec![7]));
    }
}
