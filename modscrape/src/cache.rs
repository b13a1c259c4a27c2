//! Memoization of fetch + parse results, keyed by URL.
//!
//! Settled values live in a fixed-capacity LRU. A key whose computation is
//! still running lives in a separate pending map, so it can neither be
//! evicted nor take a settled value's place. Concurrent callers for a pending
//! key wait on the one running computation. A failed computation leaves
//! nothing behind, so the next caller retries.

use std::{
    collections::HashMap,
    convert::Infallible,
    fmt,
    future::Future,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use lru::LruCache;
use tokio::sync::OnceCell;

use crate::config::DEFAULT_CACHE_CAPACITY;

type Pending<V> = Arc<OnceCell<V>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} entries, {} hits, {} misses",
            self.len, self.capacity, self.hits, self.misses
        )
    }
}

struct Slots<V> {
    settled: LruCache<String, V>,
    pending: HashMap<String, Pending<V>>,
}

/// Where a lookup found its key.
enum Lookup<V> {
    Settled(V),
    Pending(Pending<V>),
}

/// Fixed-capacity, least-recently-used, single-flight cache.
pub struct ResponseCache<V> {
    slots: Mutex<Slots<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for ResponseCache<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<V> ResponseCache<V>
where
    V: Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(Slots {
                settled: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached value for `key`, running `compute` only if no value
    /// has settled yet and no other caller is already computing it.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let value = self
            .get_or_try_compute(key, move || async move { Ok::<_, Infallible>(compute().await) })
            .await;
        match value {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`Self::get_or_compute`]. Errors are returned to the
    /// caller that ran the computation and are never cached.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let pending = match self.lookup(key) {
            Lookup::Settled(value) => {
                self.record(false);
                return Ok(value);
            }
            Lookup::Pending(pending) => pending,
        };

        let mut computed = false;
        let result = pending
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .await
            .cloned();
        self.record(computed);

        match result {
            Ok(value) => {
                if computed {
                    self.settle(key, &pending, value.clone());
                }
                Ok(value)
            }
            Err(err) => {
                self.abandon(key, &pending);
                Err(err)
            }
        }
    }

    /// Settled value for `key`, if any. Does not affect recency.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.lock().settled.peek(key).cloned()
    }

    /// Whether `key` holds a settled value. Does not affect recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().settled.contains(key)
    }

    /// Number of settled values.
    pub fn len(&self) -> usize {
        self.lock().settled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().settled.is_empty()
    }

    /// Drops every settled value. Running computations still settle.
    pub fn clear(&self) {
        self.lock().settled.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.lock();
        CacheStats {
            len: slots.settled.len(),
            capacity: slots.settled.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, key: &str) -> Lookup<V> {
        let mut slots = self.lock();
        if let Some(value) = slots.settled.get(key) {
            return Lookup::Settled(value.clone());
        }
        let pending = slots.pending.entry(key.to_string()).or_default();
        Lookup::Pending(Arc::clone(pending))
    }

    /// Moves a finished computation from the pending map into the LRU.
    fn settle(&self, key: &str, pending: &Pending<V>, value: V) {
        let mut slots = self.lock();
        if slots
            .pending
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, pending))
        {
            slots.pending.remove(key);
        }
        if let Some((evicted, _)) = slots.settled.push(key.to_string(), value) {
            if evicted != key {
                log::debug!("cache evicted: {}", evicted);
            }
        }
    }

    /// Forgets a failed computation once no other caller is waiting on it.
    /// Waiters retry on the same cell, so it must stay reachable until the
    /// last of them gives up.
    fn abandon(&self, key: &str, pending: &Pending<V>) {
        let mut slots = self.lock();
        let Some(current) = slots.pending.get(key) else {
            return;
        };
        // One reference is the map's, one is ours.
        if Arc::ptr_eq(current, pending) && Arc::strong_count(pending) <= 2 && !pending.initialized() {
            slots.pending.remove(key);
        }
    }

    fn record(&self, computed: bool) {
        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
