//! Preview cache
//!
//! Bounded, in-memory cache of rendered pages. Entries are evicted least
//! recently used first once capacity is reached, and expire after a fixed
//! time-to-live regardless of use. The cache is purely an optimization:
//! losing it changes performance, never results.
//!
//! Lookup, expiry and eviction all happen under one lock, so a `get` never
//! returns an entry that a concurrent operation is evicting.

use crate::document::Fingerprint;
use crate::options::CacheConfig;
use crate::render::RenderTarget;
use crate::types::RasterResult;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Identifies one render: document content, page and render target
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub page_number: usize,
    pub target: RenderTarget,
}

impl CacheKey {
    pub fn new(fingerprint: Fingerprint, page_number: usize, target: RenderTarget) -> Self {
        Self {
            fingerprint,
            page_number,
            target,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<RasterResult>,
    inserted_at: Instant,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Thread-safe preview cache. Clones share the same storage.
#[derive(Clone)]
pub struct PreviewCache {
    entries: Arc<Mutex<LruCache<CacheKey, CacheEntry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PreviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("PreviewCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl PreviewCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: NonZeroUsize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
            clock,
        }
    }

    /// Build a cache from configuration. A zero capacity is treated as one.
    pub fn from_config(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity, config.ttl())
    }

    /// Look up a render, refreshing its recency.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<RasterResult>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let age = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.value)),
            Some(entry) => now.saturating_duration_since(entry.inserted_at),
            None => return None,
        };

        entries.pop(key);
        log::debug!(
            "Cache entry for page {} of {} expired after {:?}",
            key.page_number,
            key.fingerprint,
            age
        );
        None
    }

    /// Insert or replace a render. When full, expired entries are dropped
    /// first and only then the least recently used live entry.
    pub fn put(&self, key: CacheKey, value: Arc<RasterResult>) {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            inserted_at: now,
            expires_at: now.checked_add(self.ttl),
        };

        let mut entries = self.entries.lock();
        if entries.len() == entries.cap().get() && !entries.contains(&key) {
            let purged = purge(&mut entries, now);
            if purged > 0 {
                log::debug!("Dropped {} expired previews to make room", purged);
            }
        }
        if let Some((evicted, _)) = entries.push(key, entry) {
            if evicted != key {
                log::debug!(
                    "Evicted page {} of {} from preview cache",
                    evicted.page_number,
                    evicted.fingerprint
                );
            }
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        purge(&mut self.entries.lock(), now)
    }

    /// Number of stored entries, including any not yet purged after expiry
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn purge(entries: &mut LruCache<CacheKey, CacheEntry>, now: Instant) -> usize {
    let expired: Vec<CacheKey> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| *key)
        .collect();
    for key in &expired {
        entries.pop(key);
    }
    expired.len()
}
