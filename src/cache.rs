/// Result Cache
///
/// Short-lived memoization of search pages keyed by the canonical
/// serialization of a validated request. Entries older than the TTL are
/// misses. Any engagement mutation drops everything.
///
/// Invalidation bumps a generation number. A search records the generation
/// before it queries the store and only stores its page if no invalidation
/// happened in between, so a page computed before a like cannot be cached
/// after it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::query::Page;

#[derive(Debug)]
struct CachedPage {
    page: Page,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    generation: u64,
    pages: HashMap<String, CachedPage>,
}

#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<Entries>,
}

impl ResultCache {
    /// A zero TTL disables the cache: nothing is stored, every lookup misses
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    // The cache only holds derived data, so a poisoned map is still usable
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh page for `key`, if any
    pub fn get(&self, key: &str) -> Option<Page> {
        if !self.is_enabled() {
            return None;
        }

        let mut entries = self.entries();
        let fresh = entries
            .pages
            .get(key)
            .map(|cached| cached.stored_at.elapsed() < self.ttl);

        match fresh {
            Some(true) => {
                debug!("Cache HIT: {}", key);
                entries.pages.get(key).map(|cached| cached.page.clone())
            }
            Some(false) => {
                debug!("Cache EXPIRED: {}", key);
                entries.pages.remove(key);
                None
            }
            None => {
                debug!("Cache MISS: {}", key);
                None
            }
        }
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.entries().generation
    }

    /// Store `page` unless the cache was invalidated since `generation`.
    /// Returns whether the page was stored.
    pub fn insert(&self, key: String, page: Page, generation: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let mut entries = self.entries();
        if entries.generation != generation {
            debug!("Cache SKIP (stale generation): {}", key);
            return false;
        }

        let ttl = self.ttl;
        entries.pages.retain(|_, cached| cached.stored_at.elapsed() < ttl);
        entries.pages.insert(
            key,
            CachedPage {
                page,
                stored_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        let mut entries = self.entries();
        entries.generation += 1;
        if !entries.pages.is_empty() {
            debug!("Cache invalidated ({} entries)", entries.pages.len());
            entries.pages.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
