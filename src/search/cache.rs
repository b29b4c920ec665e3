//! Query result cache.
//!
//! LRU keyed by normalized query, with each entry stamped with the store's
//! write generation at fetch time. A lookup only counts as a hit when the
//! generation still matches, so a search issued after any write recomputes
//! rather than serving stale rows.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::storage::{Actor, Film};

/// Un-paginated match lists for one normalized query, both columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedHits {
    pub films: Vec<Film>,
    pub actors: Vec<Actor>,
}

struct Entry {
    generation: u64,
    hits: Arc<CachedHits>,
}

pub struct QueryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl QueryCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fresh cached hits for `key`, or `None` on miss or stale entry.
    /// Stale entries are evicted on the spot.
    pub fn get(&self, key: &str, generation: u64) -> Option<Arc<CachedHits>> {
        let mut entries = self.entries.lock();
        let found = entries
            .get(key)
            .map(|entry| (entry.generation, Arc::clone(&entry.hits)));
        match found {
            Some((stamped, hits)) if stamped == generation => {
                debug!(key, "query cache hit");
                Some(hits)
            }
            Some(_) => {
                debug!(key, "query cache entry stale, evicting");
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, generation: u64, hits: CachedHits) -> Arc<CachedHits> {
        let hits = Arc::new(hits);
        self.entries.lock().put(
            key,
            Entry {
                generation,
                hits: Arc::clone(&hits),
            },
        );
        hits
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
