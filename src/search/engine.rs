//! Substring search over films and actors.
//!
//! A query is normalized once, matched independently against both entity
//! kinds, and each column is paginated on its own page number. The two
//! columns never share state: advancing one page leaves the other column's
//! results and page untouched.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::normalize::normalize;
use crate::search::cache::{CachedHits, QueryCache};
use crate::storage::{Actor, Database, Film};

/// One ordered slice of a result column.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served, after clamping.
    pub page: usize,
    /// Total page count; 1 when there are no matches.
    pub page_count: usize,
    /// Match count before pagination.
    pub total: usize,
}

impl<T> Page<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            page_count: 1,
            total: 0,
        }
    }
}

/// Both result columns for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub films: Page<Film>,
    pub actors: Page<Actor>,
}

impl SearchResult {
    fn empty() -> Self {
        Self {
            films: Page::empty(),
            actors: Page::empty(),
        }
    }
}

/// Flat variant for the non-paginated API surface: each column truncated
/// to the configured cap, page numbers ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatResult {
    pub films: Vec<Film>,
    pub actors: Vec<Actor>,
}

pub struct SearchEngine<'a> {
    db: &'a Database,
    page_size: usize,
    api_limit: usize,
    cache: Option<QueryCache>,
}

impl<'a> SearchEngine<'a> {
    #[must_use]
    pub fn new(db: &'a Database, config: &Config) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| QueryCache::new(config.cache.capacity));
        Self {
            db,
            page_size: config.search.page_size.max(1),
            api_limit: config.search.api_limit.max(1),
            cache,
        }
    }

    /// Interactive search: both columns matched and paginated
    /// independently. A query that normalizes to empty returns an empty
    /// zero-total result without touching storage.
    pub fn search(
        &self,
        raw_query: &str,
        film_page: usize,
        actor_page: usize,
    ) -> Result<SearchResult> {
        let key = normalize(raw_query);
        if key.is_empty() {
            debug!("query normalized to empty, skipping lookup");
            return Ok(SearchResult::empty());
        }

        let hits = self.lookup(&key)?;
        Ok(SearchResult {
            films: paginate(&hits.films, film_page, self.page_size, "films"),
            actors: paginate(&hits.actors, actor_page, self.page_size, "actors"),
        })
    }

    /// API search: flat lists capped per column, no paging.
    pub fn search_flat(&self, raw_query: &str) -> Result<FlatResult> {
        let key = normalize(raw_query);
        if key.is_empty() {
            return Ok(FlatResult {
                films: Vec::new(),
                actors: Vec::new(),
            });
        }

        let hits = self.lookup(&key)?;
        Ok(FlatResult {
            films: hits.films.iter().take(self.api_limit).cloned().collect(),
            actors: hits.actors.iter().take(self.api_limit).cloned().collect(),
        })
    }

    /// Two independent column lookups, cached per normalized key. The
    /// cache entry is stamped with the store's write generation, so a
    /// search after any write refetches.
    fn lookup(&self, key: &str) -> Result<Arc<CachedHits>> {
        let generation = self.db.write_generation();
        if let Some(cache) = &self.cache {
            if let Some(hits) = cache.get(key, generation) {
                return Ok(hits);
            }
        }

        debug!(key, "fetching match lists from store");
        let hits = CachedHits {
            films: self.db.films_matching(key)?,
            actors: self.db.actors_matching(key)?,
        };

        match &self.cache {
            Some(cache) => Ok(cache.insert(key.to_string(), generation, hits)),
            None => Ok(Arc::new(hits)),
        }
    }
}

/// Slice one ordered match list down to the requested page. Out-of-range
/// page numbers clamp to the nearest valid page instead of erroring: 0
/// clamps to the first page, anything past the end to the last.
fn paginate<T: Clone>(items: &[T], requested: usize, page_size: usize, label: &str) -> Page<T> {
    let total = items.len();
    let page_count = total.div_ceil(page_size).max(1);

    let page = if requested == 0 {
        warn!(label, requested, "page number below 1, clamping to first");
        1
    } else if requested > page_count {
        warn!(label, requested, page_count, "page past the end, clamping to last");
        page_count
    } else {
        requested
    };

    let start = (page - 1) * page_size;
    let items = items.iter().skip(start).take(page_size).cloned().collect();

    Page {
        items,
        page,
        page_count,
        total,
    }
}
