//! Memoized query results.
//!
//! An entry is valid only for the generation it was computed at. When a
//! delta lands, [`QueryCache::advance`] drops every entry the delta could
//! have changed and re-stamps the rest to the new generation, so staleness
//! is decided structurally. Capacity (LRU) and TTL only bound memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::base::{EditMap, FactId, Generation, Span};
use crate::fact::Category;

use super::query::Query;

/// What a delta changed, in new-generation coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaFootprint {
    pub generation: Generation,
    /// Subjects of every removed and added fact.
    pub spans: Vec<Span>,
    /// Categories that gained or lost facts.
    pub categories: [bool; Category::COUNT],
    /// Offsets moved by this edit.
    pub rebase: Option<EditMap>,
}

impl DeltaFootprint {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn touch(&mut self, span: Span, category: Category) {
        self.spans.push(span);
        self.categories[category.index()] = true;
    }

    /// Whether any fact was added or removed.
    pub fn changed(&self) -> bool {
        !self.spans.is_empty()
    }

    pub fn touches_category(&self, category: Category) -> bool {
        self.categories[category.index()]
    }

    fn touches_span(&self, span: Span) -> bool {
        self.spans
            .iter()
            .any(|s| s.overlaps(span) || (s.is_empty() && span.contains(s.start)))
    }

    /// Whether a cached result for `query` may differ after this delta.
    pub fn invalidates(&self, query: &Query) -> bool {
        if let Some(span) = query.span() {
            if let Some(map) = self.rebase {
                if !map.is_noop() && span.end > map.range.start {
                    return true;
                }
            }
            return self.touches_span(span)
                && query.category().is_none_or(|c| self.touches_category(c));
        }
        match query {
            Query::ByGeneration(_) => self.changed(),
            _ => match query.category() {
                Some(category) => self.touches_category(category),
                None => self.changed(),
            },
        }
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct Entry {
    results: Arc<[FactId]>,
    generation: Generation,
    last_used: AtomicU64,
    inserted: Instant,
}

/// LRU-bounded cache of query results.
///
/// `get` only takes the shared lock; recency is an atomic stamp so readers
/// stay parallel.
#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<FxHashMap<Query, Entry>>,
    capacity: usize,
    ttl: Option<Duration>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            capacity: capacity.max(1),
            ttl: None,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Expire entries older than `ttl` regardless of validity.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a result computed at exactly `generation`.
    pub fn get(&self, query: &Query, generation: Generation) -> Option<Arc<[FactId]>> {
        let entries = self.entries.read();
        let hit = entries.get(query).filter(|entry| {
            entry.generation == generation
                && self.ttl.is_none_or(|ttl| entry.inserted.elapsed() < ttl)
        });
        match hit {
            Some(entry) => {
                entry.last_used.store(self.tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.results))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, query: Query, results: Arc<[FactId]>, generation: Generation) {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&query) {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(q, _)| *q);
            if let Some(victim) = victim {
                entries.remove(&victim);
            }
        }
        entries.insert(
            query,
            Entry {
                results,
                generation,
                last_used: AtomicU64::new(self.tick()),
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every entry whose query region overlaps `span`.
    pub fn invalidate_span(&self, span: Span) {
        self.entries
            .write()
            .retain(|query, _| query.span().is_none_or(|s| !s.overlaps(span)));
    }

    /// Drop every entry computed before `generation`.
    pub fn invalidate_generation(&self, generation: Generation) {
        self.entries
            .write()
            .retain(|_, entry| entry.generation >= generation);
    }

    /// Carry the cache across a delta: invalidated entries are dropped,
    /// entries valid at the previous generation move to the new one.
    pub fn advance(&self, previous: Generation, footprint: &DeltaFootprint) {
        let mut entries = self.entries.write();
        entries.retain(|query, entry| {
            entry.generation == previous && !footprint.invalidates(query)
        });
        for entry in entries.values_mut() {
            entry.generation = footprint.generation;
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
