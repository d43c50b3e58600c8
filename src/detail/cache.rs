//! LRU cache of per-boundary parse results.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHasher};

use crate::base::{EditMap, Span};
use crate::fact::FactDraft;
use crate::grammar::own_tokens;
use crate::lexer::Token;
use crate::structure::{ParseBoundary, StructuralDelta};

/// Cache key: where the boundary is and what it contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryKey {
    pub span: Span,
    pub hash: u64,
}

/// Hash everything a boundary parse depends on: its own tokens and the
/// shape of its holes (both relative to the boundary start), its kind and
/// its depth budget.
pub fn content_hash(
    boundary: &ParseBoundary,
    tokens: &[Token],
    holes: &[Span],
    source: &str,
    limit: u32,
) -> u64 {
    let base = boundary.span.start;
    let mut h = FxHasher::default();
    boundary.kind.hash(&mut h);
    limit.hash(&mut h);
    for token in own_tokens(tokens, holes) {
        (token.span.start - base).hash(&mut h);
        token.kind.hash(&mut h);
        token.text(source).hash(&mut h);
    }
    for hole in holes {
        (hole.start - base, hole.end - base).hash(&mut h);
    }
    h.finish()
}

/// Drafts are stored relative to the boundary start so a hit can be
/// replayed wherever the key's span currently is.
#[derive(Debug)]
pub struct BoundaryCache {
    entries: IndexMap<BoundaryKey, Arc<[FactDraft]>, FxBuildHasher>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl BoundaryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_hasher(FxBuildHasher),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Look up `key` and mark it most recently used. Returned drafts are in
    /// absolute coordinates.
    pub fn get(&mut self, key: &BoundaryKey) -> Option<Vec<FactDraft>> {
        let Some(index) = self.entries.get_index_of(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        let drafts = &self.entries[last];
        Some(shifted(drafts, key.span.start as i64))
    }

    pub fn put(&mut self, key: BoundaryKey, drafts: &[FactDraft]) {
        if self.capacity == 0 {
            return;
        }
        let relative: Arc<[FactDraft]> = shifted(drafts, -(key.span.start as i64)).into();
        self.entries.shift_remove(&key);
        self.entries.insert(key, relative);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    /// Drop the entries of boundaries a structural delta removed. Must run
    /// before [`BoundaryCache::rebase`] with the same delta.
    pub fn invalidate(&mut self, delta: &StructuralDelta) {
        if delta.removed.is_empty() {
            return;
        }
        self.entries
            .retain(|key, _| !delta.removed.iter().any(|b| b.span == key.span));
    }

    /// Move every key into the coordinates after `map`.
    pub fn rebase(&mut self, map: &EditMap) {
        if map.is_noop() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .map(|(key, drafts)| {
                (
                    BoundaryKey {
                        span: map.map_span(key.span),
                        hash: key.hash,
                    },
                    drafts,
                )
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn shifted(drafts: &[FactDraft], by: i64) -> Vec<FactDraft> {
    let shift = |offset: u32| (offset as i64 + by).max(0) as u32;
    drafts
        .iter()
        .map(|d| FactDraft {
            subject: Span::new(shift(d.subject.start), shift(d.subject.end)),
            ..d.clone()
        })
        .collect()
}
