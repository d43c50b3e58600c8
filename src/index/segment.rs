//! Per-category storage shard.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::base::{EditMap, FactId, Generation, Span};
use crate::fact::Fact;

/// Key of the spatial order: subject start, subject end, id.
pub(crate) type SpatialKey = (u32, u32, FactId);

/// One category's facts with their secondary indexes.
///
/// Segments are shared between snapshots behind an `Arc` and cloned only
/// when a delta writes to them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Segment {
    facts: FxHashMap<FactId, Fact>,
    spatial: BTreeSet<SpatialKey>,
    by_generation: BTreeSet<(Generation, FactId)>,
    children: FxHashMap<FactId, Vec<FactId>>,
    // Upper bound on subject length; bounds the backwards scan of overlap
    // queries. Never shrinks.
    max_len: u32,
}

#[inline]
fn key(fact: &Fact) -> SpatialKey {
    let s = fact.subject();
    (s.start, s.end, fact.id())
}

impl Segment {
    pub(crate) fn len(&self) -> usize {
        self.facts.len()
    }

    pub(crate) fn get(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    pub(crate) fn contains(&self, id: FactId) -> bool {
        self.facts.contains_key(&id)
    }

    pub(crate) fn insert(&mut self, fact: Fact) {
        let id = fact.id();
        self.max_len = self.max_len.max(fact.subject().len());
        self.spatial.insert(key(&fact));
        self.by_generation.insert((fact.generation(), id));
        if let Some(parent) = fact.parent() {
            self.children.entry(parent).or_default().push(id);
        }
        self.facts.insert(id, fact);
    }

    pub(crate) fn remove(&mut self, id: FactId) -> Option<Fact> {
        let fact = self.facts.remove(&id)?;
        self.spatial.remove(&key(&fact));
        self.by_generation.remove(&(fact.generation(), id));
        if let Some(parent) = fact.parent() {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|&c| c != id);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        Some(fact)
    }

    /// Ids of the facts whose subject changes under `map`. Facts too short
    /// to reach the edit are never visited.
    pub(crate) fn moved_by(&self, map: &EditMap) -> Vec<FactId> {
        let lo = map.range.start.saturating_sub(self.max_len);
        self.spatial
            .range((lo, 0, FactId(0))..)
            .filter(|&&(start, end, _)| {
                let subject = Span::new(start, end);
                map.map_span(subject) != subject
            })
            .map(|&(_, _, id)| id)
            .collect()
    }

    /// Move the facts in `moved` into the coordinates after `map`.
    pub(crate) fn rebase(&mut self, moved: &[FactId], map: &EditMap) {
        for id in moved {
            if let Some(fact) = self.facts.get_mut(id) {
                self.spatial.remove(&key(fact));
                *fact = fact.rebased(map);
                self.max_len = self.max_len.max(fact.subject().len());
                self.spatial.insert(key(fact));
            }
        }
    }

    /// Spatial keys of facts whose subject strictly overlaps `span`.
    pub(crate) fn overlapping(&self, span: Span, out: &mut Vec<SpatialKey>) {
        if span.is_empty() {
            return;
        }
        let lo = span.start.saturating_sub(self.max_len);
        let candidates = self
            .spatial
            .range((lo, 0, FactId(0))..(span.end, 0, FactId(0)));
        out.extend(
            candidates
                .filter(|&&(start, end, _)| Span::new(start, end).overlaps(span))
                .copied(),
        );
    }

    /// Spatial keys of facts whose subject contains `offset`.
    pub(crate) fn containing(&self, offset: u32, out: &mut Vec<SpatialKey>) {
        let lo = offset.saturating_sub(self.max_len);
        let candidates = self
            .spatial
            .range((lo, 0, FactId(0))..=(offset, u32::MAX, FactId(u64::MAX)));
        out.extend(
            candidates
                .filter(|&&(start, end, _)| Span::new(start, end).contains(offset))
                .copied(),
        );
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &SpatialKey> {
        self.spatial.iter()
    }

    pub(crate) fn with_generation(&self, generation: Generation) -> impl Iterator<Item = FactId> + '_ {
        self.by_generation
            .range((generation, FactId(0))..=(generation, FactId(u64::MAX)))
            .map(|&(_, id)| id)
    }

    pub(crate) fn children_of(&self, parent: FactId) -> &[FactId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }
}
