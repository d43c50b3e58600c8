//! Fact Index: the primary store of live facts.
//!
//! ## Layout
//!
//! ```text
//! FactIndex
//!   current: Arc<IndexSnapshot>        ← swapped atomically per delta
//!     segments[category]: Arc<Segment> ← copy-on-write, one per category
//!       facts      id → Fact
//!       spatial    (start, end, id), ordered
//!       generation (generation, id)
//!       children   parent id → child ids
//! ```
//!
//! Readers take a snapshot (an `Arc` clone) and query it without holding
//! any lock, so a query at generation G sees G even while a writer builds
//! G+1. Writers serialize on a mutex; a delta clones only the segments it
//! writes to.

mod cache;
mod query;
mod segment;

pub use cache::{CacheStats, DeltaFootprint, QueryCache};
pub use query::{FactFilter, Query};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::base::{FactId, Generation, IdAllocator, Span};
use crate::fact::{Category, Fact, FactDelta};

use segment::{Segment, SpatialKey};

/// Violations of the index invariants. These are defects in the caller,
/// never consequences of malformed source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("fact {0} is already live in the index")]
    DuplicateId(FactId),
    #[error("fact {0} is not live in the index")]
    UnknownFact(FactId),
    #[error("fact {0} was never issued by the id allocator")]
    NeverInserted(FactId),
    #[error("fact {id} has generation {fact} newer than its delta's generation {delta}")]
    FutureGeneration {
        id: FactId,
        fact: Generation,
        delta: Generation,
    },
    #[error("delta for generation {delta} arrived after the index reached {current}")]
    StaleGeneration { delta: Generation, current: Generation },
}

/// An immutable view of the index at one generation.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    generation: Generation,
    segments: [Arc<Segment>; Category::COUNT],
}

impl IndexSnapshot {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn segment_of(&self, id: FactId) -> Option<&Segment> {
        self.segments.iter().map(Arc::as_ref).find(|s| s.contains(id))
    }

    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.segments.iter().find_map(|s| s.get(id))
    }

    pub fn contains(&self, id: FactId) -> bool {
        self.segment_of(id).is_some()
    }

    /// Facts whose subject strictly overlaps `span`, ordered by subject
    /// start, then end, then id.
    pub fn find_overlapping(&self, span: Span) -> Vec<FactId> {
        let mut keys = Vec::new();
        for segment in &self.segments {
            segment.overlapping(span, &mut keys);
        }
        sorted_ids(keys)
    }

    /// Facts whose subject contains `offset`, outermost first.
    pub fn find_containing(&self, offset: u32) -> Vec<FactId> {
        let mut keys = Vec::new();
        for segment in &self.segments {
            segment.containing(offset, &mut keys);
        }
        keys.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
        keys.into_iter().map(|k| k.2).collect()
    }

    pub fn find_by_category(&self, category: Category) -> Vec<FactId> {
        self.segments[category.index()].all().map(|k| k.2).collect()
    }

    pub fn find_by_generation(&self, generation: Generation) -> Vec<FactId> {
        let mut keys: Vec<SpatialKey> = self
            .segments
            .iter()
            .flat_map(|s| {
                s.with_generation(generation).filter_map(move |id| {
                    s.get(id).map(|f| (f.subject().start, f.subject().end, id))
                })
            })
            .collect();
        keys.sort_unstable();
        keys.into_iter().map(|k| k.2).collect()
    }

    /// Direct children of `id` across all categories, in subject order.
    pub fn children(&self, id: FactId) -> Vec<FactId> {
        let keys: Vec<SpatialKey> = self
            .segments
            .iter()
            .flat_map(|s| {
                s.children_of(id).iter().filter_map(move |&child| {
                    s.get(child)
                        .map(|f| (f.subject().start, f.subject().end, child))
                })
            })
            .collect();
        sorted_ids(keys)
    }

    pub fn parent(&self, id: FactId) -> Option<FactId> {
        self.get(id)?.parent()
    }

    /// Answer a [`Query`] against this snapshot.
    pub fn query(&self, query: &Query) -> Vec<FactId> {
        match query {
            Query::Overlapping(span) => self.find_overlapping(*span),
            Query::ByCategory(category) => self.find_by_category(*category),
            Query::ByGeneration(generation) => self.find_by_generation(*generation),
            Query::Containing(offset) => self.find_containing(*offset),
            Query::Filter(filter) => {
                let candidates = match (filter.span, filter.category) {
                    (Some(span), Some(category)) => {
                        let mut keys = Vec::new();
                        self.segments[category.index()].overlapping(span, &mut keys);
                        keys.into_iter().map(|k| k.2).collect()
                    }
                    (Some(span), None) => self.find_overlapping(span),
                    (None, Some(category)) => self.find_by_category(category),
                    (None, None) => self.all_ids(),
                };
                candidates
                    .into_iter()
                    .filter(|&id| self.get(id).is_some_and(|f| filter.accepts(f)))
                    .collect()
            }
        }
    }

    /// Every live fact id in subject order.
    pub fn all_ids(&self) -> Vec<FactId> {
        let keys: Vec<SpatialKey> = self
            .segments
            .iter()
            .flat_map(|s| s.all().copied())
            .collect();
        sorted_ids(keys)
    }

    /// Every live fact, in no particular order.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.segments.iter().flat_map(|s| s.facts())
    }

    /// Resolve ids to facts, failing on the first id that is not live.
    pub fn hydrate(&self, ids: &[FactId]) -> Result<Vec<Fact>, IndexError> {
        ids.iter()
            .map(|&id| self.get(id).cloned().ok_or(IndexError::UnknownFact(id)))
            .collect()
    }
}

fn sorted_ids(mut keys: Vec<SpatialKey>) -> Vec<FactId> {
    keys.sort_unstable();
    keys.into_iter().map(|k| k.2).collect()
}

/// The multi-indexed fact store.
#[derive(Debug)]
pub struct FactIndex {
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
    alloc: Arc<IdAllocator>,
}

impl FactIndex {
    pub fn new(alloc: Arc<IdAllocator>) -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            writer: Mutex::new(()),
            alloc,
        }
    }

    /// A consistent view of the current generation.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> Generation {
        self.current.read().generation
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: FactId) -> Option<Fact> {
        self.snapshot().get(id).cloned()
    }

    pub fn find_overlapping(&self, span: Span) -> Vec<FactId> {
        self.snapshot().find_overlapping(span)
    }

    pub fn find_by_category(&self, category: Category) -> Vec<FactId> {
        self.snapshot().find_by_category(category)
    }

    pub fn find_by_generation(&self, generation: Generation) -> Vec<FactId> {
        self.snapshot().find_by_generation(generation)
    }

    pub fn query(&self, query: &Query) -> Vec<FactId> {
        self.snapshot().query(query)
    }

    /// Resolve ids to facts. Ids never issued are reported as
    /// [`IndexError::NeverInserted`], retracted ones as
    /// [`IndexError::UnknownFact`].
    pub fn hydrate(&self, ids: &[FactId]) -> Result<Vec<Fact>, IndexError> {
        let snapshot = self.snapshot();
        ids.iter()
            .map(|&id| match snapshot.get(id) {
                Some(fact) => Ok(fact.clone()),
                None if !self.alloc.issued(id) => Err(IndexError::NeverInserted(id)),
                None => Err(IndexError::UnknownFact(id)),
            })
            .collect()
    }

    /// Insert a single fact at the current generation.
    pub fn insert(&self, fact: Fact) -> Result<(), IndexError> {
        let generation = self.generation().max(fact.generation());
        let mut delta = FactDelta::new(generation);
        delta.added.push(fact);
        self.apply_delta(&delta).map(|_| ())
    }

    /// Retract a single fact. Returns `false` if it was not live.
    pub fn remove(&self, id: FactId) -> bool {
        let _guard = self.writer.lock();
        let current = self.snapshot();
        let Some(category) = current.get(id).map(Fact::category) else {
            return false;
        };
        let mut next = (*current).clone();
        Arc::make_mut(&mut next.segments[category.index()]).remove(id);
        *self.current.write() = Arc::new(next);
        true
    }

    /// Apply a delta atomically: either every change lands and the index
    /// moves to the delta's generation, or nothing changes.
    ///
    /// Concurrent callers are serialized; readers never observe a half
    /// applied delta.
    pub fn apply_delta(&self, delta: &FactDelta) -> Result<DeltaFootprint, IndexError> {
        let _guard = self.writer.lock();
        let current = self.snapshot();
        self.validate(&current, delta)?;

        let mut next = (*current).clone();
        let mut footprint = DeltaFootprint::new(delta.generation.max(current.generation));

        if let Some(map) = delta.rebase.filter(|m| !m.is_noop()) {
            for segment in next.segments.iter_mut() {
                let moved = segment.moved_by(&map);
                if !moved.is_empty() {
                    Arc::make_mut(segment).rebase(&moved, &map);
                }
            }
            footprint.rebase = Some(map);
        }

        for &id in &delta.removed {
            let Some(index) = next.segments.iter().position(|s| s.contains(id)) else {
                continue;
            };
            if let Some(fact) = Arc::make_mut(&mut next.segments[index]).remove(id) {
                footprint.touch(fact.subject(), fact.category());
            }
        }

        for fact in &delta.added {
            footprint.touch(fact.subject(), fact.category());
            Arc::make_mut(&mut next.segments[fact.category().index()]).insert(fact.clone());
        }

        next.generation = footprint.generation;
        tracing::debug!(
            generation = %next.generation,
            removed = delta.removed.len(),
            added = delta.added.len(),
            live = next.len(),
            "applied fact delta"
        );
        *self.current.write() = Arc::new(next);
        Ok(footprint)
    }

    fn validate(&self, current: &IndexSnapshot, delta: &FactDelta) -> Result<(), IndexError> {
        let stale = delta.generation < current.generation
            || (delta.rebase.is_some_and(|m| !m.is_noop())
                && delta.generation <= current.generation);
        if stale {
            return Err(IndexError::StaleGeneration {
                delta: delta.generation,
                current: current.generation,
            });
        }

        let mut removed = FxHashSet::default();
        for &id in &delta.removed {
            if !current.contains(id) || !removed.insert(id) {
                return Err(if self.alloc.issued(id) {
                    IndexError::UnknownFact(id)
                } else {
                    IndexError::NeverInserted(id)
                });
            }
        }

        let mut added = FxHashSet::default();
        for fact in &delta.added {
            let id = fact.id();
            if (current.contains(id) && !removed.contains(&id)) || !added.insert(id) {
                return Err(IndexError::DuplicateId(id));
            }
            if fact.generation() > delta.generation {
                return Err(IndexError::FutureGeneration {
                    id,
                    fact: fact.generation(),
                    delta: delta.generation,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::EditMap;
    use crate::fact::{NodeKind, Predicate, Value};

    fn index() -> (Arc<IdAllocator>, FactIndex) {
        let alloc = Arc::new(IdAllocator::new());
        let index = FactIndex::new(Arc::clone(&alloc));
        (alloc, index)
    }

    fn node(alloc: &IdAllocator, start: u32, end: u32, kind: NodeKind, g: Generation) -> Fact {
        Fact::new(alloc.fact_id(), Span::new(start, end), Predicate::IsNode(kind), g)
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let (alloc, index) = index();
        let fact = node(&alloc, 0, 8, NodeKind::Object, Generation(0));
        index.insert(fact.clone()).unwrap();
        assert_eq!(index.insert(fact.clone()), Err(IndexError::DuplicateId(fact.id())));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_returns_whether_live() {
        let (alloc, index) = index();
        let fact = node(&alloc, 0, 8, NodeKind::Object, Generation(0));
        let id = fact.id();
        index.insert(fact).unwrap();
        assert!(index.remove(id));
        assert!(!index.remove(id));
        assert!(index.get(id).is_none());
    }

    #[test]
    fn test_failed_delta_leaves_index_untouched() {
        let (alloc, index) = index();
        let g = alloc.next_generation();
        let a = node(&alloc, 0, 8, NodeKind::Object, g);
        let mut delta = FactDelta::new(g);
        delta.added.push(a.clone());
        index.apply_delta(&delta).unwrap();

        let g2 = alloc.next_generation();
        let mut bad = FactDelta::new(g2);
        bad.added.push(node(&alloc, 1, 4, NodeKind::Key, g2));
        bad.added.push(a.clone());
        assert_eq!(index.apply_delta(&bad), Err(IndexError::DuplicateId(a.id())));
        assert_eq!(index.len(), 1);
        assert_eq!(index.generation(), g);
    }

    #[test]
    fn test_unknown_and_never_inserted_are_distinct() {
        let (alloc, index) = index();
        let issued = alloc.fact_id();
        let g = alloc.next_generation();
        let mut delta = FactDelta::new(g);
        delta.removed.push(issued);
        assert_eq!(index.apply_delta(&delta), Err(IndexError::UnknownFact(issued)));

        let mut delta = FactDelta::new(g);
        delta.removed.push(FactId(9_999));
        assert_eq!(
            index.apply_delta(&delta),
            Err(IndexError::NeverInserted(FactId(9_999)))
        );
        assert_eq!(
            index.hydrate(&[FactId(9_999)]),
            Err(IndexError::NeverInserted(FactId(9_999)))
        );
    }

    #[test]
    fn test_future_generation_rejected() {
        let (alloc, index) = index();
        let g = alloc.next_generation();
        let mut delta = FactDelta::new(g);
        delta.added.push(node(&alloc, 0, 1, NodeKind::Null, g.next()));
        assert!(matches!(
            index.apply_delta(&delta),
            Err(IndexError::FutureGeneration { .. })
        ));
    }

    #[test]
    fn test_snapshot_is_stable_across_delta() {
        let (alloc, index) = index();
        let g1 = alloc.next_generation();
        let mut delta = FactDelta::new(g1);
        delta.added.push(node(&alloc, 0, 8, NodeKind::Object, g1));
        index.apply_delta(&delta).unwrap();

        let before = index.snapshot();
        let g2 = alloc.next_generation();
        let mut delta = FactDelta::new(g2);
        delta.added.push(node(&alloc, 1, 4, NodeKind::Key, g2));
        index.apply_delta(&delta).unwrap();

        assert_eq!(before.generation(), g1);
        assert_eq!(before.len(), 1);
        assert_eq!(index.snapshot().len(), 2);
        assert_eq!(index.find_by_generation(g2).len(), 1);
    }

    #[test]
    fn test_rebase_moves_survivors() {
        let (alloc, index) = index();
        let g1 = alloc.next_generation();
        let object = node(&alloc, 0, 8, NodeKind::Object, g1);
        let number = node(&alloc, 7, 8, NodeKind::Number, g1).with_object(Value::text("1"));
        let mut delta = FactDelta::new(g1);
        delta.added.extend([object.clone(), number.clone()]);
        index.apply_delta(&delta).unwrap();

        let g2 = alloc.next_generation();
        let mut delta = FactDelta::new(g2);
        delta.rebase = Some(EditMap::new(Span::new(7, 8), 2));
        delta.removed.push(number.id());
        let replacement = node(&alloc, 7, 9, NodeKind::Number, g2).with_object(Value::text("12"));
        delta.added.push(replacement.clone());
        let footprint = index.apply_delta(&delta).unwrap();

        let moved = index.get(object.id()).unwrap();
        assert_eq!(moved.subject(), Span::new(0, 9));
        assert_eq!(moved.generation(), g1);
        assert_eq!(footprint.spans, vec![Span::new(7, 9), Span::new(7, 9)]);
        assert_eq!(
            index.find_overlapping(Span::new(8, 9)),
            vec![object.id(), replacement.id()]
        );
    }

    #[test]
    fn test_rebase_shares_segments_before_the_edit() {
        let (alloc, index) = index();
        let g1 = alloc.next_generation();
        let lexical = Fact::new(alloc.fact_id(), Span::new(0, 2), Predicate::LexError, g1);
        let object = node(&alloc, 10, 20, NodeKind::Object, g1);
        let mut delta = FactDelta::new(g1);
        delta.added.extend([lexical.clone(), object.clone()]);
        index.apply_delta(&delta).unwrap();
        let before = index.snapshot();

        let g2 = alloc.next_generation();
        let mut delta = FactDelta::new(g2);
        delta.rebase = Some(EditMap::new(Span::empty(5), 3));
        index.apply_delta(&delta).unwrap();
        let after = index.snapshot();

        let lexical_segment = Category::Lexical.index();
        let syntactic_segment = Category::Syntactic.index();
        assert!(Arc::ptr_eq(
            &before.segments[lexical_segment],
            &after.segments[lexical_segment]
        ));
        assert!(!Arc::ptr_eq(
            &before.segments[syntactic_segment],
            &after.segments[syntactic_segment]
        ));
        assert_eq!(after.get(object.id()).unwrap().subject(), Span::new(13, 23));
        assert_eq!(after.get(lexical.id()).unwrap().subject(), Span::new(0, 2));
    }

    #[test]
    fn test_children_and_filter_queries() {
        let (alloc, index) = index();
        let g = alloc.next_generation();
        let object = node(&alloc, 0, 8, NodeKind::Object, g);
        let key = node(&alloc, 1, 4, NodeKind::Key, g).with_parent(object.id());
        let guess = node(&alloc, 5, 8, NodeKind::Unknown, g)
            .with_parent(object.id())
            .with_confidence(0.3);
        let mut delta = FactDelta::new(g);
        delta.added.extend([object.clone(), key.clone(), guess.clone()]);
        index.apply_delta(&delta).unwrap();

        let snapshot = index.snapshot();
        assert_eq!(snapshot.children(object.id()), vec![key.id(), guess.id()]);
        assert_eq!(snapshot.parent(key.id()), Some(object.id()));

        let certain = Query::Filter(
            FactFilter::new()
                .span(Span::new(0, 8))
                .category(Category::Syntactic)
                .certain_only(),
        );
        assert_eq!(snapshot.query(&certain), vec![object.id(), key.id()]);
        assert_eq!(snapshot.find_containing(2), vec![object.id(), key.id()]);
    }
}
