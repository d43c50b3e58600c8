//! Layer 2: detailed parser and fact generation.
//!
//! Each boundary is parsed on its own, directly into fact drafts, by the
//! grammar's [`parse_boundary`](crate::grammar::Grammar::parse_boundary).
//! Child boundaries are opaque holes to their parent, so work on disjoint
//! boundaries is independent and runs in parallel.
//!
//! ```text
//!   StructuralDelta ──► dirty boundaries ──► viewport order ──► cache?
//!                                                  │             │ miss
//!                                                  │             ▼
//!                                                  │      parse (rayon) ──► drafts
//!                                                  ▼                          │
//!                                          over budget: placeholder           ▼
//!                                                                       reconcile ──► FactDelta
//! ```
//!
//! Ambiguity never fails a parse. A boundary whose interior matches no
//! production gets one speculative `IsNode(Unknown)` fact and one `HasError`
//! fact in place of its syntax facts.

mod cache;
mod reconcile;

pub use cache::{BoundaryCache, BoundaryKey, content_hash};
pub use reconcile::{Reconciled, reconcile};

use std::sync::Arc;

use indexmap::IndexSet;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::base::{ArenaId, BoundaryId, EditMap, Generation, IdAllocator, Pool, Span};
use crate::fact::{
    DEFERRED_CONFIDENCE, Fact, FactDelta, FactDraft, NodeKind, Predicate, SPECULATIVE_CONFIDENCE,
    TokenClass,
};
use crate::grammar::{Grammar, ParseCx, own_tokens};
use crate::lexer::Token;
use crate::structure::{ParseBoundary, StructuralDelta, token_range};

/// Limits of the detailed parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailLimits {
    /// Nesting budget shared with Layer 1; a boundary at depth `d` may nest
    /// `max_depth - d` levels internally.
    pub max_depth: u32,
    /// Cache misses parsed per call; the rest is deferred.
    pub max_boundaries_per_parse: usize,
    pub cache_capacity: usize,
    pub parallel: bool,
}

impl Default for DetailLimits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_boundaries_per_parse: 512,
            cache_capacity: 1024,
            parallel: true,
        }
    }
}

/// Everything a viewport parse reads. All of it describes the state after
/// the edit being processed.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    pub source: &'a str,
    pub tokens: &'a [Token],
    pub boundaries: &'a [ParseBoundary],
    pub structure: &'a StructuralDelta,
    /// Region of the new text whose tokens changed.
    pub affected: Span,
    pub viewport: Option<Span>,
    pub generation: Generation,
    pub cancel: Option<&'a CancellationToken>,
}

/// Outcome of a viewport parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportParse {
    pub delta: FactDelta,
    /// Boundaries left with placeholder facts.
    pub deferred: Vec<BoundaryId>,
    pub parsed: usize,
    pub cache_hits: usize,
}

/// How one boundary's drafts were obtained.
enum Source {
    Cached(Vec<FactDraft>),
    Parse(BoundaryKey),
    Defer,
}

/// Layer 2 state for one buffer: the facts every boundary currently owns
/// in the index, the boundary cache, and the boundaries still waiting for a
/// real parse.
#[derive(Debug)]
pub struct DetailedParser {
    grammar: &'static dyn Grammar,
    alloc: Arc<IdAllocator>,
    limits: DetailLimits,
    cache: BoundaryCache,
    buffers: Pool<FactDraft>,
    owned: FxHashMap<BoundaryId, Vec<Fact>>,
    deferred: IndexSet<BoundaryId>,
}

const DRAFT_CHUNK: usize = 64;
const IDLE_BUFFERS: usize = 32;

impl DetailedParser {
    pub fn new(grammar: &'static dyn Grammar, alloc: Arc<IdAllocator>, limits: DetailLimits) -> Self {
        Self {
            grammar,
            alloc,
            limits,
            cache: BoundaryCache::new(limits.cache_capacity),
            buffers: Pool::new(DRAFT_CHUNK, IDLE_BUFFERS),
            owned: FxHashMap::default(),
            deferred: IndexSet::new(),
        }
    }

    pub fn cache(&self) -> &BoundaryCache {
        &self.cache
    }

    pub fn deferred(&self) -> impl Iterator<Item = BoundaryId> + '_ {
        self.deferred.iter().copied()
    }

    /// Facts a boundary currently owns.
    pub fn owned(&self, id: BoundaryId) -> &[Fact] {
        self.owned.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Turn a structural delta into the fact delta for the same edit.
    ///
    /// Facts of removed boundaries are retracted. Added boundaries, kept
    /// boundaries the change touches and parents of added or removed
    /// boundaries are reparsed, viewport first; past the budget they get a
    /// placeholder and are reported as deferred.
    pub fn parse_viewport(&mut self, input: ParseInput<'_>) -> ViewportParse {
        let edit = input.structure.rebase;
        let mut delta = FactDelta::new(input.generation);
        if !edit.is_noop() {
            delta.rebase = Some(edit);
        }

        self.cache.invalidate(input.structure);
        self.cache.rebase(&edit);
        self.rebase_owned(&edit);

        for removed in &input.structure.removed {
            if let Some(facts) = self.owned.remove(&removed.id) {
                delta.removed.extend(facts.iter().map(Fact::id));
            }
            self.deferred.shift_remove(&removed.id);
        }

        let mut dirty: FxHashSet<BoundaryId> = FxHashSet::default();
        dirty.extend(input.structure.added.iter().map(|b| b.id));
        for b in input.structure.added.iter().chain(&input.structure.removed) {
            if let Some(parent) = b.parent {
                dirty.insert(parent);
            }
        }
        if !edit.is_noop() {
            for b in input.boundaries {
                if touches(b.span, input.affected) {
                    dirty.insert(b.id);
                }
            }
        }

        let targets: Vec<&ParseBoundary> = input
            .boundaries
            .iter()
            .filter(|b| dirty.contains(&b.id))
            .collect();
        let outcome = self.run(&input, targets, self.limits.max_boundaries_per_parse);
        delta.removed.extend(outcome.delta.removed);
        delta.added.extend(outcome.delta.added);

        debug!(
            generation = %input.generation,
            dirty = dirty.len(),
            parsed = outcome.parsed,
            cache_hits = outcome.cache_hits,
            deferred = outcome.deferred.len(),
            removed = delta.removed.len(),
            added = delta.added.len(),
            "detailed parse"
        );
        ViewportParse {
            delta,
            deferred: outcome.deferred,
            parsed: outcome.parsed,
            cache_hits: outcome.cache_hits,
        }
    }

    /// Parse deferred boundaries, those overlapping `only` when given, with
    /// no budget. The delta is at `input.generation` and moves no offsets.
    pub fn parse_deferred(&mut self, input: ParseInput<'_>, only: Option<Span>) -> ViewportParse {
        let pending: FxHashSet<BoundaryId> = self.deferred.iter().copied().collect();
        let targets: Vec<&ParseBoundary> = input
            .boundaries
            .iter()
            .filter(|b| pending.contains(&b.id))
            .filter(|b| only.is_none_or(|span| b.span.overlaps(span)))
            .collect();
        let mut outcome = self.run(&input, targets, usize::MAX);
        outcome.delta.rebase = None;
        outcome
    }

    /// Drop all state, as for a buffer that is about to be replaced.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.owned.clear();
        self.deferred.clear();
    }

    fn rebase_owned(&mut self, edit: &EditMap) {
        if edit.is_noop() {
            return;
        }
        for facts in self.owned.values_mut() {
            for fact in facts.iter_mut() {
                *fact = fact.rebased(edit);
            }
        }
    }

    fn run(
        &mut self,
        input: &ParseInput<'_>,
        mut targets: Vec<&ParseBoundary>,
        budget: usize,
    ) -> ViewportParse {
        let viewport = input.viewport;
        targets.sort_by_key(|b| match viewport {
            Some(v) if b.span.overlaps(v) || v.contains_span(b.span) => (0, 0, b.span.start),
            Some(v) => (1, distance(b.span, v), b.span.start),
            None => (0, 0, b.span.start),
        });

        let holes = holes_by_parent(input.boundaries);
        let mut misses = 0usize;
        let mut plan: Vec<(&ParseBoundary, Source)> = Vec::with_capacity(targets.len());
        for b in targets {
            let range = token_range(input.tokens, b.span);
            let tokens = &input.tokens[range];
            let own_holes = holes.get(&b.id).map_or(&[][..], Vec::as_slice);
            let limit = self.limit(b);
            let key = BoundaryKey {
                span: b.span,
                hash: content_hash(b, tokens, own_holes, input.source, limit),
            };
            let source = match self.cache.get(&key) {
                Some(drafts) => Source::Cached(drafts),
                None if misses < budget => {
                    misses += 1;
                    Source::Parse(key)
                }
                None => Source::Defer,
            };
            plan.push((b, source));
        }

        let jobs: Vec<(usize, &ParseBoundary)> = plan
            .iter()
            .enumerate()
            .filter(|(_, (_, s))| matches!(s, Source::Parse(_)))
            .map(|(i, (b, _))| (i, *b))
            .collect();
        let parse = |&(i, b): &(usize, &ParseBoundary)| {
            let own_holes = holes.get(&b.id).map_or(&[][..], Vec::as_slice);
            (i, self.parse_one(input, b, own_holes))
        };
        let mut results: FxHashMap<usize, Option<Vec<FactDraft>>> =
            if self.limits.parallel && jobs.len() > 1 {
                jobs.par_iter().map(parse).collect()
            } else {
                jobs.iter().map(parse).collect()
            };

        let mut out = ViewportParse {
            delta: FactDelta::new(input.generation),
            deferred: Vec::new(),
            parsed: 0,
            cache_hits: 0,
        };
        for (i, (b, source)) in plan.into_iter().enumerate() {
            let drafts = match source {
                Source::Cached(drafts) => {
                    out.cache_hits += 1;
                    drafts
                }
                Source::Parse(key) => match results.remove(&i).flatten() {
                    Some(drafts) => {
                        out.parsed += 1;
                        self.cache.put(key, &drafts);
                        drafts
                    }
                    None => {
                        trace!(boundary = %b.id, "parse cancelled, deferring");
                        self.placeholder(b, &mut out)
                    }
                },
                Source::Defer => self.placeholder(b, &mut out),
            };
            if !out.deferred.last().is_some_and(|id| *id == b.id) {
                self.deferred.shift_remove(&b.id);
            }

            let previous = self.owned.remove(&b.id).unwrap_or_default();
            let done = reconcile(previous, &drafts, &self.alloc, input.generation);
            out.delta.removed.extend(done.removed);
            out.delta.added.extend(done.added);
            self.owned.insert(b.id, done.facts);
            self.buffers.give_back(drafts);
        }
        if !out.deferred.is_empty() {
            warn!(
                deferred = out.deferred.len(),
                budget, "boundaries deferred past the parse budget"
            );
        }
        out
    }

    fn placeholder(&mut self, b: &ParseBoundary, out: &mut ViewportParse) -> Vec<FactDraft> {
        self.deferred.insert(b.id);
        out.deferred.push(b.id);
        let boundary = FactDraft::new(b.span, Predicate::Boundary(b.kind)).with_confidence(b.confidence);
        let unknown = FactDraft::new(b.span, Predicate::IsNode(NodeKind::Unknown))
            .with_confidence(DEFERRED_CONFIDENCE)
            .with_parent(Some(ArenaId(0)));
        vec![boundary, unknown]
    }

    fn limit(&self, b: &ParseBoundary) -> u32 {
        self.limits.max_depth.saturating_sub(b.depth).max(1)
    }

    /// Parse one boundary. `None` when cancelled.
    fn parse_one(
        &self,
        input: &ParseInput<'_>,
        b: &ParseBoundary,
        holes: &[Span],
    ) -> Option<Vec<FactDraft>> {
        let range = token_range(input.tokens, b.span);
        let tokens = &input.tokens[range];
        let mut cx = ParseCx::new(input.source, tokens, holes, b, self.limit(b))
            .with_buffer(self.buffers.take_vec());
        if let Some(cancel) = input.cancel {
            cx = cx.with_cancel(cancel);
        }
        let root = cx.emit(FactDraft::new(b.span, Predicate::Boundary(b.kind)).with_confidence(b.confidence));

        let result = self.grammar.parse_boundary(&mut cx);
        if cx.is_cancelled() {
            return None;
        }
        match result {
            Ok(()) => {}
            Err(failure) if cx.is_tolerant() => {
                trace!(boundary = %b.id, message = %failure.message, "tolerant parse stopped early");
                let has_node = cx
                    .drafts()
                    .iter()
                    .skip(1)
                    .any(|(_, d)| matches!(d.predicate, Predicate::IsNode(_)));
                if !has_node {
                    cx.emit(unknown(b.span));
                }
                cx.emit(
                    FactDraft::new(b.span, Predicate::HasError)
                        .with_text(failure.message.as_str())
                        .with_parent(Some(root)),
                );
            }
            Err(failure) => {
                trace!(boundary = %b.id, message = %failure.message, "boundary is ambiguous");
                cx.truncate(1);
                cx.emit(unknown(b.span));
                cx.emit(
                    FactDraft::new(failure.span, Predicate::HasError)
                        .with_text(failure.message.as_str())
                        .with_parent(Some(root)),
                );
            }
        }

        let mut drafts = cx.into_drafts();
        for draft in drafts.iter_mut().skip(1) {
            if draft.parent.is_none() {
                draft.parent = Some(root);
            }
        }
        for token in own_tokens(tokens, holes) {
            if token.is_error() || token.class() == TokenClass::Comment {
                drafts.push(token.to_draft(input.source).with_parent(Some(root)));
            }
        }
        Some(drafts)
    }
}

fn unknown(span: Span) -> FactDraft {
    FactDraft::new(span, Predicate::IsNode(NodeKind::Unknown)).with_confidence(SPECULATIVE_CONFIDENCE)
}

/// Whether a boundary must be reparsed after a change to `affected`.
/// Pure deletions leave an empty region; they touch boundaries strictly
/// around the deletion point.
fn touches(span: Span, affected: Span) -> bool {
    if affected.is_empty() {
        span.start < affected.start && affected.start < span.end
    } else {
        span.overlaps(affected)
    }
}

fn distance(span: Span, viewport: Span) -> u32 {
    if span.end <= viewport.start {
        viewport.start - span.end
    } else {
        span.start.saturating_sub(viewport.end)
    }
}

/// Spans of each boundary's direct children, in text order.
fn holes_by_parent(boundaries: &[ParseBoundary]) -> FxHashMap<BoundaryId, Vec<Span>> {
    let mut holes: FxHashMap<BoundaryId, Vec<Span>> = FxHashMap::default();
    for b in boundaries {
        if let Some(parent) = b.parent {
            holes.entry(parent).or_default().push(b.span);
        }
    }
    holes
}
