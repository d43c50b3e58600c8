//! The bounded-stack boundary machine and its incremental driver.

use std::cmp::Reverse;
use std::ops::Range;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::base::{BoundaryId, EditMap, IdAllocator, Span, TokenId};
use crate::fact::{BoundaryKind, TokenClass};
use crate::grammar::Grammar;
use crate::lexer::{Delimiter, Side, Token, TokenDelta};

use super::{ParseBoundary, StructuralDelta};

/// Indices of the tokens starting inside `span`.
pub fn token_range(tokens: &[Token], span: Span) -> Range<usize> {
    let lo = tokens.partition_point(|t| t.span.start < span.start);
    let hi = tokens.partition_point(|t| t.span.start < span.end);
    lo..hi.max(lo)
}

/// An open bracket on the machine's stack.
#[derive(Debug)]
struct Frame {
    delim: Delimiter,
    start: u32,
    /// `None` for brackets that do not open a boundary.
    kind: Option<BoundaryKind>,
    depth: u32,
    open_token: TokenId,
}

/// A boundary found by one scan, before it has an id.
#[derive(Debug, Clone, PartialEq)]
struct Found {
    span: Span,
    kind: BoundaryKind,
    depth: u32,
    open_token: Option<TokenId>,
    close_token: Option<TokenId>,
}

impl Found {
    fn shape(&self) -> (Span, BoundaryKind, u32) {
        (self.span, self.kind, self.depth)
    }

    /// A closer that matched no opener of the scan.
    fn is_stray(&self) -> bool {
        self.kind.is_error() && self.open_token.is_none()
    }
}

/// Layer 1 over one buffer.
///
/// Boundaries are kept in pre-order: by start, outer before inner.
#[derive(Debug)]
pub struct StructuralParser {
    grammar: &'static dyn Grammar,
    alloc: Arc<IdAllocator>,
    max_depth: u32,
    boundaries: Vec<ParseBoundary>,
}

impl StructuralParser {
    pub fn new(grammar: &'static dyn Grammar, alloc: Arc<IdAllocator>, max_depth: u32) -> Self {
        Self {
            grammar,
            alloc,
            max_depth: max_depth.max(1),
            boundaries: Vec::new(),
        }
    }

    pub fn boundaries(&self) -> &[ParseBoundary] {
        &self.boundaries
    }

    pub fn get(&self, id: BoundaryId) -> Option<&ParseBoundary> {
        self.boundaries.iter().find(|b| b.id == id)
    }

    /// Direct children of `id`, in text order.
    pub fn children(&self, id: BoundaryId) -> impl Iterator<Item = &ParseBoundary> {
        self.boundaries.iter().filter(move |b| b.parent == Some(id))
    }

    /// Rescan everything and diff against the current boundaries.
    pub fn parse(&mut self, tokens: &[Token], source: &str) -> StructuralDelta {
        let identity = EditMap::new(Span::empty(0), 0);
        let old = self.boundaries.clone();
        let scope: Vec<usize> = (0..old.len()).collect();
        let fresh = self.scan_all(tokens, source);
        self.replace(&old, &scope, fresh, identity)
    }

    /// Bring the boundaries up to date with a token delta.
    ///
    /// `tokens` and `source` are the state after the edit. Only the innermost
    /// boundary whose interior held the whole edit is rescanned; when the
    /// rescan no longer reproduces that boundary exactly, its parent is
    /// tried, and finally the whole input.
    pub fn apply(&mut self, delta: &TokenDelta, tokens: &[Token], source: &str) -> StructuralDelta {
        let old = std::mem::take(&mut self.boundaries);
        self.boundaries = old
            .iter()
            .map(|b| ParseBoundary {
                span: delta.edit.map_span(b.span),
                ..b.clone()
            })
            .collect();

        if delta.is_empty() {
            return StructuralDelta::new(delta.edit);
        }

        // Boundaries sharing an opener or closer with the edit are not
        // candidates, even when their rebased span covers it.
        let encloses = |i: usize| {
            self.boundaries[i].span.contains_span(delta.affected)
                && old[i].span.contains_span(delta.edit.range)
        };
        let lift = u32::from(self.boundaries.first().is_some_and(|b| b.is_implicit_root()));
        let mut candidate = (0..self.boundaries.len())
            .rev()
            .find(|&i| encloses(i) && self.rescannable(&self.boundaries[i]));

        while let Some(index) = candidate {
            let b = &self.boundaries[index];
            let range = token_range(tokens, b.span);
            let base = b.depth.saturating_sub(lift);
            let found = self.scan(tokens, range, b.span.end, source, base);

            let (top, inner): (Vec<Found>, Vec<Found>) =
                found.into_iter().partition(|f| f.depth == base);
            let stray = inner.iter().any(|f| f.is_stray());
            if !stray && top.len() == 1 && top[0].span == b.span && top[0].kind == b.kind {
                trace!(boundary = %b.id, span = ?b.span, "structural rescan is self-contained");
                let (open, close) = (top[0].open_token, top[0].close_token);
                let scope = self.descendants(index);
                self.boundaries[index].open_token = open;
                self.boundaries[index].close_token = close;

                let fresh = inner
                    .into_iter()
                    .map(|f| Found {
                        depth: f.depth + lift,
                        ..f
                    })
                    .collect();
                return self.replace(&old, &scope, fresh, delta.edit);
            }

            candidate = b.parent.and_then(|pid| {
                self.boundaries
                    .iter()
                    .position(|p| p.id == pid && self.rescannable(p))
            });
        }

        debug!(affected = ?delta.affected, "structural rescan of the whole input");
        let scope: Vec<usize> = (0..self.boundaries.len()).collect();
        let fresh = self.scan_all(tokens, source);
        self.replace(&old, &scope, fresh, delta.edit)
    }

    /// Indices of every boundary below `index` in the current forest.
    fn descendants(&self, index: usize) -> Vec<usize> {
        let mut inside: FxHashSet<BoundaryId> = FxHashSet::default();
        inside.insert(self.boundaries[index].id);
        let mut scope = Vec::new();
        for (i, c) in self.boundaries.iter().enumerate().skip(index + 1) {
            match c.parent {
                Some(pid) if inside.contains(&pid) => {
                    inside.insert(c.id);
                    scope.push(i);
                }
                _ => {}
            }
        }
        scope
    }

    fn rescannable(&self, b: &ParseBoundary) -> bool {
        !b.kind.is_error() && !b.is_implicit_root()
    }

    /// Swap the boundaries at `scope` for `fresh`, keeping the id of every
    /// boundary whose rebased shape is found again.
    fn replace(
        &mut self,
        old: &[ParseBoundary],
        scope: &[usize],
        fresh: Vec<Found>,
        rebase: EditMap,
    ) -> StructuralDelta {
        let mut delta = StructuralDelta::new(rebase);

        let mut by_shape: FxHashMap<(Span, BoundaryKind, u32), usize> = FxHashMap::default();
        for &i in scope {
            by_shape.insert(self.boundaries[i].shape(), i);
        }

        let mut kept: FxHashSet<usize> = FxHashSet::default();
        let mut next: Vec<ParseBoundary> = Vec::with_capacity(fresh.len());
        let mut added: FxHashSet<BoundaryId> = FxHashSet::default();
        for f in fresh {
            match by_shape.remove(&f.shape()) {
                Some(i) => {
                    kept.insert(i);
                    next.push(ParseBoundary {
                        open_token: f.open_token,
                        close_token: f.close_token,
                        ..self.boundaries[i].clone()
                    });
                }
                None => {
                    let mut b = ParseBoundary::new(self.alloc.boundary_id(), f.span, f.kind, f.depth);
                    b.open_token = f.open_token;
                    b.close_token = f.close_token;
                    added.insert(b.id);
                    next.push(b);
                }
            }
        }

        let in_scope: FxHashSet<usize> = scope.iter().copied().collect();
        for &i in scope {
            if !kept.contains(&i) {
                delta.removed.push(old[i].clone());
            }
        }
        let survivors = std::mem::take(&mut self.boundaries)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !in_scope.contains(i))
            .map(|(_, b)| b);
        self.boundaries = survivors.chain(next).collect();
        self.link();

        delta.added = self
            .boundaries
            .iter()
            .filter(|b| added.contains(&b.id))
            .cloned()
            .collect();
        if !delta.is_empty() {
            debug!(
                removed = delta.removed.len(),
                added = delta.added.len(),
                total = self.boundaries.len(),
                "structural delta"
            );
        }
        delta
    }

    /// Restore pre-order and recompute parent links and depths.
    fn link(&mut self) {
        self.boundaries
            .sort_by_key(|b| (b.span.start, Reverse(b.span.end), b.depth));
        let mut stack: Vec<usize> = Vec::new();
        for i in 0..self.boundaries.len() {
            let span = self.boundaries[i].span;
            while let Some(&top) = stack.last() {
                if self.boundaries[top].span.contains_span(span) {
                    break;
                }
                stack.pop();
            }
            let parent = stack.last().map(|&top| &self.boundaries[top]);
            let (id, depth) = parent.map_or((None, 0), |p| (Some(p.id), p.depth + 1));
            self.boundaries[i].parent = id;
            self.boundaries[i].depth = depth;
            stack.push(i);
        }
    }

    /// Scan the whole input, adding the implicit module root when top-level
    /// code lies outside every top-level boundary.
    fn scan_all(&self, tokens: &[Token], source: &str) -> Vec<Found> {
        let end = source.len() as u32;
        let body = tokens.len().saturating_sub(1);
        let mut found = self.scan(tokens, 0..body, end, source, 0);

        let top: Vec<Span> = found
            .iter()
            .filter(|f| f.depth == 0)
            .map(|f| f.span)
            .collect();
        let loose = tokens[..body]
            .iter()
            .filter(|t| t.class() != TokenClass::Whitespace)
            .any(|t| !top.iter().any(|s| s.contains(t.span.start)));
        if loose {
            for f in &mut found {
                f.depth += 1;
            }
            found.push(Found {
                span: Span::new(0, end),
                kind: BoundaryKind::Module,
                depth: 0,
                open_token: None,
                close_token: None,
            });
        }
        found
    }

    /// Run the bracket machine over `tokens[range]`, starting `base` levels
    /// deep. Depths exclude the implicit module root; frames still open at the
    /// end run to `end`.
    fn scan(
        &self,
        tokens: &[Token],
        range: Range<usize>,
        end: u32,
        source: &str,
        base: u32,
    ) -> Vec<Found> {
        let delims = self.grammar.boundary_delimiters();
        let mut stack: Vec<Frame> = Vec::new();
        let mut open = base;
        let mut found = Vec::new();
        let mut overflow = 0usize;

        for i in range {
            let token = &tokens[i];
            let Some((delim, side)) = token.delimiter() else {
                continue;
            };
            if !delims.contains(&delim) {
                continue;
            }
            match side {
                Side::Open => {
                    let mut opener = self.grammar.match_opener(tokens, i, source);
                    if opener.is_some() && open >= self.max_depth {
                        overflow += 1;
                        opener = None;
                    }
                    let start = match opener {
                        Some(o) => tokens[o.start].span.start,
                        None => token.span.start,
                    };
                    stack.push(Frame {
                        delim,
                        start,
                        kind: opener.map(|o| o.kind),
                        depth: open,
                        open_token: token.id,
                    });
                    if opener.is_some() {
                        open += 1;
                    }
                }
                Side::Close => match stack.iter().rposition(|f| f.delim == delim) {
                    Some(pos) => {
                        while stack.len() > pos + 1 {
                            if let Some(frame) = stack.pop() {
                                open -= u32::from(frame.kind.is_some());
                                unwind(frame, token.span.start, &mut found);
                            }
                        }
                        if let Some(frame) = stack.pop() {
                            if let Some(kind) = frame.kind {
                                open -= 1;
                                found.push(Found {
                                    span: Span::new(frame.start, token.span.end),
                                    kind,
                                    depth: frame.depth,
                                    open_token: Some(frame.open_token),
                                    close_token: Some(token.id),
                                });
                            }
                        }
                    }
                    None => found.push(Found {
                        span: token.span,
                        kind: BoundaryKind::ErrorRegion,
                        depth: open,
                        open_token: None,
                        close_token: Some(token.id),
                    }),
                },
            }
        }

        while let Some(frame) = stack.pop() {
            unwind(frame, end, &mut found);
        }
        if overflow > 0 {
            warn!(
                overflow,
                max_depth = self.max_depth,
                "brackets nested past the depth limit are not structural"
            );
        }
        found
    }
}

/// A frame left open: an error region from its start to `end`.
fn unwind(frame: Frame, end: u32, found: &mut Vec<Found>) {
    if frame.kind.is_none() {
        return;
    }
    found.push(Found {
        span: Span::new(frame.start, end),
        kind: BoundaryKind::ErrorRegion,
        depth: frame.depth,
        open_token: Some(frame.open_token),
        close_token: None,
    });
}
