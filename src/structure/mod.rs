//! Layer 1: structural parser.
//!
//! Turns the token sequence into a forest of [`ParseBoundary`] values without
//! any expression-level grammar: only bracket pairs the grammar marks as
//! structural, and the declaration headers in front of them, are looked at.
//!
//! Unbalanced input never fails the layer. A closer with no opener becomes an
//! error region over itself, an opener that is never closed becomes an error
//! region running to the end of input, and a closer that skips past open
//! frames turns each skipped frame into an error region ending at the closer.

mod parser;

pub use parser::{StructuralParser, token_range};

use crate::base::{BoundaryId, EditMap, Span, TokenId};
use crate::fact::BoundaryKind;

/// Confidence of a boundary recovered from unbalanced delimiters.
pub const ERROR_REGION_CONFIDENCE: f32 = 0.5;

/// A structurally significant region: Layer 1's output and Layer 2's unit of
/// work and caching.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseBoundary {
    pub id: BoundaryId,
    pub span: Span,
    pub kind: BoundaryKind,
    pub confidence: f32,
    /// Number of enclosing boundaries.
    pub depth: u32,
    pub parent: Option<BoundaryId>,
    /// The bracket that opened the boundary; `None` for the implicit module
    /// root and for stray closers.
    pub open_token: Option<TokenId>,
    pub close_token: Option<TokenId>,
}

impl ParseBoundary {
    pub fn new(id: BoundaryId, span: Span, kind: BoundaryKind, depth: u32) -> Self {
        Self {
            id,
            span,
            kind,
            confidence: if kind.is_error() {
                ERROR_REGION_CONFIDENCE
            } else {
                1.0
            },
            depth,
            parent: None,
            open_token: None,
            close_token: None,
        }
    }

    /// The module root synthesized around top-level code.
    pub fn is_implicit_root(&self) -> bool {
        self.kind == BoundaryKind::Module && self.parent.is_none() && self.open_token.is_none()
    }

    pub(crate) fn shape(&self) -> (Span, BoundaryKind, u32) {
        (self.span, self.kind, self.depth)
    }
}

/// Boundary changes caused by one edit.
///
/// `removed` holds boundaries as they were before the edit, `added` as they
/// are after it. Every boundary in neither list survived with its id; its
/// span moved according to `rebase`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralDelta {
    pub removed: Vec<ParseBoundary>,
    pub added: Vec<ParseBoundary>,
    pub rebase: EditMap,
}

impl StructuralDelta {
    pub fn new(rebase: EditMap) -> Self {
        Self {
            removed: Vec::new(),
            added: Vec::new(),
            rebase,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn removed_ids(&self) -> impl Iterator<Item = BoundaryId> + '_ {
        self.removed.iter().map(|b| b.id)
    }
}

/// A violation of the boundary forest's shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NestingError {
    #[error("{child} names missing parent {parent}")]
    MissingParent { child: BoundaryId, parent: BoundaryId },
    #[error("{child} at {span:?} escapes its parent")]
    Escapes { child: BoundaryId, span: Span },
    #[error("{child} has depth {depth}, expected {expected}")]
    Depth {
        child: BoundaryId,
        depth: u32,
        expected: u32,
    },
    #[error("{first} and {second} overlap without nesting")]
    Overlap { first: BoundaryId, second: BoundaryId },
}

/// Check that `boundaries` form a depth-ordered forest: every boundary lies
/// inside its parent one level deeper, and siblings are disjoint.
pub fn check_nesting(boundaries: &[ParseBoundary]) -> Result<(), NestingError> {
    let by_id: rustc_hash::FxHashMap<BoundaryId, &ParseBoundary> =
        boundaries.iter().map(|b| (b.id, b)).collect();

    for b in boundaries {
        let expected = match b.parent {
            None => 0,
            Some(pid) => {
                let parent = by_id.get(&pid).ok_or(NestingError::MissingParent {
                    child: b.id,
                    parent: pid,
                })?;
                if !parent.span.contains_span(b.span) {
                    return Err(NestingError::Escapes {
                        child: b.id,
                        span: b.span,
                    });
                }
                parent.depth + 1
            }
        };
        if b.depth != expected {
            return Err(NestingError::Depth {
                child: b.id,
                depth: b.depth,
                expected,
            });
        }
    }

    for (i, a) in boundaries.iter().enumerate() {
        for b in &boundaries[i + 1..] {
            if a.parent == b.parent && a.span.overlaps(b.span) {
                return Err(NestingError::Overlap {
                    first: a.id,
                    second: b.id,
                });
            }
        }
    }
    Ok(())
}
