//! Folding ranges from boundary facts and multi-line comments.

use crate::base::{LineIndex, Span, TextSize};
use crate::engine::Engine;
use crate::fact::{BoundaryKind, Predicate, TokenClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldingKind {
    Region,
    Comment,
}

/// A foldable line range (0-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldingRange {
    pub start_line: u32,
    pub end_line: u32,
    pub kind: FoldingKind,
}

/// Folding ranges for the current generation, sorted by start line.
///
/// Function, class, module and block boundaries fold when they span more
/// than one line. Error regions and the implicit module root do not.
pub fn folding_ranges(engine: &Engine) -> Vec<FoldingRange> {
    let lines = engine.line_index();
    let roots: Vec<Span> = engine
        .boundaries()
        .iter()
        .filter(|b| b.is_implicit_root())
        .map(|b| b.span)
        .collect();

    let snapshot = engine.snapshot();
    let mut ranges: Vec<FoldingRange> = snapshot
        .facts()
        .filter_map(|fact| match fact.predicate() {
            Predicate::Boundary(BoundaryKind::ErrorRegion) => None,
            Predicate::Boundary(_) if roots.contains(&fact.subject()) => None,
            Predicate::Boundary(_) => fold(&lines, fact.subject(), FoldingKind::Region),
            Predicate::Token(TokenClass::Comment) => {
                fold(&lines, fact.subject(), FoldingKind::Comment)
            }
            _ => None,
        })
        .collect();

    ranges.sort_by_key(|r| (r.start_line, std::cmp::Reverse(r.end_line)));
    ranges.dedup_by_key(|r| (r.start_line, r.end_line));
    ranges
}

fn fold(lines: &LineIndex, span: Span, kind: FoldingKind) -> Option<FoldingRange> {
    if span.is_empty() {
        return None;
    }
    let start_line = lines.line_col(TextSize::from(span.start)).line;
    let end_line = lines.line_col(TextSize::from(span.end - 1)).line;
    (end_line > start_line).then_some(FoldingRange {
        start_line,
        end_line,
        kind,
    })
}
