//! Worked JSON scenarios through the whole pipeline.

use strata::fact::{BoundaryKind, NodeKind, TokenClass};
use strata::{Generation, Predicate, Query, Span};

use crate::helpers::engine_helpers::*;
use crate::helpers::fact_assertions::*;

const OBJECT: &str = r#"{"a": 1}"#;

// =============================================================================
// SINGLE OBJECT
// =============================================================================

#[test]
fn test_object_tokens() {
    let engine = json(OBJECT);
    let texts: Vec<&str> = engine
        .tokens()
        .iter()
        .filter(|t| t.class() != TokenClass::Whitespace)
        .map(|t| t.text(engine.text()))
        .collect();
    assert_eq!(texts, vec!["{", "\"a\"", ":", "1", "}", ""]);

    let eof = engine.tokens().last().unwrap();
    assert!(eof.is_eof());
    assert_eq!(eof.depth, 0);
    assert_eq!(eof.span, Span::empty(8));
}

#[test]
fn test_object_boundary() {
    let engine = json(OBJECT);
    assert_eq!(engine.boundaries().len(), 1);
    let block = &engine.boundaries()[0];
    assert_eq!(block.kind, BoundaryKind::Block);
    assert_eq!(block.span, Span::new(0, 8));
    assert_eq!(block.depth, 0);
    assert_eq!(block.parent, None);
}

#[test]
fn test_object_facts() {
    let engine = json(OBJECT);
    let object = one(&engine, Predicate::IsNode(NodeKind::Object));
    assert_eq!(object.subject(), Span::new(0, 8));
    assert_eq!(object.confidence(), 1.0);
    assert!(one(&engine, Predicate::IsNode(NodeKind::Key)).has_text("a"));
    assert!(one(&engine, Predicate::IsNode(NodeKind::Number)).has_text("1"));
    assert_consistent(&engine);
}

// =============================================================================
// NUMBER EDIT
// =============================================================================

#[test]
fn test_number_edit_is_surgical() {
    let mut engine = json(OBJECT);
    let before = engine.snapshot().all_ids();
    let old_number = one(&engine, Predicate::IsNode(NodeKind::Number)).id();

    let outcome = edit(&mut engine, 6, 7, "12");

    assert_eq!(outcome.tokens.removed.len(), 1);
    assert_eq!(outcome.tokens.added.len(), 1);
    assert_eq!(outcome.tokens.added[0].text(engine.text()), "12");
    assert!(outcome.structure.is_empty());

    assert_eq!(outcome.facts.removed, vec![old_number]);
    assert_eq!(outcome.facts.added.len(), 1);
    let number = &outcome.facts.added[0];
    assert_eq!(number.predicate(), Predicate::IsNode(NodeKind::Number));
    assert!(number.has_text("12"));
    assert_eq!(number.generation(), Generation(2));

    let after = engine.snapshot();
    for id in before.iter().filter(|id| **id != old_number) {
        assert!(after.contains(*id), "{id} should have survived the edit");
    }
    assert_eq!(
        one(&engine, Predicate::IsNode(NodeKind::Object)).subject(),
        Span::new(0, 9)
    );
    assert_consistent(&engine);
}

// =============================================================================
// UNCLOSED OBJECT
// =============================================================================

#[test]
fn test_unclosed_object_recovers() {
    let engine = json(r#"{"a": 1"#);
    assert_eq!(engine.boundaries().len(), 1);
    let region = &engine.boundaries()[0];
    assert_eq!(region.kind, BoundaryKind::ErrorRegion);
    assert_eq!(region.span, Span::new(0, 7));

    assert!(one(&engine, Predicate::IsNode(NodeKind::Key)).has_text("a"));
    assert!(one(&engine, Predicate::IsNode(NodeKind::Number)).has_text("1"));
    one(&engine, Predicate::HasError);
    assert_consistent(&engine);
}

#[test]
fn test_closing_the_object_clears_the_error() {
    let mut engine = json(r#"{"a": 1"#);
    edit(&mut engine, 7, 7, "}");
    assert_eq!(engine.boundaries()[0].kind, BoundaryKind::Block);
    assert!(facts_with(&engine, Predicate::HasError).is_empty());
    assert!(facts_with(&engine, Predicate::Boundary(BoundaryKind::ErrorRegion)).is_empty());
    assert_consistent(&engine);
}

// =============================================================================
// QUERY
// =============================================================================

#[test]
fn test_overlapping_first_byte() {
    let engine = json(OBJECT);
    let object = one(&engine, Predicate::IsNode(NodeKind::Object)).id();
    let ids = engine.query(&Query::Overlapping(Span::new(0, 1)));
    assert!(ids.contains(&object));
    for fact in engine.hydrate(&ids).unwrap() {
        assert!(fact.subject().start <= 1, "{fact:?} starts past the query");
    }
}
