//! Queries through the engine: cache coherence, hydration, subscriptions.

use strata::fact::{Category, NodeKind};
use strata::index::{FactFilter, IndexError};
use strata::{EngineError, FactId, Predicate, Query, Span};

use crate::helpers::engine_helpers::*;
use crate::helpers::fact_assertions::*;

const TWO_FUNCTIONS: &str = "fn a() {\n}\nfn b() {\n    x();\n}\n";

// =============================================================================
// CACHE COHERENCE
// =============================================================================

#[test]
fn test_unrelated_edit_keeps_cached_query() {
    let mut engine = curly(TWO_FUNCTIONS);
    let query = Query::Overlapping(Span::new(0, 10));
    let before = engine.query(&query);
    assert!(!before.is_empty());

    // `x` -> `y` inside `b`, after the queried region.
    edit(&mut engine, 24, 25, "y");
    let hits = engine.cache_stats().hits;
    let after = engine.query(&query);

    assert_eq!(engine.cache_stats().hits, hits + 1);
    assert_eq!(after, before);
    assert_eq!(after.to_vec(), engine.snapshot().query(&query));
}

#[test]
fn test_overlapping_edit_recomputes_query() {
    let mut engine = curly(TWO_FUNCTIONS);
    let query = Query::Overlapping(Span::new(20, 30));
    engine.query(&query);

    edit(&mut engine, 24, 25, "yy");
    let misses = engine.cache_stats().misses;
    let after = engine.query(&query);

    assert_eq!(engine.cache_stats().misses, misses + 1);
    assert_eq!(after.to_vec(), engine.snapshot().query(&query));
    let references = engine.hydrate(&after).unwrap();
    assert!(references.iter().any(|f| f.has_text("yy")));
}

#[test]
fn test_shifting_edit_invalidates_later_spans() {
    let mut engine = curly(TWO_FUNCTIONS);
    let query = Query::Overlapping(Span::new(20, 30));
    engine.query(&query);

    edit(&mut engine, 0, 0, "\n\n");
    let after = engine.query(&query);
    assert_eq!(after.to_vec(), engine.snapshot().query(&query));
}

#[test]
fn test_category_query_follows_edits() {
    let mut engine = curly(TWO_FUNCTIONS);
    let query = Query::ByCategory(Category::Semantic);
    let before = engine.query(&query);

    edit(&mut engine, 24, 25, "y");
    let after = engine.query(&query);
    assert_ne!(after, before);
    assert_eq!(after.to_vec(), engine.snapshot().query(&query));
}

// =============================================================================
// QUERY KINDS
// =============================================================================

#[test]
fn test_filter_excludes_speculative_facts() {
    let engine = json(r#"[{"a" 1}, 2]"#);
    let all = Query::Filter(FactFilter::new().category(Category::Syntactic));
    let certain = Query::Filter(
        FactFilter::new()
            .category(Category::Syntactic)
            .certain_only(),
    );
    let speculative = engine.hydrate(&engine.query(&all)).unwrap();
    assert!(speculative.iter().any(|f| f.is_speculative()));
    let certain = engine.hydrate(&engine.query(&certain)).unwrap();
    assert!(!certain.is_empty());
    assert!(certain.iter().all(|f| !f.is_speculative()));
}

#[test]
fn test_containing_offset() {
    let engine = json(r#"{"a": [10]}"#);
    let ids = engine.query(&Query::Containing(7));
    let facts = engine.hydrate(&ids).unwrap();
    assert!(facts.iter().any(|f| f.has_text("10")));
    assert!(facts.iter().all(|f| f.subject().contains(7)));
}

#[test]
fn test_by_generation_returns_new_facts() {
    let mut engine = json(r#"{"a": 1}"#);
    let outcome = edit(&mut engine, 6, 7, "true");
    let ids = engine.query(&Query::ByGeneration(outcome.generation));
    let added: Vec<FactId> = outcome.facts.added.iter().map(|f| f.id()).collect();
    let mut ids = ids.to_vec();
    ids.sort();
    let mut added = added;
    added.sort();
    assert_eq!(ids, added);
}

// =============================================================================
// HYDRATION
// =============================================================================

#[test]
fn test_hydrate_reports_dead_and_unknown_ids() {
    let mut engine = json(r#"{"a": 1}"#);
    let number = one(&engine, Predicate::IsNode(NodeKind::Number)).id();
    edit(&mut engine, 6, 7, "2");

    let err = engine.hydrate(&[number]).unwrap_err();
    assert!(matches!(err, EngineError::Index(IndexError::UnknownFact(id)) if id == number));

    let never = FactId(u64::MAX);
    let err = engine.hydrate(&[never]).unwrap_err();
    assert!(matches!(err, EngineError::Index(IndexError::NeverInserted(_))));
    assert!(engine.get_fact(never).is_none());
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

#[test]
fn test_subscribers_receive_each_delta() {
    let mut engine = json("[1]");
    let mut rx = engine.subscribe();

    let first = edit(&mut engine, 1, 2, "2");
    let second = edit(&mut engine, 0, 0, " ");
    edit(&mut engine, 0, 0, "");

    assert_eq!(rx.try_recv().unwrap(), first.facts);
    assert_eq!(rx.try_recv().unwrap(), second.facts);
    assert!(rx.try_recv().is_err(), "no-op edits are not broadcast");
}
