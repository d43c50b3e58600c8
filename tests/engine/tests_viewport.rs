//! Viewport priority, deferred boundaries and cooperative cancellation.

use tokio_util::sync::CancellationToken;

use strata::fact::{DEFERRED_CONFIDENCE, NodeKind};
use strata::{EngineConfig, LanguageId, Predicate, Span};

use crate::helpers::engine_helpers::*;
use crate::helpers::fact_assertions::*;

const NESTED: &str = "[[1], [2], [3]]";

fn budgeted(budget: usize, viewport: Span) -> EngineConfig {
    EngineConfig::default()
        .with_parallel(false)
        .with_max_boundaries_per_parse(budget)
        .with_viewport(viewport)
}

fn numbers(engine: &strata::Engine) -> Vec<String> {
    facts_with(engine, Predicate::IsNode(NodeKind::Number))
        .iter()
        .filter_map(|f| f.object().and_then(|v| v.as_text()).map(str::to_string))
        .collect()
}

#[test]
fn test_viewport_is_parsed_first() {
    let engine = engine_with(LanguageId::Json, budgeted(2, Span::new(11, 14)), NESTED);
    assert_eq!(numbers(&engine), vec!["3"]);
    assert_eq!(engine.deferred().len(), 2);

    let placeholders = facts_with(&engine, Predicate::IsNode(NodeKind::Unknown));
    assert_eq!(placeholders.len(), 2);
    assert!(placeholders.iter().all(|f| f.confidence() == DEFERRED_CONFIDENCE));
    assert_consistent(&engine);
}

#[test]
fn test_scrolling_finishes_visible_boundaries() {
    let mut engine = engine_with(LanguageId::Json, budgeted(2, Span::new(11, 14)), NESTED);
    let generation = engine.generation();

    let delta = engine.set_viewport(Some(Span::new(1, 4))).unwrap();
    assert_eq!(delta.generation, generation);
    assert!(delta.rebase.is_none());
    assert_eq!(engine.generation(), generation);
    assert_eq!(engine.viewport(), Some(Span::new(1, 4)));

    let mut found = numbers(&engine);
    found.sort();
    assert_eq!(found, vec!["1", "3"]);
    assert_eq!(engine.deferred().len(), 1);
    assert_consistent(&engine);
}

#[test]
fn test_parse_deferred_completes_everything() {
    let mut engine = engine_with(LanguageId::Json, budgeted(2, Span::new(11, 14)), NESTED);
    let delta = engine.parse_deferred(&CancellationToken::new()).unwrap();
    assert!(!delta.is_empty());
    assert!(engine.deferred().is_empty());
    assert!(facts_with(&engine, Predicate::IsNode(NodeKind::Unknown)).is_empty());

    let mut found = numbers(&engine);
    found.sort();
    assert_eq!(found, vec!["1", "2", "3"]);
    assert_eq!(shape(&engine), shape(&json(NESTED)));
}

#[test]
fn test_edit_far_from_viewport_is_deferred() {
    let mut engine = engine_with(LanguageId::Json, budgeted(1, Span::new(0, 3)), "[1]");
    let outcome = edit(&mut engine, 3, 3, " [2] [3]");
    assert_eq!(outcome.deferred.len(), 1);
    assert_eq!(numbers(&engine), vec!["1", "2"]);
    assert_consistent(&engine);

    engine.parse_deferred(&CancellationToken::new()).unwrap();
    assert_eq!(shape(&engine), shape(&json("[1] [2] [3]")));
}

#[test]
fn test_cancelled_parse_keeps_placeholders() {
    let body: Vec<String> = (0..400).map(|i| i.to_string()).collect();
    let text = format!("[{}]", body.join(", "));
    let config = EngineConfig::default().with_max_boundaries_per_parse(0);
    let mut engine = engine_with(LanguageId::Json, config, &text);
    assert_eq!(engine.deferred().len(), 1);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let delta = engine.parse_deferred(&cancel).unwrap();
    assert!(delta.is_empty());
    assert_eq!(engine.deferred().len(), 1);
    assert!(numbers(&engine).is_empty());

    engine.parse_deferred(&CancellationToken::new()).unwrap();
    assert_eq!(numbers(&engine).len(), 400);
    assert_consistent(&engine);
}
