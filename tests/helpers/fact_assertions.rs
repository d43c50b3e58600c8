//! Fact lookup and invariant assertions.

use std::collections::HashSet;

use strata::fact::Value;
use strata::index::IndexSnapshot;
use strata::structure::check_nesting;
use strata::{Engine, Fact, FactId, Predicate};

pub fn facts_with(engine: &Engine, predicate: Predicate) -> Vec<Fact> {
    let mut facts: Vec<Fact> = engine
        .snapshot()
        .facts()
        .filter(|f| f.predicate() == predicate)
        .cloned()
        .collect();
    facts.sort_by_key(|f| f.subject());
    facts
}

/// The single live fact with `predicate`.
pub fn one(engine: &Engine, predicate: Predicate) -> Fact {
    let mut facts = facts_with(engine, predicate);
    assert_eq!(
        facts.len(),
        1,
        "expected exactly one {predicate} fact, got {facts:#?}"
    );
    facts.remove(0)
}

/// Every invariant that must hold between edits.
pub fn assert_consistent(engine: &Engine) {
    let snapshot = engine.snapshot();

    let mut seen = HashSet::new();
    for fact in snapshot.facts() {
        assert!(seen.insert(fact.id()), "duplicate live fact {}", fact.id());
        assert!(
            fact.generation() <= snapshot.generation(),
            "{fact:?} is newer than the index"
        );
        if let Some(parent) = fact.parent() {
            assert!(snapshot.contains(parent), "{fact:?} has a dead parent");
        }
        assert!(fact.subject().end as usize <= engine.text().len());
    }

    if let Err(e) = check_nesting(engine.boundaries()) {
        panic!("boundaries do not nest: {e}\n{:#?}", engine.boundaries());
    }
}

/// Facts in a form independent of id allocation: every id is replaced by
/// the subject and predicate of the fact it names.
pub fn shape(engine: &Engine) -> Vec<String> {
    let snapshot = engine.snapshot();
    let name = |snapshot: &IndexSnapshot, id: FactId| {
        snapshot
            .get(id)
            .map(|f| format!("{:?} {}", f.subject(), f.predicate()))
            .unwrap_or_else(|| "<dangling>".to_string())
    };
    let mut shapes: Vec<String> = snapshot
        .facts()
        .map(|f| {
            let object = match f.object() {
                Some(Value::Fact(id)) => name(&snapshot, *id),
                other => format!("{other:?}"),
            };
            let parent = f.parent().map(|id| name(&snapshot, id));
            format!(
                "{:?} {} {} {} {:?}",
                f.subject(),
                f.predicate(),
                object,
                f.confidence(),
                parent
            )
        })
        .collect();
    shapes.sort();
    shapes
}
