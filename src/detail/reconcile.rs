//! Turning one boundary's drafts into facts.
//!
//! A draft that asserts exactly what one of the boundary's current facts
//! asserts (same subject, predicate, object and confidence, under the same
//! parent) takes over that fact's id. Everything else is new. Since parents
//! are resolved before their children, a changed node forces new ids on its
//! whole subtree while siblings keep theirs.

use rustc_hash::FxHashMap;

use crate::base::{FactId, Generation, IdAllocator, Span};
use crate::fact::{DraftValue, Fact, FactDraft, Predicate, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    subject: Span,
    predicate: Predicate,
    object: Option<Value>,
    confidence: u32,
    parent: Option<FactId>,
}

impl Key {
    fn of(fact: &Fact) -> Key {
        Key {
            subject: fact.subject(),
            predicate: fact.predicate(),
            object: fact.object().cloned(),
            confidence: fact.confidence().to_bits(),
            parent: fact.parent(),
        }
    }
}

/// Result of reconciling one boundary.
#[derive(Debug, Default)]
pub struct Reconciled {
    /// The boundary's facts after this parse, kept and new, in draft order.
    pub facts: Vec<Fact>,
    pub added: Vec<Fact>,
    pub removed: Vec<FactId>,
}

pub fn reconcile(
    previous: Vec<Fact>,
    drafts: &[FactDraft],
    alloc: &IdAllocator,
    generation: Generation,
) -> Reconciled {
    let mut pool: FxHashMap<Key, Vec<Fact>> = FxHashMap::default();
    for fact in previous {
        pool.entry(Key::of(&fact)).or_default().push(fact);
    }

    let mut out = Reconciled::default();
    let mut resolved: Vec<FactId> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let local = |id: crate::base::ArenaId| resolved.get(id.index()).copied();
        let object = match &draft.object {
            None => None,
            Some(DraftValue::Value(v)) => Some(v.clone()),
            Some(DraftValue::Local(target)) => local(*target).map(Value::Fact),
        };
        let key = Key {
            subject: draft.subject,
            predicate: draft.predicate,
            object,
            confidence: draft.confidence.to_bits(),
            parent: draft.parent.and_then(local),
        };

        let reused = pool.get_mut(&key).and_then(|same| same.pop());
        let fact = match reused {
            Some(fact) => fact,
            None => {
                let mut fact = Fact::new(alloc.fact_id(), key.subject, key.predicate, generation)
                    .with_confidence(draft.confidence);
                if let Some(object) = key.object {
                    fact = fact.with_object(object);
                }
                if let Some(parent) = key.parent {
                    fact = fact.with_parent(parent);
                }
                out.added.push(fact.clone());
                fact
            }
        };
        resolved.push(fact.id());
        out.facts.push(fact);
    }

    out.removed = pool
        .into_values()
        .flatten()
        .map(|fact| fact.id())
        .collect();
    out.removed.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::NodeKind;

    fn drafts(number: &str, end: u32) -> Vec<FactDraft> {
        let object = FactDraft::new(Span::new(0, end + 1), Predicate::IsNode(NodeKind::Object));
        let member = FactDraft::new(Span::new(1, end), Predicate::IsNode(NodeKind::Member))
            .with_parent(Some(crate::base::ArenaId(0)));
        let number = FactDraft::new(Span::new(6, end), Predicate::IsNode(NodeKind::Number))
            .with_text(number)
            .with_parent(Some(crate::base::ArenaId(1)));
        vec![object, member, number]
    }

    #[test]
    fn test_identical_drafts_keep_every_id() {
        let alloc = IdAllocator::new();
        let first = reconcile(Vec::new(), &drafts("1", 7), &alloc, Generation(1));
        assert_eq!(first.added.len(), 3);

        let second = reconcile(first.facts.clone(), &drafts("1", 7), &alloc, Generation(2));
        assert!(second.added.is_empty());
        assert!(second.removed.is_empty());
        assert_eq!(second.facts, first.facts);
    }

    #[test]
    fn test_changed_leaf_is_replaced_alone() {
        let alloc = IdAllocator::new();
        let first = reconcile(Vec::new(), &drafts("1", 7), &alloc, Generation(1));
        let rebased: Vec<Fact> = first
            .facts
            .iter()
            .map(|f| f.rebased(&crate::base::EditMap::new(Span::new(6, 7), 2)))
            .collect();

        let second = reconcile(rebased, &drafts("12", 8), &alloc, Generation(2));
        assert_eq!(second.removed, vec![first.facts[2].id()]);
        assert_eq!(second.added.len(), 1);
        assert!(second.added[0].has_text("12"));
        assert_eq!(second.added[0].generation(), Generation(2));
        assert_eq!(second.added[0].parent(), Some(first.facts[1].id()));
    }

    #[test]
    fn test_local_object_resolves_to_fact_id() {
        let alloc = IdAllocator::starting_at(10);
        let scope = FactDraft::new(Span::new(0, 9), Predicate::IsNode(NodeKind::Block));
        let defined = FactDraft::new(Span::new(2, 3), Predicate::DefinedIn)
            .with_local(crate::base::ArenaId(0));
        let out = reconcile(Vec::new(), &[scope, defined], &alloc, Generation(1));
        assert_eq!(out.facts[1].object(), Some(&Value::Fact(FactId(10))));
    }
}
