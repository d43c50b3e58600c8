//! Facts: the universal unit of information.
//!
//! A [`Fact`] is an immutable assertion about a span of source text. Facts
//! are created once by Layer 2, owned by the fact index once inserted, and
//! retracted only through a [`FactDelta`].
//!
//! Parsers do not allocate ids. They emit [`FactDraft`]s, which reference
//! each other through arena handles; reconciliation against the facts a
//! boundary already owns turns drafts into facts, reusing ids of facts that
//! did not change.

mod predicate;

pub use predicate::{BoundaryKind, Category, NodeKind, Predicate, TokenClass};

use smol_str::SmolStr;

use crate::base::{ArenaId, EditMap, FactId, Generation, Span};

/// Confidence given to facts produced under ambiguity.
pub const SPECULATIVE_CONFIDENCE: f32 = 0.3;

/// Confidence given to placeholder facts for boundaries awaiting a parse.
pub const DEFERRED_CONFIDENCE: f32 = 0.1;

/// Optional object of a fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Text(SmolStr),
    Int(i64),
    Bool(bool),
    Fact(FactId),
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Value {
        Value::Text(SmolStr::new(s))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_fact(&self) -> Option<FactId> {
        match self {
            Value::Fact(id) => Some(*id),
            _ => None,
        }
    }
}

/// An immutable assertion about a span.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    id: FactId,
    subject: Span,
    predicate: Predicate,
    object: Option<Value>,
    confidence: f32,
    generation: Generation,
    parent: Option<FactId>,
    category: Category,
}

impl Fact {
    pub fn new(id: FactId, subject: Span, predicate: Predicate, generation: Generation) -> Self {
        Self {
            id,
            subject,
            predicate,
            object: None,
            confidence: 1.0,
            generation,
            parent: None,
            category: predicate.category(),
        }
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    /// Set the confidence, clamped to `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn with_parent(mut self, parent: FactId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[inline]
    pub fn id(&self) -> FactId {
        self.id
    }

    #[inline]
    pub fn subject(&self) -> Span {
        self.subject
    }

    #[inline]
    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    #[inline]
    pub fn object(&self) -> Option<&Value> {
        self.object.as_ref()
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub fn parent(&self) -> Option<FactId> {
        self.parent
    }

    /// Precomputed category of the predicate.
    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    #[inline]
    pub fn is_speculative(&self) -> bool {
        self.confidence < 1.0
    }

    /// Check whether the fact's object is the text `text`.
    pub fn has_text(&self, text: &str) -> bool {
        self.object.as_ref().and_then(Value::as_text) == Some(text)
    }

    /// The same assertion in the coordinates of the next generation.
    pub(crate) fn rebased(&self, map: &EditMap) -> Fact {
        Fact {
            subject: map.map_span(self.subject),
            ..self.clone()
        }
    }
}

#[inline]
pub(crate) fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Object of a draft: either a concrete value or a reference to another
/// draft of the same parse, resolved to a [`FactId`] on reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DraftValue {
    Value(Value),
    Local(ArenaId),
}

/// A fact before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct FactDraft {
    pub subject: Span,
    pub predicate: Predicate,
    pub object: Option<DraftValue>,
    pub confidence: f32,
    pub parent: Option<ArenaId>,
}

impl FactDraft {
    pub fn new(subject: Span, predicate: Predicate) -> Self {
        Self {
            subject,
            predicate,
            object: None,
            confidence: 1.0,
            parent: None,
        }
    }

    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.object = Some(DraftValue::Value(Value::text(text)));
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.object = Some(DraftValue::Value(value));
        self
    }

    pub fn with_local(mut self, target: ArenaId) -> Self {
        self.object = Some(DraftValue::Local(target));
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn with_parent(mut self, parent: Option<ArenaId>) -> Self {
        self.parent = parent;
        self
    }

    /// Rebase a cached draft onto the next generation's coordinates.
    pub(crate) fn rebased(&self, map: &EditMap) -> FactDraft {
        FactDraft {
            subject: map.map_span(self.subject),
            ..self.clone()
        }
    }
}

/// The minimal set of fact additions and retractions moving the index from
/// one generation to the next.
///
/// When `rebase` is set, every fact that survives the delta is moved into
/// the coordinates of the new generation before removals and additions are
/// applied; added facts are already expressed in the new coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactDelta {
    pub generation: Generation,
    pub removed: Vec<FactId>,
    pub added: Vec<Fact>,
    pub rebase: Option<EditMap>,
}

impl FactDelta {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// No fact is added or retracted and no offset moves.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.rebase.is_none_or(|map| map.is_noop())
    }

    pub fn len(&self) -> usize {
        self.removed.len() + self.added.len()
    }

    /// Fold another delta of the same generation into this one.
    pub fn merge(&mut self, other: FactDelta) {
        debug_assert!(
            other.generation <= self.generation,
            "merging a delta from a later generation"
        );
        self.removed.extend(other.removed);
        self.added.extend(other.added);
        if self.rebase.is_none() {
            self.rebase = other.rebase;
        }
    }

    pub fn added_with(&self, predicate: Predicate) -> impl Iterator<Item = &Fact> {
        self.added.iter().filter(move |f| f.predicate() == predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_builder() {
        let fact = Fact::new(
            FactId(1),
            Span::new(7, 8),
            Predicate::IsNode(NodeKind::Number),
            Generation(1),
        )
        .with_object(Value::text("1"))
        .with_parent(FactId(0));

        assert!(fact.has_text("1"));
        assert!(!fact.has_text("12"));
        assert_eq!(fact.category(), Category::Syntactic);
        assert_eq!(fact.parent(), Some(FactId(0)));
        assert!(!fact.is_speculative());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let base = Fact::new(FactId(1), Span::new(0, 1), Predicate::HasError, Generation(1));
        assert_eq!(base.clone().with_confidence(1.5).confidence(), 1.0);
        assert_eq!(base.clone().with_confidence(-0.2).confidence(), 0.0);
        assert_eq!(base.with_confidence(f32::NAN).confidence(), 0.0);
    }

    #[test]
    fn test_rebase_keeps_identity() {
        let fact = Fact::new(
            FactId(9),
            Span::new(8, 9),
            Predicate::Token(TokenClass::Close),
            Generation(1),
        );
        let moved = fact.rebased(&EditMap::new(Span::new(7, 8), 2));
        assert_eq!(moved.id(), FactId(9));
        assert_eq!(moved.generation(), Generation(1));
        assert_eq!(moved.subject(), Span::new(9, 10));
    }

    #[test]
    fn test_delta_emptiness() {
        let mut delta = FactDelta::new(Generation(2));
        assert!(delta.is_empty());
        delta.rebase = Some(EditMap::new(Span::empty(3), 0));
        assert!(delta.is_empty());
        delta.rebase = Some(EditMap::new(Span::empty(3), 1));
        assert!(!delta.is_empty());
    }
}
