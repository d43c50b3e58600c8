//! Query descriptions.

use std::hash::{Hash, Hasher};

use crate::base::{Generation, Span};
use crate::fact::{Category, Fact, Predicate};

/// Compound filter: every set field must match.
#[derive(Debug, Clone, Copy)]
pub struct FactFilter {
    pub span: Option<Span>,
    pub category: Option<Category>,
    pub predicate: Option<Predicate>,
    pub min_confidence: f32,
    pub include_speculative: bool,
}

impl Default for FactFilter {
    fn default() -> Self {
        Self {
            span: None,
            category: None,
            predicate: None,
            min_confidence: 0.0,
            include_speculative: true,
        }
    }
}

impl FactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self.category = Some(predicate.category());
        self
    }

    pub fn min_confidence(mut self, min: f32) -> Self {
        self.min_confidence = min;
        self
    }

    /// Exclude facts with confidence below 1.
    pub fn certain_only(mut self) -> Self {
        self.include_speculative = false;
        self
    }

    /// Check the non-spatial parts of the filter against a fact.
    pub fn accepts(&self, fact: &Fact) -> bool {
        self.category.is_none_or(|c| fact.category() == c)
            && self.predicate.is_none_or(|p| fact.predicate() == p)
            && fact.confidence() >= self.min_confidence
            && (self.include_speculative || !fact.is_speculative())
    }
}

impl PartialEq for FactFilter {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span
            && self.category == other.category
            && self.predicate == other.predicate
            && self.min_confidence.to_bits() == other.min_confidence.to_bits()
            && self.include_speculative == other.include_speculative
    }
}

impl Eq for FactFilter {}

impl Hash for FactFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.span.hash(state);
        self.category.hash(state);
        self.predicate.hash(state);
        self.min_confidence.to_bits().hash(state);
        self.include_speculative.hash(state);
    }
}

/// A question asked of the fact index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// Facts whose subject strictly overlaps the span.
    Overlapping(Span),
    /// Facts of one category, in subject order.
    ByCategory(Category),
    /// Facts created at exactly this generation.
    ByGeneration(Generation),
    /// Facts whose subject contains the byte offset.
    Containing(u32),
    Filter(FactFilter),
}

impl Query {
    /// The region of text whose facts decide this query's result, if it is
    /// spatially bounded.
    pub fn span(&self) -> Option<Span> {
        match self {
            Query::Overlapping(span) => Some(*span),
            Query::Containing(offset) => Some(Span::new(*offset, offset.saturating_add(1))),
            Query::Filter(filter) => filter.span,
            Query::ByCategory(_) | Query::ByGeneration(_) => None,
        }
    }

    /// The category this query is restricted to, if any.
    pub fn category(&self) -> Option<Category> {
        match self {
            Query::ByCategory(category) => Some(*category),
            Query::Filter(filter) => filter.category,
            _ => None,
        }
    }
}
