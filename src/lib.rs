//! # strata-base
//!
//! Incremental stratified parsing: source edits flow through three parsing
//! layers of increasing cost and come out as a delta over a queryable store
//! of facts about the text.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide        → Folding, semantic tokens, diagnostics over an engine
//!   ↓
//! engine     → Edit pipeline, viewport, subscriptions, query front door
//!   ↓
//! detail     → Layer 2: per-boundary parsing, boundary cache, reconciliation
//!   ↓
//! structure  → Layer 1: bracket matching into nested boundaries
//!   ↓
//! grammar    → Language plugins (JSON, curly-brace, plain text)
//!   ↓
//! lexer      → Layer 0: resumable lexer, incremental token store
//!   ↓
//! index      → Fact index, snapshots, query cache
//!   ↓
//! fact       → Facts, predicates, drafts, deltas
//!   ↓
//! base       → Primitives (Span, EditMap, ids, pools)
//! ```

// ============================================================================
// MODULES (dependency order: base → fact → index → lexer → grammar → ...)
// ============================================================================

/// Foundation types: Span, EditMap, ids, pools
pub mod base;

/// Facts: immutable assertions about spans
pub mod fact;

/// Fact index: snapshots, queries and the query cache
pub mod index;

/// Layer 0: streaming lexer and token store
pub mod lexer;

/// Language plugins driving all three layers
pub mod grammar;

/// Layer 1: structural boundaries
pub mod structure;

/// Layer 2: detailed parsing into fact deltas
pub mod detail;

/// The incremental pipeline behind one buffer
pub mod engine;

/// IDE features: folding, semantic tokens, diagnostics
pub mod ide;

// Re-export foundation types
pub use base::{EditMap, FactId, Generation, LineCol, LineIndex, Span, TextRange, TextSize};

// Re-export the pipeline's front door
pub use engine::{Edit, EditOutcome, Engine, EngineConfig, EngineError};
pub use fact::{Fact, FactDelta, Predicate};
pub use grammar::LanguageId;
pub use index::Query;
