//! Foundation types for the strata engine.
//!
//! This module provides fundamental types used throughout the pipeline:
//! - [`Span`], [`EditMap`] - Byte ranges and edit rebasing
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`FactId`], [`Generation`], [`IdAllocator`] - Identifiers
//! - [`Pool`], [`Arena`] - Recycled buffers and per-parse arenas
//!
//! This module has NO dependencies on other strata modules.

mod ids;
mod pool;
mod span;

pub use ids::{BoundaryId, FactId, Generation, IdAllocator, TokenId};
pub use pool::{Arena, ArenaId, Pool, Pooled};
pub use span::{EditMap, LineCol, LineIndex, Span, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
