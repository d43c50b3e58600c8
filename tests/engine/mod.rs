//! Engine tests
//!
//! Tests for:
//! - Worked scenarios over JSON input
//! - Incremental edits matching a fresh parse
//! - Viewport ordering, deferral and cancellation
//! - Queries, the query cache and subscriptions

pub mod tests_incremental;
pub mod tests_queries;
pub mod tests_scenarios;
pub mod tests_viewport;
