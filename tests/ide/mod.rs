//! IDE feature tests
//!
//! Tests for:
//! - Diagnostics
//! - Folding ranges
//! - Semantic tokens

pub mod tests_diagnostics;
pub mod tests_folding;
pub mod tests_semantic_tokens;
