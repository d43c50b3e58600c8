//! Shared helpers for integration tests.

pub mod engine_helpers;
pub mod fact_assertions;
