//! Engine configuration.

use std::time::Duration;

use crate::base::Span;
use crate::detail::DetailLimits;

/// Tuning knobs for an [`Engine`](super::Engine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum boundary nesting; deeper brackets are not structural, and a
    /// boundary's internal recursion budget is what remains of it.
    pub max_depth: u32,
    /// Cache misses parsed per edit before the rest is deferred.
    pub max_boundaries_per_parse: usize,
    /// Entries of the per-boundary parse cache.
    pub boundary_cache_capacity: usize,
    /// Entries of the query result cache.
    pub query_cache_capacity: usize,
    /// Age after which a cached query result is dropped even if valid.
    pub query_cache_ttl: Option<Duration>,
    /// Parse independent boundaries on the rayon pool.
    pub parallel: bool,
    /// Buffered deltas per subscriber before a slow one starts lagging.
    pub subscriber_capacity: usize,
    /// Region parsed first and never deferred past the budget's head.
    pub viewport: Option<Span>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_boundaries_per_parse: 512,
            boundary_cache_capacity: 1024,
            query_cache_capacity: 256,
            query_cache_ttl: None,
            parallel: true,
            subscriber_capacity: 64,
            viewport: None,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_boundaries_per_parse(mut self, max: usize) -> Self {
        self.max_boundaries_per_parse = max;
        self
    }

    pub fn with_boundary_cache_capacity(mut self, capacity: usize) -> Self {
        self.boundary_cache_capacity = capacity;
        self
    }

    pub fn with_query_cache_capacity(mut self, capacity: usize) -> Self {
        self.query_cache_capacity = capacity;
        self
    }

    pub fn with_query_cache_ttl(mut self, ttl: Duration) -> Self {
        self.query_cache_ttl = Some(ttl);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    pub fn with_viewport(mut self, viewport: Span) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub(crate) fn detail_limits(&self) -> DetailLimits {
        DetailLimits {
            max_depth: self.max_depth,
            max_boundaries_per_parse: self.max_boundaries_per_parse,
            cache_capacity: self.boundary_cache_capacity,
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_max_depth(8)
            .with_parallel(false)
            .with_viewport(Span::new(0, 10));
        assert_eq!(config.max_depth, 8);
        assert!(!config.parallel);
        assert_eq!(config.viewport, Some(Span::new(0, 10)));
        assert_eq!(config.detail_limits().max_depth, 8);
        assert_eq!(config.query_cache_capacity, 256);
    }
}
