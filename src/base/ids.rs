//! Identifiers and the process-wide id/generation allocator.
//!
//! Ids are plain integers so cross-references between facts never form
//! ownership cycles. Nothing in the crate owns a global counter: every layer
//! receives an [`IdAllocator`] handle at construction, and tests may start one
//! at a known value.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub $inner);

        impl $name {
            #[inline]
            pub const fn raw(self) -> $inner {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a fact, unique for the lifetime of the process.
    FactId(u64),
    "f"
);
id_type!(
    /// Identifier of a Layer-0 token.
    TokenId(u64),
    "t"
);
id_type!(
    /// Identifier of a Layer-1 boundary.
    BoundaryId(u64),
    "b"
);
id_type!(
    /// Monotonic version counter, advanced exactly once per edit.
    Generation(u64),
    "g"
);

impl Generation {
    pub const ZERO: Generation = Generation(0);

    #[inline]
    pub const fn next(self) -> Generation {
        Generation(self.0 + 1)
    }
}

/// Thread-safe source of ids and generations.
///
/// Shared between layers behind an `Arc`. Counters only ever increase, so an
/// id handed out once is never handed out again.
#[derive(Debug)]
pub struct IdAllocator {
    next_fact: AtomicU64,
    next_token: AtomicU64,
    next_boundary: AtomicU64,
    generation: AtomicU64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator whose first fact, token and boundary id is `first`.
    ///
    /// Deterministic tests use this to predict ids.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next_fact: AtomicU64::new(first),
            next_token: AtomicU64::new(first),
            next_boundary: AtomicU64::new(first),
            generation: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn fact_id(&self) -> FactId {
        FactId(self.next_fact.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn token_id(&self) -> TokenId {
        TokenId(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn boundary_id(&self) -> BoundaryId {
        BoundaryId(self.next_boundary.fetch_add(1, Ordering::Relaxed))
    }

    /// Advance the generation and return the new value.
    pub fn next_generation(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// Whether `id` was ever handed out by this allocator.
    pub fn issued(&self, id: FactId) -> bool {
        id.0 < self.next_fact.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_allocator_is_deterministic() {
        let alloc = IdAllocator::starting_at(100);
        assert_eq!(alloc.fact_id(), FactId(100));
        assert_eq!(alloc.fact_id(), FactId(101));
        assert_eq!(alloc.token_id(), TokenId(100));
        assert!(alloc.issued(FactId(101)));
        assert!(!alloc.issued(FactId(102)));
    }

    #[test]
    fn test_generation_advances_once_per_call() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.generation(), Generation::ZERO);
        assert_eq!(alloc.next_generation(), Generation(1));
        assert_eq!(alloc.next_generation(), Generation(2));
        assert_eq!(alloc.generation(), Generation(2));
    }

    #[test]
    fn test_default_generation_is_zero() {
        assert_eq!(Generation::default(), Generation::ZERO);
        assert_eq!(crate::fact::FactDelta::default().generation, Generation::ZERO);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let alloc = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                std::thread::spawn(move || (0..1000).map(|_| alloc.fact_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<FactId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4000);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", FactId(7)), "f7");
        assert_eq!(format!("{:?}", Generation(3)), "g3");
    }
}
