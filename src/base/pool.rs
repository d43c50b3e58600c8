//! Pooled buffers and per-parse arenas.
//!
//! Steady-state parsing recycles its fact draft buffers instead of
//! returning them to the allocator after every edit. [`Pool`] hands out
//! fixed-capacity `Vec<T>` buffers that return themselves on drop;
//! [`Arena`] is a typed bump-style store with index handles for state that
//! lives exactly as long as one parse.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// A thread-safe pool of reusable `Vec<T>` buffers of a fixed capacity.
#[derive(Debug)]
pub struct Pool<T> {
    free: Mutex<Vec<Vec<T>>>,
    chunk: usize,
    max_free: usize,
}

impl<T> Pool<T> {
    /// Create a pool whose buffers start with `chunk` capacity and which
    /// keeps at most `max_free` idle buffers around.
    pub fn new(chunk: usize, max_free: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            chunk,
            max_free,
        }
    }

    /// Take an empty buffer, reusing an idle one when available.
    pub fn take(&self) -> Pooled<'_, T> {
        let buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.chunk));
        Pooled { buf, pool: self }
    }

    /// Take an empty buffer as a detached `Vec`; hand it back with
    /// [`Pool::give_back`].
    pub fn take_vec(&self) -> Vec<T> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.chunk))
    }

    /// Return a buffer to the pool. Undersized buffers are dropped.
    pub fn give_back(&self, mut buf: Vec<T>) {
        if buf.capacity() < self.chunk {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_free {
            free.push(buf);
        }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// A buffer borrowed from a [`Pool`]; returns to it on drop.
pub struct Pooled<'a, T> {
    buf: Vec<T>,
    pool: &'a Pool<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.buf
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.buf
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.give_back(buf);
    }
}

/// Handle to a value stored in an [`Arena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub u32);

impl ArenaId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Typed arena for transient per-parse state.
///
/// Values are only ever appended; [`Arena::reset`] drops them all at once
/// and keeps the capacity for the next parse.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena on top of an existing (typically pooled) buffer.
    pub fn from_vec(mut items: Vec<T>) -> Self {
        items.clear();
        Self { items }
    }

    pub fn alloc(&mut self, value: T) -> ArenaId {
        let id = ArenaId(self.items.len() as u32);
        self.items.push(value);
        id
    }

    pub fn get(&self, id: ArenaId) -> Option<&T> {
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: ArenaId) -> Option<&mut T> {
        self.items.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every value past `len`, used to roll back a failed sub-parse.
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArenaId, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ArenaId(i as u32), item))
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}
