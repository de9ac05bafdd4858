//! Bounded bump arena for transient generator storage.
//!
//! The arena tracks a byte budget and hands out [`Bytes`] copies of the
//! data it is given. Each allocation owns exactly its own bytes, so a value
//! kept in a request retains only its payload once the arena is dropped.
//!
//! Unlike a growable arena, an allocation that does not fit in the remaining
//! budget fails with [`NexusError::SizeOverflow`].

use std::cell::Cell;
use std::fmt;

use bytes::Bytes;

use crate::constants::DEFAULT_ARENA_SIZE;
use crate::error::{NexusError, NexusResult};

/// A bounded, single-owner scratch arena.
///
/// `Arena` is `Send` but not `Sync`: one generator invocation owns it and no
/// other thread observes it.
///
/// # Example
///
/// ```rust
/// use nexus_common::memory::Arena;
///
/// let arena = Arena::with_limit(16);
/// let key = arena.alloc_str("row-1").unwrap();
/// assert_eq!(&key[..], b"row-1");
/// assert_eq!(arena.bytes_used(), 5);
/// assert!(arena.alloc_bytes(&[0u8; 12]).is_err());
/// ```
pub struct Arena {
    /// Total budget in bytes.
    limit: usize,
    /// Bytes handed out so far.
    used: Cell<usize>,
    /// Number of successful allocations.
    allocations: Cell<usize>,
}

impl Arena {
    /// Creates an arena with the default 2 MB budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_ARENA_SIZE)
    }

    /// Creates an arena with the given byte budget.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            used: Cell::new(0),
            allocations: Cell::new(0),
        }
    }

    /// Charges `data` against the budget and returns an owned copy of it.
    ///
    /// # Errors
    ///
    /// Returns `SizeOverflow` if `data` does not fit in the remaining budget.
    pub fn alloc_bytes(&self, data: &[u8]) -> NexusResult<Bytes> {
        let used = self.used.get();
        let size = used.saturating_add(data.len());
        if size > self.limit {
            return Err(NexusError::SizeOverflow {
                size,
                limit: self.limit,
            });
        }

        let view = Bytes::copy_from_slice(data);

        self.used.set(size);
        self.allocations.set(self.allocations.get() + 1);
        Ok(view)
    }

    /// Copies a string into the arena.
    ///
    /// # Errors
    ///
    /// Returns `SizeOverflow` if the string does not fit.
    pub fn alloc_str(&self, s: &str) -> NexusResult<Bytes> {
        self.alloc_bytes(s.as_bytes())
    }

    /// Returns the number of bytes handed out.
    #[inline]
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.used.get()
    }

    /// Returns the number of bytes still available.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.used.get()
    }

    /// Returns the total budget.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of successful allocations.
    #[inline]
    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.allocations.get()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("limit", &self.limit)
            .field("bytes_used", &self.bytes_used())
            .field("allocations", &self.allocation_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_basic() {
        let arena = Arena::with_limit(64);
        let a = arena.alloc_bytes(b"hello").unwrap();
        let b = arena.alloc_str("world").unwrap();

        assert_eq!(&a[..], b"hello");
        assert_eq!(&b[..], b"world");
        assert_eq!(arena.bytes_used(), 10);
        assert_eq!(arena.remaining(), 54);
        assert_eq!(arena.allocation_count(), 2);
    }

    #[test]
    fn test_arena_exact_fit() {
        let arena = Arena::with_limit(4);
        assert!(arena.alloc_bytes(b"abcd").is_ok());
        assert_eq!(arena.remaining(), 0);
        assert!(arena.alloc_bytes(b"").is_ok());
    }

    #[test]
    fn test_arena_overflow_leaves_state() {
        let arena = Arena::with_limit(8);
        arena.alloc_bytes(b"12345").unwrap();

        let err = arena.alloc_bytes(b"6789").unwrap_err();
        assert!(matches!(err, NexusError::SizeOverflow { size: 9, limit: 8 }));
        assert_eq!(arena.bytes_used(), 5);
        assert_eq!(arena.allocation_count(), 1);
    }

    #[test]
    fn test_views_outlive_arena() {
        let view = {
            let arena = Arena::with_limit(16);
            arena.alloc_str("kept").unwrap()
        };
        assert_eq!(&view[..], b"kept");
    }

    #[test]
    fn test_views_do_not_share_budget() {
        let arena = Arena::with_limit(1 << 20);
        let a = arena.alloc_str("ab").unwrap();
        let b = arena.alloc_str("cd").unwrap();
        drop(arena);

        // Each view is its own allocation, not a slice of a reserved region.
        let (a_vec, b_vec) = (Vec::from(a), Vec::from(b));
        assert_eq!(a_vec, b"ab");
        assert_eq!(b_vec, b"cd");
        assert!(a_vec.capacity() < 64);
        assert!(b_vec.capacity() < 64);
    }

    #[test]
    fn test_default_budget() {
        let arena = Arena::default();
        assert_eq!(arena.limit(), DEFAULT_ARENA_SIZE);
    }
}
