//! Handles to heap-allocated objects
//!
//! This module provides `GcRef`, the handle through which values reach
//! heap-allocated objects.

use std::fmt;

/// A handle to a heap-allocated object
///
/// A `GcRef` names a heap slot plus the generation the slot had when the
/// object was allocated. Freeing the object bumps the slot generation, so
/// a handle that outlives its object is detected instead of silently
/// reaching whatever reuses the slot.
///
/// Equality and hashing are by slot and generation: two handles are equal
/// exactly when they name the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcRef {
    index: u32,
    generation: u32,
}

impl GcRef {
    /// Create a handle (used by the heap allocator)
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the heap
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot at allocation time
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for GcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcRef({}#{})", self.index, self.generation)
    }
}
