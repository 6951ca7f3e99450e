//! Object header
//!
//! Every heap-allocated object has a header that stores metadata next to
//! the payload.

use crate::object::ObjectKind;

/// Header stored alongside each allocated object
///
/// Layout in memory:
/// ```text
/// ┌─────────────────────────────────────────┐
/// │ GcHeader                                │
/// │  - object_id: u64                       │
/// │  - kind: ObjectKind                     │
/// │  - size: usize                          │
/// ├─────────────────────────────────────────┤  ← identity address
/// │ HeapObject payload                      │
/// └─────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcHeader {
    /// Unique object ID within the owning heap
    object_id: u64,

    /// Kind of the payload
    kind: ObjectKind,

    /// Approximate size of the allocation at allocation time
    size: usize,
}

impl GcHeader {
    /// Create a new header
    pub fn new(object_id: u64, kind: ObjectKind, size: usize) -> Self {
        Self {
            object_id,
            kind,
            size,
        }
    }

    /// Get the object ID
    #[inline]
    pub fn object_id(&self) -> u64 {
        self.object_id
    }

    /// Get the payload kind
    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Get the allocation size
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}
