//! Memory-layout descriptors
//!
//! Plain snapshots of the header shape behind sequences and text:
//!
//! ```text
//! SequenceHeader            TextHeader
//! ┌──────────────┐          ┌──────────────┐
//! │ data: usize  │          │ data: usize  │
//! │ len:  usize  │          │ len:  usize  │
//! │ cap:  usize  │          └──────────────┘
//! └──────────────┘
//! ```
//!
//! Headers are read-only descriptions. They never keep the described
//! storage alive and carry no ownership.

/// Header of a growable sequence: data address, length, capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceHeader {
    /// Address of the first element slot
    pub data: usize,
    /// Number of live elements
    pub len: usize,
    /// Declared capacity
    pub cap: usize,
}

impl SequenceHeader {
    /// Check whether two headers describe the same shape (length and capacity)
    pub fn same_shape(&self, other: &SequenceHeader) -> bool {
        self.len == other.len && self.cap == other.cap
    }
}

/// Header of an immutable text: data address, byte length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextHeader {
    /// Address of the first byte
    pub data: usize,
    /// Length in bytes
    pub len: usize,
}

impl TextHeader {
    /// View this text header as a sequence header with `cap == len`
    pub fn as_sequence(&self) -> SequenceHeader {
        SequenceHeader {
            data: self.data,
            len: self.len,
            cap: self.len,
        }
    }
}
