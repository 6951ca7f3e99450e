//! Heap management
//!
//! # Architecture
//!
//! - **GcRef**: generation-checked handle to a heap object
//! - **GcHeader**: metadata stored with each allocated object
//! - **Heap**: slot allocator; owns every object reachable through a `GcRef`
//!
//! There is no collector: objects live until [`Heap::free`] is called or the
//! heap is dropped.
//!
//! # Example
//!
//! ```ignore
//! use replica_engine::gc::Heap;
//! use replica_engine::object::{Boxed, HeapObject};
//!
//! let mut heap = Heap::new();
//! let cell = heap.allocate(HeapObject::Boxed(Boxed::default()));
//! let block = heap.malloc(64);
//! heap.free(block)?;
//! ```

mod header;
mod heap;
mod ptr;

pub use header::GcHeader;
pub use heap::{Heap, HeapStats};
pub use ptr::GcRef;
