//! Heap allocator for engine-managed objects
//!
//! Objects are boxed individually, so the address of an object's payload
//! stays put for as long as the object is alive, however many other
//! objects come and go. That address is what the copier uses as identity.

use tracing::{debug, trace};

use super::header::GcHeader;
use super::ptr::GcRef;
use crate::error::{CopyError, CopyResult};
use crate::object::{
    Boxed, ChannelObject, Closure, HeapObject, MapObject, NativeObject, ObjectKind, RawBlock,
    Sequence,
};
use crate::value::RawHandle;

/// Allocated object with its header
#[derive(Debug)]
struct HeapCell {
    header: GcHeader,
    object: HeapObject,
}

/// Heap slot; `cell` is `None` while the slot sits on the free list
#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    cell: Option<Box<HeapCell>>,
}

/// Heap statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live objects
    pub live_objects: usize,
    /// Approximate bytes held by live objects, each sized when it was allocated
    pub allocated_bytes: usize,
    /// Slots waiting on the free list
    pub free_slots: usize,
}

/// Heap allocator
#[derive(Debug, Default)]
pub struct Heap {
    /// Object slots indexed by `GcRef::index`
    slots: Vec<Slot>,

    /// Indices of free slots, reused LIFO
    free_list: Vec<u32>,

    /// Number of live objects
    live: usize,

    /// Approximate bytes held by live objects, each sized when it was allocated
    allocated_bytes: usize,

    /// Next object ID handed to a header
    next_object_id: u64,
}

macro_rules! typed_accessors {
    ($($variant:ident => $ty:ty, $get:ident, $get_mut:ident;)*) => {
        $(
            #[doc = concat!("Borrow the `", stringify!($ty), "` behind `r`")]
            pub fn $get(&self, r: GcRef) -> CopyResult<&$ty> {
                match self.get(r)? {
                    HeapObject::$variant(object) => Ok(object),
                    other => Err(kind_mismatch(r, ObjectKind::$variant, other.kind())),
                }
            }

            #[doc = concat!("Mutably borrow the `", stringify!($ty), "` behind `r`")]
            pub fn $get_mut(&mut self, r: GcRef) -> CopyResult<&mut $ty> {
                match self.get_mut(r)? {
                    HeapObject::$variant(object) => Ok(object),
                    other => {
                        let found = other.kind();
                        Err(kind_mismatch(r, ObjectKind::$variant, found))
                    }
                }
            }
        )*
    };
}

fn kind_mismatch(r: GcRef, expected: ObjectKind, found: ObjectKind) -> CopyError {
    CopyError::contract(format!("{} holds a {}, expected a {}", r, found, expected))
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty heap with room for `capacity` objects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Allocate an object on the heap
    pub fn allocate(&mut self, object: HeapObject) -> GcRef {
        let kind = object.kind();
        let size = object.approx_size();
        let header = GcHeader::new(self.next_object_id, kind, size);
        self.next_object_id += 1;

        let cell = Box::new(HeapCell { header, object });
        let r = match self.free_list.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.cell = Some(cell);
                GcRef::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    cell: Some(cell),
                });
                GcRef::new(index, 0)
            }
        };

        self.live += 1;
        self.allocated_bytes += size;
        trace!(%r, %kind, size, "allocated");
        r
    }

    /// Allocate a zero-initialized raw block of `size` bytes
    pub fn malloc(&mut self, size: usize) -> GcRef {
        self.allocate(HeapObject::RawBlock(RawBlock::zeroed(size)))
    }

    /// Free an object, returning its payload
    ///
    /// The slot generation is bumped, so every outstanding handle to the
    /// object becomes stale.
    pub fn free(&mut self, r: GcRef) -> CopyResult<HeapObject> {
        let slot = self.live_slot_mut(r)?;
        let cell = slot
            .cell
            .take()
            .ok_or_else(|| CopyError::contract(format!("{} is not allocated", r)))?;
        slot.generation = slot.generation.wrapping_add(1);

        self.free_list.push(r.index() as u32);
        self.live -= 1;
        self.allocated_bytes -= cell.header.size();
        debug!(%r, kind = %cell.header.kind(), "freed");
        Ok(cell.object)
    }

    /// Check whether `r` names a live object
    pub fn contains(&self, r: GcRef) -> bool {
        self.cell(r).is_ok()
    }

    /// Get number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no object is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Heap statistics
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.live,
            allocated_bytes: self.allocated_bytes,
            free_slots: self.free_list.len(),
        }
    }

    /// Borrow the object behind `r`
    pub fn get(&self, r: GcRef) -> CopyResult<&HeapObject> {
        self.cell(r).map(|cell| &cell.object)
    }

    /// Mutably borrow the object behind `r`
    pub fn get_mut(&mut self, r: GcRef) -> CopyResult<&mut HeapObject> {
        let slot = self.live_slot_mut(r)?;
        slot.cell
            .as_deref_mut()
            .map(|cell| &mut cell.object)
            .ok_or_else(|| CopyError::contract(format!("{} is not allocated", r)))
    }

    /// Header of the object behind `r`
    pub fn header(&self, r: GcRef) -> CopyResult<&GcHeader> {
        self.cell(r).map(|cell| &cell.header)
    }

    /// Address of the payload behind `r`
    ///
    /// Stable for as long as the object is alive; two live handles have the
    /// same address exactly when they name the same object.
    pub fn address_of(&self, r: GcRef) -> CopyResult<usize> {
        self.cell(r)
            .map(|cell| &cell.object as *const HeapObject as usize)
    }

    /// Address of a raw block's bytes
    pub fn raw_handle(&self, r: GcRef) -> CopyResult<RawHandle> {
        self.raw_block(r).map(RawBlock::handle)
    }

    /// Borrow the native object behind `r`
    pub fn native(&self, r: GcRef) -> CopyResult<&dyn NativeObject> {
        match self.get(r)? {
            HeapObject::Native(object) => Ok(&**object),
            other => Err(kind_mismatch(r, ObjectKind::Native, other.kind())),
        }
    }

    typed_accessors! {
        Sequence => Sequence, sequence, sequence_mut;
        Map => MapObject, map, map_mut;
        Channel => ChannelObject, channel, channel_mut;
        Boxed => Boxed, boxed, boxed_mut;
        Closure => Closure, closure, closure_mut;
        RawBlock => RawBlock, raw_block, raw_block_mut;
    }

    fn cell(&self, r: GcRef) -> CopyResult<&HeapCell> {
        let slot = self
            .slots
            .get(r.index())
            .ok_or_else(|| CopyError::contract(format!("{} is outside the heap", r)))?;
        if slot.generation != r.generation() {
            return Err(CopyError::contract(format!("{} is stale", r)));
        }
        slot.cell
            .as_deref()
            .ok_or_else(|| CopyError::contract(format!("{} is not allocated", r)))
    }

    fn live_slot_mut(&mut self, r: GcRef) -> CopyResult<&mut Slot> {
        let slot = self
            .slots
            .get_mut(r.index())
            .ok_or_else(|| CopyError::contract(format!("{} is outside the heap", r)))?;
        if slot.generation != r.generation() {
            return Err(CopyError::contract(format!("{} is stale", r)));
        }
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_allocate_and_get() {
        let mut heap = Heap::new();
        let r = heap.allocate(HeapObject::Boxed(Boxed::new(Value::i32(42))));

        assert_eq!(heap.len(), 1);
        assert_eq!(heap.boxed(r).unwrap().get(), &Value::i32(42));
        assert_eq!(heap.header(r).unwrap().kind(), ObjectKind::Boxed);
    }

    #[test]
    fn test_kind_mismatch_is_contract_violation() {
        let mut heap = Heap::new();
        let r = heap.allocate(HeapObject::Map(MapObject::new()));

        let err = heap.sequence(r).unwrap_err();
        assert!(matches!(err, CopyError::ContractViolation(_)));
        assert!(err.to_string().contains("expected a sequence"));
    }

    #[test]
    fn test_free_makes_handle_stale() {
        let mut heap = Heap::new();
        let r = heap.allocate(HeapObject::Boxed(Boxed::default()));
        heap.free(r).unwrap();

        assert!(!heap.contains(r));
        assert!(heap.get(r).is_err());
        assert!(heap.free(r).is_err());

        // Slot reuse hands out a fresh generation
        let reused = heap.allocate(HeapObject::Boxed(Boxed::default()));
        assert_eq!(reused.index(), r.index());
        assert_ne!(reused, r);
        assert!(heap.get(r).is_err());
        assert!(heap.get(reused).is_ok());
    }

    #[test]
    fn test_address_is_stable_across_growth() {
        let mut heap = Heap::new();
        let first = heap.allocate(HeapObject::Boxed(Boxed::default()));
        let before = heap.address_of(first).unwrap();

        for _ in 0..1000 {
            heap.allocate(HeapObject::Boxed(Boxed::default()));
        }

        assert_eq!(heap.address_of(first).unwrap(), before);
    }

    #[test]
    fn test_distinct_objects_have_distinct_addresses() {
        let mut heap = Heap::new();
        let a = heap.allocate(HeapObject::Boxed(Boxed::default()));
        let b = heap.allocate(HeapObject::Boxed(Boxed::default()));
        assert_ne!(heap.address_of(a).unwrap(), heap.address_of(b).unwrap());
    }

    #[test]
    fn test_malloc_zeroed_block() {
        let mut heap = Heap::new();
        let r = heap.malloc(32);

        let block = heap.raw_block(r).unwrap();
        assert_eq!(block.len(), 32);
        assert!(block.as_bytes().iter().all(|b| *b == 0));
        assert_eq!(heap.raw_handle(r).unwrap(), block.handle());
    }

    #[test]
    fn test_stats_track_live_objects() {
        let mut heap = Heap::with_capacity(4);
        let a = heap.malloc(100);
        let _b = heap.malloc(10);
        assert_eq!(heap.stats().live_objects, 2);
        let bytes = heap.stats().allocated_bytes;
        assert!(bytes >= 110);

        heap.free(a).unwrap();
        let stats = heap.stats();
        assert_eq!(stats.live_objects, 1);
        assert_eq!(stats.free_slots, 1);
        assert!(stats.allocated_bytes < bytes);
    }

    #[test]
    fn test_allocated_bytes_fixed_at_allocation() {
        let mut heap = Heap::new();
        let r = heap.allocate(HeapObject::Map(MapObject::new()));
        let bytes = heap.stats().allocated_bytes;

        let map = heap.map_mut(r).unwrap();
        for i in 0..64 {
            map.insert(Value::i64(i), Value::str("grown after allocation"));
        }
        assert_eq!(heap.stats().allocated_bytes, bytes);

        heap.free(r).unwrap();
        assert_eq!(heap.stats().allocated_bytes, 0);
    }
}
