//! Structural deep copy
//!
//! # Flow
//!
//! ```text
//! deep_copy(value)
//!   └─ DeepCopier::run          fresh IdentityTable per call
//!        └─ copy_value          nil short-circuits, then classify
//!             ├─ Scalar / Text / FixedArray / Aggregate   rebuilt inline
//!             ├─ OpaqueHandle / Callable                  returned verbatim
//!             └─ DynamicSequence / AssociativeMap /
//!                QueueHandle / Indirection                lookup → allocate
//!                                                         → register → fill
//! ```
//!
//! Identity-bearing copies are registered in the table before their
//! children are copied, so a cycle back to an object finds its (partially
//! filled) copy instead of recursing again.
//!
//! A failed copy frees every heap object it allocated before returning the
//! error; the heap is left as it was before the call.

mod classify;
mod identity;

pub use classify::{classify, Category};
pub use identity::{Identity, IdentityTable};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::class_registry::ClassRegistry;
use crate::defaults::DEFAULT_TABLE_CAPACITY;
use crate::error::{CopyError, CopyResult};
use crate::gc::{GcRef, Heap};
use crate::object::{
    Boxed, ChannelObject, FixedArray, HeapObject, MapObject, ObjectKind, Record, Sequence,
};
use crate::value::Value;

/// Counters collected during one deep copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Values visited, nils included
    pub visited: usize,
    /// Distinct identity-bearing source objects copied
    pub identities: usize,
    /// Lookups that resolved to an existing copy
    pub shared_hits: usize,
    /// Heap objects allocated for the result
    pub allocations: usize,
}

/// Deep-copy `value`, allocating the copy on `heap`
pub fn deep_copy(heap: &mut Heap, classes: &ClassRegistry, value: &Value) -> CopyResult<Value> {
    DeepCopier::new(heap, classes).run(value).map(|(copy, _)| copy)
}

/// Deep-copy `value` and report what the copy did
pub fn deep_copy_with_stats(
    heap: &mut Heap,
    classes: &ClassRegistry,
    value: &Value,
) -> CopyResult<(Value, CopyStats)> {
    DeepCopier::new(heap, classes).run(value)
}

/// Copy context for one top-level deep copy
///
/// Owns the identity table and the list of objects allocated so far. Both
/// are dropped when [`DeepCopier::run`] returns.
pub struct DeepCopier<'a> {
    heap: &'a mut Heap,
    classes: &'a ClassRegistry,
    table: IdentityTable,
    stats: CopyStats,
    allocated: Vec<GcRef>,
}

impl<'a> DeepCopier<'a> {
    /// Create a copier with the default table capacity
    pub fn new(heap: &'a mut Heap, classes: &'a ClassRegistry) -> Self {
        Self::with_table_capacity(heap, classes, DEFAULT_TABLE_CAPACITY)
    }

    /// Create a copier whose identity table starts with room for `capacity` entries
    pub fn with_table_capacity(
        heap: &'a mut Heap,
        classes: &'a ClassRegistry,
        capacity: usize,
    ) -> Self {
        Self {
            heap,
            classes,
            table: IdentityTable::with_capacity(capacity),
            stats: CopyStats::default(),
            allocated: Vec::new(),
        }
    }

    /// Copy `value`, consuming the context
    pub fn run(mut self, value: &Value) -> CopyResult<(Value, CopyStats)> {
        debug!(kind = value.type_name(), "deep copy started");

        match self.copy_value(value) {
            Ok(copy) => {
                self.stats.identities = self.table.len();
                self.stats.allocations = self.allocated.len();
                debug!(
                    visited = self.stats.visited,
                    identities = self.stats.identities,
                    shared_hits = self.stats.shared_hits,
                    allocations = self.stats.allocations,
                    "deep copy finished"
                );
                Ok((copy, self.stats))
            }
            Err(err) => {
                warn!(error = %err, rolled_back = self.allocated.len(), "deep copy aborted");
                self.rollback();
                Err(err)
            }
        }
    }

    fn rollback(&mut self) {
        for r in std::mem::take(&mut self.allocated).into_iter().rev() {
            if let Err(err) = self.heap.free(r) {
                warn!(%r, error = %err, "rollback could not free partial copy");
            }
        }
    }

    fn copy_value(&mut self, value: &Value) -> CopyResult<Value> {
        self.stats.visited += 1;
        if value.is_nil() {
            return Ok(Value::Nil);
        }

        let category = classify(value, self.heap, self.classes)?;
        match (category, value) {
            (Category::Scalar, Value::Scalar(scalar)) => Ok(Value::Scalar(*scalar)),
            (Category::Text, Value::Str(text)) => Ok(Value::Str(text.detach())),
            (Category::OpaqueHandle, Value::Address(_) | Value::RawPtr(_))
            | (Category::Callable, Value::Func(_)) => Ok(value.clone()),
            (Category::FixedArray, Value::Array(array)) => self.copy_array(array),
            (Category::DynamicSequence, Value::Slice(r)) => self.copy_sequence(*r),
            (Category::AssociativeMap, Value::Map(r)) => self.copy_map(*r),
            (Category::QueueHandle, Value::Chan(r)) => self.copy_channel(*r),
            (Category::Indirection, Value::Ptr(r)) => self.copy_pointer(*r),
            (Category::Aggregate, Value::Record(record)) => self.copy_record(record),
            (category, other) => {
                warn!(%category, kind = other.type_name(), "classifier and copier disagree");
                Err(CopyError::unsupported(other.type_name()))
            }
        }
    }

    fn copy_array(&mut self, array: &FixedArray) -> CopyResult<Value> {
        let elements = array
            .iter()
            .map(|element| self.copy_value(element))
            .collect::<CopyResult<Vec<_>>>()?;
        Ok(Value::Array(FixedArray::new(elements)))
    }

    fn copy_sequence(&mut self, source: Option<GcRef>) -> CopyResult<Value> {
        let Some(r) = source else {
            return Ok(Value::Slice(None));
        };
        let identity = self.identity(r, ObjectKind::Sequence)?;
        if let Some(copy) = self.lookup(identity) {
            return Ok(copy);
        }

        let (elements, capacity) = {
            let sequence = self.heap.sequence(r)?;
            (sequence.as_slice().to_vec(), sequence.capacity())
        };
        let copy = self.allocate(HeapObject::Sequence(Sequence::with_capacity(
            elements.len(),
            capacity,
        )));
        self.table.insert(identity, Value::Slice(Some(copy)))?;

        for (index, element) in elements.iter().enumerate() {
            let element = self.copy_value(element)?;
            self.heap
                .sequence_mut(copy)?
                .set(index, element)
                .map_err(CopyError::contract)?;
        }
        Ok(Value::Slice(Some(copy)))
    }

    fn copy_map(&mut self, source: Option<GcRef>) -> CopyResult<Value> {
        let Some(r) = source else {
            return Ok(Value::Map(None));
        };
        let identity = self.identity(r, ObjectKind::Map)?;
        if let Some(copy) = self.lookup(identity) {
            return Ok(copy);
        }

        let entries = self.heap.map(r)?.entries();
        let copy = self.allocate(HeapObject::Map(MapObject::with_capacity(entries.len())));
        self.table.insert(identity, Value::Map(Some(copy)))?;

        for (key, value) in &entries {
            let key = self.copy_value(key)?;
            let value = self.copy_value(value)?;
            if self.heap.map_mut(copy)?.insert(key, value).is_some() {
                return Err(CopyError::contract(format!(
                    "two keys of map {} copied to the same key",
                    r
                )));
            }
        }
        Ok(Value::Map(Some(copy)))
    }

    // Buffered values stay behind; the copy is an open, empty channel.
    fn copy_channel(&mut self, source: Option<GcRef>) -> CopyResult<Value> {
        let Some(r) = source else {
            return Ok(Value::Chan(None));
        };
        let identity = self.identity(r, ObjectKind::Channel)?;
        if let Some(copy) = self.lookup(identity) {
            return Ok(copy);
        }

        let capacity = self.heap.channel(r)?.capacity();
        let copy = self.allocate(HeapObject::Channel(ChannelObject::new(capacity)));
        self.table.insert(identity, Value::Chan(Some(copy)))?;
        Ok(Value::Chan(Some(copy)))
    }

    fn copy_pointer(&mut self, source: Option<GcRef>) -> CopyResult<Value> {
        let Some(r) = source else {
            return Ok(Value::Ptr(None));
        };
        let identity = self.identity(r, ObjectKind::Boxed)?;
        if let Some(copy) = self.lookup(identity) {
            return Ok(copy);
        }

        let pointee = self.heap.boxed(r)?.get().clone();
        let copy = self.allocate(HeapObject::Boxed(Boxed::default()));
        self.table.insert(identity, Value::Ptr(Some(copy)))?;

        let pointee = self.copy_value(&pointee)?;
        self.heap.boxed_mut(copy)?.set(pointee);
        Ok(Value::Ptr(Some(copy)))
    }

    fn copy_record(&mut self, record: &Record) -> CopyResult<Value> {
        let classes = self.classes;
        let class_id = record.class_id();
        let class = classes
            .get_class(class_id)
            .ok_or_else(|| CopyError::unsupported(format!("class#{}", class_id)))?;
        if record.field_count() != class.field_count() {
            return Err(CopyError::contract(format!(
                "record of class `{}` has {} fields, class declares {}",
                class.name,
                record.field_count(),
                class.field_count()
            )));
        }

        let mut copy = Record::zeroed(class);
        for index in 0..class.field_count() {
            let grant = classes.grant(class_id, index)?;
            let field = self.copy_value(grant.read(record)?)?;
            *grant.write(&mut copy)? = field;
        }
        Ok(Value::Record(copy))
    }

    fn identity(&self, r: GcRef, expected: ObjectKind) -> CopyResult<Identity> {
        let found = self.heap.header(r)?.kind();
        if found != expected {
            return Err(CopyError::contract(format!(
                "{} holds a {}, expected a {}",
                r, found, expected
            )));
        }
        Identity::of(self.heap, r)
    }

    fn lookup(&mut self, identity: Identity) -> Option<Value> {
        let hit = self.table.lookup(identity).cloned();
        if hit.is_some() {
            self.stats.shared_hits += 1;
            trace!(%identity, "identity hit");
        }
        hit
    }

    fn allocate(&mut self, object: HeapObject) -> GcRef {
        let r = self.heap.allocate(object);
        self.allocated.push(r);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Class;

    #[test]
    fn test_nil_short_circuits() {
        let mut heap = Heap::new();
        let classes = ClassRegistry::new();
        let (copy, stats) = deep_copy_with_stats(&mut heap, &classes, &Value::Nil).unwrap();
        assert!(copy.is_nil());
        assert_eq!(stats.visited, 1);
        assert_eq!(stats.identities, 0);
    }

    #[test]
    fn test_absent_references_get_no_entry() {
        let mut heap = Heap::new();
        let classes = ClassRegistry::new();
        let source = Value::Array(FixedArray::new(vec![
            Value::Slice(None),
            Value::Map(None),
            Value::Chan(None),
            Value::Ptr(None),
            Value::Func(None),
        ]));

        let (copy, stats) = deep_copy_with_stats(&mut heap, &classes, &source).unwrap();
        assert_eq!(copy, source);
        assert_eq!(stats.identities, 0);
        assert_eq!(stats.allocations, 0);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_text_is_detached() {
        let mut heap = Heap::new();
        let classes = ClassRegistry::new();
        let source = Value::str("hello");

        let copy = deep_copy(&mut heap, &classes, &source).unwrap();
        assert_eq!(copy, source);
        assert!(!copy.as_text().unwrap().shares_storage(source.as_text().unwrap()));
    }

    #[test]
    fn test_sequence_cycle_terminates() {
        let mut heap = Heap::new();
        let classes = ClassRegistry::new();
        let r = heap.allocate(HeapObject::Sequence(Sequence::with_capacity(1, 4)));
        heap.sequence_mut(r).unwrap().set(0, Value::Slice(Some(r))).unwrap();

        let source = Value::Slice(Some(r));
        let (copy, stats) = deep_copy_with_stats(&mut heap, &classes, &source).unwrap();
        let c = copy.gc_ref().unwrap();
        assert_ne!(c, r);
        assert_eq!(heap.sequence(c).unwrap().get(0), Some(&Value::Slice(Some(c))));
        assert_eq!(heap.sequence(c).unwrap().capacity(), 4);
        assert_eq!(stats.identities, 1);
        assert_eq!(stats.shared_hits, 1);
    }

    #[test]
    fn test_kind_mismatch_rolls_back() {
        let mut heap = Heap::new();
        let classes = ClassRegistry::new();
        let map = heap.allocate(HeapObject::Map(MapObject::new()));
        // A sequence whose second element claims a map is a pointer cell
        let seq = heap.allocate(HeapObject::Sequence(Sequence::new(vec![
            Value::i32(1),
            Value::Ptr(Some(map)),
        ])));
        let before = heap.stats();

        let err = deep_copy(&mut heap, &classes, &Value::Slice(Some(seq))).unwrap_err();
        assert!(matches!(err, CopyError::ContractViolation(_)));
        assert_eq!(heap.stats().live_objects, before.live_objects);
    }

    #[test]
    fn test_record_fields_copied_through_grants() {
        let mut heap = Heap::new();
        let mut classes = ClassRegistry::new();
        let id = classes.register_class(Class::new("Secret").with_hidden_field("key"));
        let source = Value::Record(classes.instantiate(id, vec![Value::str("k")]).unwrap());

        let copy = deep_copy(&mut heap, &classes, &source).unwrap();
        let grant = classes.grant(id, 0).unwrap();
        assert_eq!(grant.read(copy.as_record().unwrap()).unwrap(), &Value::str("k"));
    }

    #[test]
    fn test_record_shape_must_match_class() {
        let mut heap = Heap::new();
        let mut classes = ClassRegistry::new();
        let id = classes.register_class(Class::new("Pair").with_field("a").with_field("b"));

        for fields in [vec![Value::i32(1)], vec![Value::i32(1), Value::i32(2), Value::i32(3)]] {
            let source = Value::Record(Record::new(id, fields));
            let err = deep_copy(&mut heap, &classes, &source).unwrap_err();
            assert!(matches!(err, CopyError::ContractViolation(_)));
        }
    }

    #[test]
    fn test_table_capacity_hint() {
        let mut heap = Heap::new();
        let classes = ClassRegistry::new();
        let (copy, _) = DeepCopier::with_table_capacity(&mut heap, &classes, 0)
            .run(&Value::i64(3))
            .unwrap();
        assert_eq!(copy, Value::i64(3));
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CopyStats {
            visited: 3,
            identities: 1,
            shared_hits: 0,
            allocations: 1,
        };
        let rendered = toml::to_string(&stats).unwrap();
        assert!(rendered.contains("visited = 3"));
        assert!(rendered.contains("shared_hits = 0"));
    }
}
