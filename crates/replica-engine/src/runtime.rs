//! Host-facing runtime
//!
//! [`Runtime`] bundles the heap, the class registry and the engine options
//! so hosts can build value graphs and deep-copy them without threading
//! three arguments through every call.

use crate::class_registry::ClassRegistry;
use crate::config::EngineOptions;
use crate::copy::{CopyStats, DeepCopier};
use crate::error::{CopyError, CopyResult};
use crate::gc::{GcRef, Heap};
use crate::object::{
    Boxed, ChannelObject, Class, ClassId, Closure, HeapObject, MapObject, NativeObject, Sequence,
};
use crate::value::Value;

/// Heap, class registry and options for one host
#[derive(Debug, Default)]
pub struct Runtime {
    heap: Heap,
    classes: ClassRegistry,
    options: EngineOptions,
}

impl Runtime {
    /// Create a runtime with default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create a runtime with the given options
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            heap: Heap::with_capacity(options.heap.initial_capacity),
            classes: ClassRegistry::new(),
            options,
        }
    }

    /// Engine options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Borrow the heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutably borrow the heap
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Borrow the class registry
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Register a record class
    pub fn register_class(&mut self, class: Class) -> ClassId {
        self.classes.register_class(class)
    }

    /// Build a record value of `class_id`
    pub fn instantiate(&self, class_id: ClassId, fields: Vec<Value>) -> CopyResult<Value> {
        self.classes.instantiate(class_id, fields).map(Value::Record)
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocate a sequence holding `elements`
    pub fn alloc_slice(&mut self, elements: Vec<Value>) -> Value {
        let r = self.heap.allocate(HeapObject::Sequence(Sequence::new(elements)));
        Value::Slice(Some(r))
    }

    /// Allocate a sequence holding `elements` with a declared capacity
    pub fn alloc_slice_with_capacity(&mut self, elements: Vec<Value>, capacity: usize) -> Value {
        let r = self
            .heap
            .allocate(HeapObject::Sequence(Sequence::from_values(elements, capacity)));
        Value::Slice(Some(r))
    }

    /// Allocate a map holding `entries`
    pub fn alloc_map(&mut self, entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mut map = MapObject::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Value::Map(Some(self.heap.allocate(HeapObject::Map(map))))
    }

    /// Allocate a channel with buffer capacity `capacity`
    pub fn alloc_chan(&mut self, capacity: usize) -> Value {
        let r = self
            .heap
            .allocate(HeapObject::Channel(ChannelObject::new(capacity)));
        Value::Chan(Some(r))
    }

    /// Allocate a cell holding `value` and return a pointer to it
    pub fn alloc_ptr(&mut self, value: Value) -> Value {
        Value::Ptr(Some(self.heap.allocate(HeapObject::Boxed(Boxed::new(value)))))
    }

    /// Allocate a closure over `captures`
    pub fn alloc_closure(&mut self, func_id: usize, captures: Vec<Value>) -> Value {
        let r = self
            .heap
            .allocate(HeapObject::Closure(Closure::new(func_id, captures)));
        Value::Func(Some(r))
    }

    /// Store a host-defined object on the heap
    pub fn alloc_native(&mut self, object: Box<dyn NativeObject>) -> Value {
        Value::Native(self.heap.allocate(HeapObject::Native(object)))
    }

    /// Allocate `size` zeroed bytes and return an untyped pointer to them
    pub fn malloc(&mut self, size: usize) -> CopyResult<Value> {
        let r = self.heap.malloc(size);
        self.heap.raw_handle(r).map(Value::RawPtr)
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// Read the value behind a pointer
    pub fn load(&self, ptr: &Value) -> CopyResult<&Value> {
        let r = pointer_target(ptr)?;
        self.heap.boxed(r).map(Boxed::get)
    }

    /// Overwrite the value behind a pointer
    pub fn store(&mut self, ptr: &Value, value: Value) -> CopyResult<()> {
        let r = pointer_target(ptr)?;
        self.heap.boxed_mut(r)?.set(value);
        Ok(())
    }

    /// Borrow the sequence behind a slice value
    pub fn sequence(&self, slice: &Value) -> CopyResult<&Sequence> {
        match slice {
            Value::Slice(Some(r)) => self.heap.sequence(*r),
            other => Err(not_a(other, "live slice")),
        }
    }

    /// Mutably borrow the sequence behind a slice value
    pub fn sequence_mut(&mut self, slice: &Value) -> CopyResult<&mut Sequence> {
        match slice {
            Value::Slice(Some(r)) => self.heap.sequence_mut(*r),
            other => Err(not_a(other, "live slice")),
        }
    }

    /// Borrow the map behind a map value
    pub fn map(&self, map: &Value) -> CopyResult<&MapObject> {
        match map {
            Value::Map(Some(r)) => self.heap.map(*r),
            other => Err(not_a(other, "live map")),
        }
    }

    /// Mutably borrow the map behind a map value
    pub fn map_mut(&mut self, map: &Value) -> CopyResult<&mut MapObject> {
        match map {
            Value::Map(Some(r)) => self.heap.map_mut(*r),
            other => Err(not_a(other, "live map")),
        }
    }

    /// Mutably borrow the channel behind a channel value
    pub fn channel_mut(&mut self, chan: &Value) -> CopyResult<&mut ChannelObject> {
        match chan {
            Value::Chan(Some(r)) => self.heap.channel_mut(*r),
            other => Err(not_a(other, "live channel")),
        }
    }

    // ------------------------------------------------------------------
    // Deep copy
    // ------------------------------------------------------------------

    /// Deep-copy `value` into this runtime's heap
    pub fn deep_copy(&mut self, value: &Value) -> CopyResult<Value> {
        self.deep_copy_with_stats(value).map(|(copy, _)| copy)
    }

    /// Deep-copy `value` and report what the copy did
    pub fn deep_copy_with_stats(&mut self, value: &Value) -> CopyResult<(Value, CopyStats)> {
        DeepCopier::with_table_capacity(
            &mut self.heap,
            &self.classes,
            self.options.copy.table_capacity,
        )
        .run(value)
    }
}

fn pointer_target(ptr: &Value) -> CopyResult<GcRef> {
    match ptr {
        Value::Ptr(Some(r)) => Ok(*r),
        Value::Ptr(None) => Err(CopyError::contract("nil pointer dereference")),
        other => Err(not_a(other, "pointer")),
    }
}

fn not_a(value: &Value, expected: &str) -> CopyError {
    CopyError::contract(format!("expected a {}, got {}", expected, value.type_name()))
}
