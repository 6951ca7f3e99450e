//! Object model and class system

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::class_registry::ClassRegistry;
use crate::layout::{SequenceHeader, TextHeader};
use crate::value::{RawHandle, Scalar, Value};

/// Class identifier (index into the class registry)
pub type ClassId = usize;

// ============================================================================
// Text
// ============================================================================

/// Immutable UTF-8 text
///
/// Clones share storage. [`Text::detach`] is the only way to get a copy
/// backed by fresh storage.
#[derive(Clone)]
pub struct Text {
    data: Arc<str>,
}

impl Text {
    /// Create a text value from a string slice
    pub fn new(s: &str) -> Self {
        Self { data: Arc::from(s) }
    }

    /// Take ownership of a byte buffer holding UTF-8
    pub fn from_utf8(bytes: Vec<u8>) -> Result<Self, std::string::FromUtf8Error> {
        String::from_utf8(bytes).map(Text::from)
    }

    /// Borrow as `&str`
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Zero-copy view of the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if text is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check whether two texts alias the same storage
    pub fn shares_storage(&self, other: &Text) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Copy the bytes into fresh storage
    pub fn detach(&self) -> Text {
        Text {
            data: Arc::from(self.as_str()),
        }
    }

    /// Layout descriptor of the storage
    pub fn header(&self) -> TextHeader {
        TextHeader {
            data: self.data.as_ptr() as usize,
            len: self.data.len(),
        }
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Text {}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::new(s)
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Self {
            data: Arc::from(s),
        }
    }
}

// ============================================================================
// Inline aggregates
// ============================================================================

/// Fixed-size array (stored inline in a value)
#[derive(Debug, Clone, PartialEq)]
pub struct FixedArray {
    elements: Box<[Value]>,
}

impl FixedArray {
    /// Create an array from its elements
    pub fn new(elements: Vec<Value>) -> Self {
        Self {
            elements: elements.into_boxed_slice(),
        }
    }

    /// Create an array of `len` nil elements
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![Value::Nil; len])
    }

    /// Get array length
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if array is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get element at index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    /// Set element at index
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), String> {
        match self.elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!(
                "Array index {} out of bounds (length: {})",
                index,
                self.elements.len()
            )),
        }
    }

    /// Iterate over elements
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter()
    }
}

/// Field visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Reachable through normal field access
    Public,
    /// Internal bookkeeping, reachable only through a privileged grant
    Hidden,
}

/// Field declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field visibility
    pub visibility: Visibility,
}

/// Record type descriptor
#[derive(Debug, Clone)]
pub struct Class {
    /// Class ID (assigned by the registry)
    pub id: ClassId,
    /// Class name
    pub name: String,
    /// Fields in layout order
    pub fields: Vec<Field>,
}

impl Class {
    /// Create a class with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a public field
    pub fn with_field(self, name: impl Into<String>) -> Self {
        self.with_field_visibility(name, Visibility::Public)
    }

    /// Append a hidden field
    pub fn with_hidden_field(self, name: impl Into<String>) -> Self {
        self.with_field_visibility(name, Visibility::Hidden)
    }

    /// Append a field with explicit visibility
    pub fn with_field_visibility(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            visibility,
        });
        self
    }

    /// Get number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Get field index by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Get field declaration by index
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }
}

/// Record instance (stored inline in a value)
///
/// Field storage is private. Public fields are reachable by name through
/// [`Record::get`] and [`Record::set`]; hidden fields only through a
/// [`FieldGrant`](crate::reflect::FieldGrant).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    class_id: ClassId,
    fields: Box<[Value]>,
}

impl Record {
    /// Create a record with every field initialized, hidden ones included
    pub fn new(class_id: ClassId, fields: Vec<Value>) -> Self {
        Self {
            class_id,
            fields: fields.into_boxed_slice(),
        }
    }

    /// Create a record of `class` with every field nil
    pub fn zeroed(class: &Class) -> Self {
        Self::new(class.id, vec![Value::Nil; class.field_count()])
    }

    /// Class ID
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Get number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Read a public field by name
    pub fn get<'a>(&'a self, classes: &ClassRegistry, name: &str) -> Option<&'a Value> {
        let index = self.public_index(classes, name)?;
        self.fields.get(index)
    }

    /// Write a public field by name, returns false if the field is missing or hidden
    pub fn set(&mut self, classes: &ClassRegistry, name: &str, value: Value) -> bool {
        let Some(index) = self.public_index(classes, name) else {
            return false;
        };
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn public_index(&self, classes: &ClassRegistry, name: &str) -> Option<usize> {
        let class = classes.get_class(self.class_id)?;
        let index = class.field_index(name)?;
        match class.fields[index].visibility {
            Visibility::Public => Some(index),
            Visibility::Hidden => None,
        }
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.fields.get_mut(index)
    }

    pub(crate) fn slots(&self) -> &[Value] {
        &self.fields
    }
}

// ============================================================================
// Heap objects
// ============================================================================

/// Growable sequence storage (heap-allocated)
#[derive(Debug, Clone)]
pub struct Sequence {
    elements: Vec<Value>,
    capacity: usize,
}

impl Sequence {
    /// Create a sequence holding `elements` with `capacity == len`
    pub fn new(elements: Vec<Value>) -> Self {
        let capacity = elements.len();
        Self::from_values(elements, capacity)
    }

    /// Create a sequence of `len` nil elements with room for `capacity`
    ///
    /// A capacity smaller than `len` is raised to `len`.
    pub fn with_capacity(len: usize, capacity: usize) -> Self {
        Self::from_values(vec![Value::Nil; len], capacity)
    }

    /// Create a sequence from `elements` with a declared capacity
    pub fn from_values(mut elements: Vec<Value>, capacity: usize) -> Self {
        let capacity = capacity.max(elements.len());
        elements.reserve_exact(capacity - elements.len());
        Self { elements, capacity }
    }

    /// Get number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if sequence is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Declared capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get element at index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    /// Set element at index
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), String> {
        match self.elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!(
                "Sequence index {} out of bounds (length: {})",
                index,
                self.elements.len()
            )),
        }
    }

    /// Push element to end of sequence, returns new length
    ///
    /// A full sequence doubles its capacity.
    pub fn push(&mut self, value: Value) -> usize {
        if self.elements.len() == self.capacity {
            let grown = (self.capacity * 2).max(1);
            self.elements.reserve_exact(grown - self.elements.len());
            self.capacity = grown;
        }
        self.elements.push(value);
        self.elements.len()
    }

    /// Iterate over elements
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter()
    }

    /// Borrow the elements
    pub fn as_slice(&self) -> &[Value] {
        &self.elements
    }

    /// Layout descriptor of the storage
    pub fn header(&self) -> SequenceHeader {
        SequenceHeader {
            data: self.elements.as_ptr() as usize,
            len: self.elements.len(),
            cap: self.capacity,
        }
    }
}

/// Wrapper type for Value that implements Hash and Eq for use as a map key
///
/// Scalars compare by bit pattern (floats included), text and inline
/// aggregates by content, reference-like values by identity.
#[derive(Debug, Clone)]
pub struct MapKey(pub Value);

fn hash_scalar<H: Hasher>(scalar: &Scalar, state: &mut H) {
    mem::discriminant(scalar).hash(state);
    match scalar {
        Scalar::Bool(b) => b.hash(state),
        Scalar::I8(i) => i.hash(state),
        Scalar::I16(i) => i.hash(state),
        Scalar::I32(i) => i.hash(state),
        Scalar::I64(i) => i.hash(state),
        Scalar::Isize(i) => i.hash(state),
        Scalar::U8(u) => u.hash(state),
        Scalar::U16(u) => u.hash(state),
        Scalar::U32(u) => u.hash(state),
        Scalar::U64(u) => u.hash(state),
        Scalar::Usize(u) => u.hash(state),
        Scalar::F32(f) => f.to_bits().hash(state),
        Scalar::F64(f) => f.to_bits().hash(state),
        Scalar::Complex64(c) => {
            c.re.to_bits().hash(state);
            c.im.to_bits().hash(state);
        }
        Scalar::Complex128(c) => {
            c.re.to_bits().hash(state);
            c.im.to_bits().hash(state);
        }
    }
}

fn scalar_key_eq(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::F32(x), Scalar::F32(y)) => x.to_bits() == y.to_bits(),
        (Scalar::F64(x), Scalar::F64(y)) => x.to_bits() == y.to_bits(),
        (Scalar::Complex64(x), Scalar::Complex64(y)) => {
            x.re.to_bits() == y.re.to_bits() && x.im.to_bits() == y.im.to_bits()
        }
        (Scalar::Complex128(x), Scalar::Complex128(y)) => {
            x.re.to_bits() == y.re.to_bits() && x.im.to_bits() == y.im.to_bits()
        }
        _ => a == b,
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    mem::discriminant(value).hash(state);
    match value {
        Value::Nil => {}
        Value::Scalar(s) => hash_scalar(s, state),
        Value::Str(t) => t.hash(state),
        Value::Address(a) => a.hash(state),
        Value::RawPtr(h) => h.hash(state),
        Value::Func(r) | Value::Slice(r) | Value::Map(r) | Value::Chan(r) | Value::Ptr(r) => {
            r.hash(state)
        }
        Value::Native(r) => r.hash(state),
        Value::Array(a) => {
            a.len().hash(state);
            for element in a.iter() {
                hash_value(element, state);
            }
        }
        Value::Record(r) => {
            r.class_id().hash(state);
            for field in r.slots() {
                hash_value(field, state);
            }
        }
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => scalar_key_eq(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| key_eq(l, r))
        }
        (Value::Record(x), Value::Record(y)) => {
            x.class_id() == y.class_id()
                && x.field_count() == y.field_count()
                && x.slots().iter().zip(y.slots()).all(|(l, r)| key_eq(l, r))
        }
        _ => a == b,
    }
}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

impl Eq for MapKey {}

/// Associative map (heap-allocated)
#[derive(Debug, Clone, Default)]
pub struct MapObject {
    /// Internal HashMap storage
    pub inner: FxHashMap<MapKey, Value>,
}

impl MapObject {
    /// Create a new empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        let mut inner = FxHashMap::default();
        inner.reserve(capacity);
        Self { inner }
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if map is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get a value by key
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.inner.get(&MapKey(key.clone()))
    }

    /// Set a key-value pair, returns the previous value
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.inner.insert(MapKey(key), value)
    }

    /// Check if key exists
    pub fn contains_key(&self, key: &Value) -> bool {
        self.inner.contains_key(&MapKey(key.clone()))
    }

    /// Delete a key, returns the removed value
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.inner.remove(&MapKey(key.clone()))
    }

    /// Iterate over entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.inner.iter().map(|(k, v)| (&k.0, v))
    }

    /// Get all entries as owned key-value pairs
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.inner.iter().map(|(k, v)| (k.0.clone(), v.clone())).collect()
    }
}

/// Channel operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Channel is closed
    Closed,
    /// Buffer is full
    Full,
}

/// Buffered channel handle (heap-allocated)
#[derive(Debug, Clone)]
pub struct ChannelObject {
    capacity: usize,
    queue: VecDeque<Value>,
    closed: bool,
}

impl ChannelObject {
    /// Create a new channel with given buffer capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity),
            closed: false,
        }
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get number of buffered items
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if channel is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the channel; buffered values stay receivable
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Try to buffer a value without blocking
    pub fn try_send(&mut self, value: Value) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        if self.queue.len() >= self.capacity {
            return Err(ChannelError::Full);
        }
        self.queue.push_back(value);
        Ok(())
    }

    /// Try to receive a buffered value without blocking
    pub fn try_receive(&mut self) -> Option<Value> {
        self.queue.pop_front()
    }
}

/// Closure object (heap-allocated)
///
/// A closure captures the function ID and any captured variables from
/// the enclosing scope.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Function ID (index into the host's function table)
    pub func_id: usize,
    /// Captured variable values
    pub captures: Vec<Value>,
}

impl Closure {
    /// Create a new closure with captured variables
    pub fn new(func_id: usize, captures: Vec<Value>) -> Self {
        Self { func_id, captures }
    }

    /// Get a captured variable by index
    pub fn get_captured(&self, index: usize) -> Option<&Value> {
        self.captures.get(index)
    }

    /// Set a captured variable by index
    pub fn set_captured(&mut self, index: usize, value: Value) -> Result<(), String> {
        match self.captures.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!(
                "Captured variable index {} out of bounds (closure has {} captures)",
                index,
                self.captures.len()
            )),
        }
    }

    /// Get number of captured variables
    pub fn capture_count(&self) -> usize {
        self.captures.len()
    }
}

/// Heap cell targeted by a pointer value
#[derive(Debug, Clone, Default)]
pub struct Boxed {
    /// The contained value
    pub value: Value,
}

impl Boxed {
    /// Create a cell holding `value`
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Get the current value
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// Set a new value
    pub fn set(&mut self, value: Value) {
        self.value = value;
    }
}

/// Zero-initialized, untyped memory block
#[derive(Debug, Clone)]
pub struct RawBlock {
    bytes: Box<[u8]>,
}

impl RawBlock {
    /// Allocate `size` zeroed bytes
    pub fn zeroed(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if block is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutably borrow the bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Address of the first byte
    pub fn handle(&self) -> RawHandle {
        RawHandle(self.bytes.as_ptr() as usize)
    }
}

/// Host-defined object stored on the heap
///
/// Native objects sit outside the copy categories; the engine can store,
/// free and name them but will refuse to deep-copy them.
pub trait NativeObject: Any + Send + Sync + fmt::Debug {
    /// Runtime type name reported in errors
    fn type_name(&self) -> &str;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;
}

/// Object kinds stored on the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Growable sequence storage
    Sequence,
    /// Associative map
    Map,
    /// Channel
    Channel,
    /// Pointer target cell
    Boxed,
    /// Closure
    Closure,
    /// Raw memory block
    RawBlock,
    /// Host-defined native object
    Native,
}

impl ObjectKind {
    /// Human-readable kind name
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Sequence => "sequence",
            ObjectKind::Map => "map",
            ObjectKind::Channel => "channel",
            ObjectKind::Boxed => "boxed cell",
            ObjectKind::Closure => "closure",
            ObjectKind::RawBlock => "raw block",
            ObjectKind::Native => "native object",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Heap object payload
#[derive(Debug)]
pub enum HeapObject {
    /// Growable sequence storage
    Sequence(Sequence),
    /// Associative map
    Map(MapObject),
    /// Channel
    Channel(ChannelObject),
    /// Pointer target cell
    Boxed(Boxed),
    /// Closure
    Closure(Closure),
    /// Raw memory block
    RawBlock(RawBlock),
    /// Host-defined native object
    Native(Box<dyn NativeObject>),
}

impl HeapObject {
    /// Kind of this object
    pub fn kind(&self) -> ObjectKind {
        match self {
            HeapObject::Sequence(_) => ObjectKind::Sequence,
            HeapObject::Map(_) => ObjectKind::Map,
            HeapObject::Channel(_) => ObjectKind::Channel,
            HeapObject::Boxed(_) => ObjectKind::Boxed,
            HeapObject::Closure(_) => ObjectKind::Closure,
            HeapObject::RawBlock(_) => ObjectKind::RawBlock,
            HeapObject::Native(_) => ObjectKind::Native,
        }
    }

    /// Approximate footprint in bytes (object plus owned buffers)
    pub fn approx_size(&self) -> usize {
        let value = mem::size_of::<Value>();
        let payload = match self {
            HeapObject::Sequence(s) => s.capacity() * value,
            HeapObject::Map(m) => m.len() * (value * 2),
            HeapObject::Channel(c) => c.capacity() * value,
            HeapObject::Boxed(_) => 0,
            HeapObject::Closure(c) => c.capture_count() * value,
            HeapObject::RawBlock(b) => b.len(),
            HeapObject::Native(_) => 0,
        };
        mem::size_of::<HeapObject>() + payload
    }
}
