//! Value representation
//!
//! A `Value` is a closed, self-describing enum. Scalars, text, fixed-size
//! arrays and records live inline; everything with reference semantics
//! (sequences, maps, channels, pointees, closures, raw blocks, native
//! objects) lives in the [`Heap`](crate::gc::Heap) and is reached through a
//! [`GcRef`].
//!
//! Reference-like variants carry an `Option<GcRef>`: `None` is the typed
//! absent value (nil slice, nil map, nil pointer, ...), distinct from the
//! untyped [`Value::Nil`].

use std::fmt;

use crate::gc::GcRef;
use crate::object::{FixedArray, Record, Text};

/// Complex number with components of type `T`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex<T> {
    /// Real part
    pub re: T,
    /// Imaginary part
    pub im: T,
}

impl<T> Complex<T> {
    /// Create a complex number
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

/// Numeric and boolean scalars
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Boolean
    Bool(bool),
    /// 8-bit signed integer
    I8(i8),
    /// 16-bit signed integer
    I16(i16),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// Pointer-sized signed integer
    Isize(isize),
    /// 8-bit unsigned integer
    U8(u8),
    /// 16-bit unsigned integer
    U16(u16),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// Pointer-sized unsigned integer
    Usize(usize),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Complex number with f32 components
    Complex64(Complex<f32>),
    /// Complex number with f64 components
    Complex128(Complex<f64>),
}

impl Scalar {
    /// Runtime type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::I8(_) => "int8",
            Scalar::I16(_) => "int16",
            Scalar::I32(_) => "int32",
            Scalar::I64(_) => "int64",
            Scalar::Isize(_) => "int",
            Scalar::U8(_) => "uint8",
            Scalar::U16(_) => "uint16",
            Scalar::U32(_) => "uint32",
            Scalar::U64(_) => "uint64",
            Scalar::Usize(_) => "uint",
            Scalar::F32(_) => "float32",
            Scalar::F64(_) => "float64",
            Scalar::Complex64(_) => "complex64",
            Scalar::Complex128(_) => "complex128",
        }
    }
}

/// Raw memory address with no recoverable pointee type
///
/// Plain `Copy` payload: holding a `RawHandle` says nothing about whether the
/// memory behind it is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawHandle(pub usize);

impl RawHandle {
    /// The null handle
    pub const NULL: RawHandle = RawHandle(0);

    /// Check if this handle is null
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Raw address
    pub fn addr(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A runtime value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Untyped absent value
    #[default]
    Nil,
    /// Numeric or boolean scalar
    Scalar(Scalar),
    /// Immutable text
    Str(Text),
    /// Address stored as an integer
    Address(usize),
    /// Raw pointer with unknown pointee
    RawPtr(RawHandle),
    /// Function value (closure on the heap); `None` is the nil function
    Func(Option<GcRef>),
    /// Fixed-size array stored inline
    Array(FixedArray),
    /// Growable sequence; `None` is the nil sequence
    Slice(Option<GcRef>),
    /// Associative map; `None` is the nil map
    Map(Option<GcRef>),
    /// Channel handle; `None` is the nil channel
    Chan(Option<GcRef>),
    /// Pointer to a heap cell; `None` is the nil pointer
    Ptr(Option<GcRef>),
    /// Aggregate record stored inline
    Record(Record),
    /// Host-defined native object
    Native(GcRef),
}

impl Value {
    /// Create a boolean value
    pub fn bool(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }

    /// Create an i32 value
    pub fn i32(i: i32) -> Self {
        Value::Scalar(Scalar::I32(i))
    }

    /// Create an i64 value
    pub fn i64(i: i64) -> Self {
        Value::Scalar(Scalar::I64(i))
    }

    /// Create a pointer-sized integer value
    pub fn int(i: isize) -> Self {
        Value::Scalar(Scalar::Isize(i))
    }

    /// Create an f64 value
    pub fn f64(f: f64) -> Self {
        Value::Scalar(Scalar::F64(f))
    }

    /// Create a text value
    pub fn str(s: &str) -> Self {
        Value::Str(Text::new(s))
    }

    /// Check if this value is the untyped nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value is absent: untyped nil or a nil reference
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Func(r) | Value::Slice(r) | Value::Map(r) | Value::Chan(r) | Value::Ptr(r) => {
                r.is_none()
            }
            _ => false,
        }
    }

    /// Extract the scalar payload
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Extract an i64 payload
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::I64(i)) => Some(*i),
            _ => None,
        }
    }

    /// Extract a pointer-sized integer payload
    pub fn as_int(&self) -> Option<isize> {
        match self {
            Value::Scalar(Scalar::Isize(i)) => Some(*i),
            _ => None,
        }
    }

    /// Extract the text payload
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Value::Str(t) => Some(t),
            _ => None,
        }
    }

    /// Extract the inline record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Extract the inline array
    pub fn as_array(&self) -> Option<&FixedArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Heap handle carried by this value, if any
    pub fn gc_ref(&self) -> Option<GcRef> {
        match self {
            Value::Func(r) | Value::Slice(r) | Value::Map(r) | Value::Chan(r) | Value::Ptr(r) => *r,
            Value::Native(r) => Some(*r),
            _ => None,
        }
    }

    /// Static runtime type name (records and natives report their kind only)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Scalar(s) => s.type_name(),
            Value::Str(_) => "string",
            Value::Address(_) => "uintptr",
            Value::RawPtr(_) => "unsafe.Pointer",
            Value::Func(_) => "func",
            Value::Array(_) => "array",
            Value::Slice(_) => "slice",
            Value::Map(_) => "map",
            Value::Chan(_) => "chan",
            Value::Ptr(_) => "ptr",
            Value::Record(_) => "record",
            Value::Native(_) => "native",
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::i32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::i64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::f64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Text::from(s))
    }
}

impl From<Text> for Value {
    fn from(t: Text) -> Self {
        Value::Str(t)
    }
}

impl From<FixedArray> for Value {
    fn from(a: FixedArray) -> Self {
        Value::Array(a)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}
