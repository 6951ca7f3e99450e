//! Type classifier

use std::fmt;

use serde::Serialize;

use crate::class_registry::ClassRegistry;
use crate::error::{CopyError, CopyResult};
use crate::gc::Heap;
use crate::value::Value;

/// Structural copy category of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Boolean, integer, float or complex number
    Scalar,
    /// Immutable text
    Text,
    /// Fixed-size array stored inline
    FixedArray,
    /// Growable sequence with identity
    DynamicSequence,
    /// Associative map with identity
    AssociativeMap,
    /// Channel handle with identity
    QueueHandle,
    /// Pointer to a heap cell
    Indirection,
    /// Record of named fields, hidden ones included
    Aggregate,
    /// Raw address with no recoverable pointee type
    OpaqueHandle,
    /// Function value
    Callable,
}

impl Category {
    /// Whether values of this category carry a reference identity
    pub fn has_identity(&self) -> bool {
        matches!(
            self,
            Category::DynamicSequence
                | Category::AssociativeMap
                | Category::QueueHandle
                | Category::Indirection
        )
    }

    /// Category name
    pub fn name(&self) -> &'static str {
        match self {
            Category::Scalar => "scalar",
            Category::Text => "text",
            Category::FixedArray => "fixed array",
            Category::DynamicSequence => "dynamic sequence",
            Category::AssociativeMap => "associative map",
            Category::QueueHandle => "queue handle",
            Category::Indirection => "indirection",
            Category::Aggregate => "aggregate",
            Category::OpaqueHandle => "opaque handle",
            Category::Callable => "callable",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a value to its copy category
///
/// Typed absent values (`Value::Slice(None)`, ...) keep the category of
/// their type. Untyped nil has no category and is a contract violation;
/// callers short-circuit it before classifying. Native objects and records
/// of unregistered classes are [`CopyError::UnsupportedCategory`].
pub fn classify(value: &Value, heap: &Heap, classes: &ClassRegistry) -> CopyResult<Category> {
    let category = match value {
        Value::Nil => return Err(CopyError::contract("untyped nil has no copy category")),
        Value::Scalar(_) => Category::Scalar,
        Value::Str(_) => Category::Text,
        Value::Address(_) | Value::RawPtr(_) => Category::OpaqueHandle,
        Value::Func(_) => Category::Callable,
        Value::Array(_) => Category::FixedArray,
        Value::Slice(_) => Category::DynamicSequence,
        Value::Map(_) => Category::AssociativeMap,
        Value::Chan(_) => Category::QueueHandle,
        Value::Ptr(_) => Category::Indirection,
        Value::Record(record) => {
            if classes.get_class(record.class_id()).is_none() {
                return Err(CopyError::unsupported(format!("class#{}", record.class_id())));
            }
            Category::Aggregate
        }
        Value::Native(r) => {
            let native = heap.native(*r)?;
            return Err(CopyError::unsupported(native.type_name()));
        }
    };
    Ok(category)
}
