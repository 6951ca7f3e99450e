//! Replica Engine
//!
//! Structural deep copy for heap-allocated value graphs:
//! - **Values**: closed `Value` enum over scalars, text, inline aggregates and heap
//!   references (`value`, `object`)
//! - **Heap**: generation-checked slot allocator with stable object addresses (`gc`)
//! - **Reflection**: class registry and privileged field grants (`class_registry`, `reflect`)
//! - **Copy**: classifier, identity table and the recursive copier (`copy`)
//!
//! Shared and cyclic substructure is preserved: two references to the same
//! source object map to the same copy.
//!
//! # Example
//!
//! ```rust,ignore
//! use replica_engine::{Runtime, Value};
//!
//! let mut rt = Runtime::new();
//! let x = rt.alloc_ptr(Value::i32(1));
//! let m = rt.alloc_map([(Value::str("a"), x.clone()), (Value::str("b"), x)]);
//!
//! let copy = rt.deep_copy(&m)?;
//! let entries = rt.map(&copy)?;
//! assert_eq!(entries.get(&Value::str("a")), entries.get(&Value::str("b")));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Class registry for record type descriptors
pub mod class_registry;

/// Engine options
pub mod config;

/// Deep copy: classifier, identity table, copier
pub mod copy;

/// Default constants
pub mod defaults;

/// Error types
pub mod error;

/// Heap allocator and handles
pub mod gc;

/// Sequence and text layout descriptors
pub mod layout;

/// Heap object payloads and record classes
pub mod object;

/// Privileged field access
pub mod reflect;

/// Host-facing runtime
pub mod runtime;

/// Value representation
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use class_registry::ClassRegistry;
pub use config::EngineOptions;
pub use copy::{classify, deep_copy, deep_copy_with_stats, Category, CopyStats};
pub use error::{ConfigError, CopyError, CopyResult};
pub use gc::{GcRef, Heap};
pub use object::{Class, ClassId, Record, Text, Visibility};
pub use reflect::{FieldGrant, ReflectionPermission};
pub use runtime::Runtime;
pub use value::{Scalar, Value};
