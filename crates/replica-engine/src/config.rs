//! Engine options
//!
//! Options load from a TOML document with two optional tables:
//!
//! ```toml
//! [heap]
//! initial_capacity = 1024
//!
//! [copy]
//! table_capacity = 64
//! ```
//!
//! Missing keys take the values in [`crate::defaults`]; unknown keys are
//! rejected.

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_HEAP_CAPACITY, DEFAULT_TABLE_CAPACITY, MAX_HEAP_CAPACITY, MAX_TABLE_CAPACITY,
};
use crate::error::ConfigError;

/// Top-level engine options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineOptions {
    /// Heap settings
    #[serde(default)]
    pub heap: HeapOptions,

    /// Deep-copy settings
    #[serde(default)]
    pub copy: CopyOptions,
}

/// Heap settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeapOptions {
    /// Slots reserved when the heap is created
    #[serde(default = "default_heap_capacity")]
    pub initial_capacity: usize,
}

/// Deep-copy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyOptions {
    /// Initial capacity of each copy's identity table
    #[serde(default = "default_table_capacity")]
    pub table_capacity: usize,
}

fn default_heap_capacity() -> usize {
    DEFAULT_HEAP_CAPACITY
}

fn default_table_capacity() -> usize {
    DEFAULT_TABLE_CAPACITY
}

impl Default for HeapOptions {
    fn default() -> Self {
        Self {
            initial_capacity: default_heap_capacity(),
        }
    }
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            table_capacity: default_table_capacity(),
        }
    }
}

impl EngineOptions {
    /// Parse and validate options from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let options: EngineOptions = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    /// Check option values against engine limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heap.initial_capacity > MAX_HEAP_CAPACITY {
            return Err(ConfigError::InvalidValue {
                key: "heap.initial_capacity",
                reason: format!(
                    "{} exceeds the limit of {}",
                    self.heap.initial_capacity, MAX_HEAP_CAPACITY
                ),
            });
        }
        if self.copy.table_capacity > MAX_TABLE_CAPACITY {
            return Err(ConfigError::InvalidValue {
                key: "copy.table_capacity",
                reason: format!(
                    "{} exceeds the limit of {}",
                    self.copy.table_capacity, MAX_TABLE_CAPACITY
                ),
            });
        }
        Ok(())
    }
}
