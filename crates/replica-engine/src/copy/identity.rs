//! Reference identity table
//!
//! Maps the identity of a source object to the copy built for it. One table
//! lives for exactly one top-level copy.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{CopyError, CopyResult};
use crate::gc::{GcRef, Heap};
use crate::value::Value;

/// Identity of a heap object: the address of its storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(usize);

impl Identity {
    /// Identity of the live object behind `r`
    pub fn of(heap: &Heap, r: GcRef) -> CopyResult<Self> {
        heap.address_of(r).map(Identity)
    }

    /// Raw address
    pub fn addr(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Source identity to copy mapping
#[derive(Debug, Default)]
pub struct IdentityTable {
    entries: FxHashMap<Identity, Value>,
}

impl IdentityTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with room for `capacity` identities
    pub fn with_capacity(capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        Self { entries }
    }

    /// Copy registered for `identity`, if any
    pub fn lookup(&self, identity: Identity) -> Option<&Value> {
        self.entries.get(&identity)
    }

    /// Register the copy of `identity`
    ///
    /// Each identity is registered once, before its children are copied. A
    /// second registration means a lookup was skipped and is a contract
    /// violation.
    pub fn insert(&mut self, identity: Identity, copy: Value) -> CopyResult<()> {
        if self.entries.contains_key(&identity) {
            return Err(CopyError::contract(format!(
                "identity {} registered twice",
                identity
            )));
        }
        trace!(%identity, kind = copy.type_name(), "registered identity");
        self.entries.insert(identity, copy);
        Ok(())
    }

    /// Number of registered identities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
