//! Reflection over record fields
//!
//! Normal field access ([`Record::get`](crate::object::Record::get)) only
//! sees public fields. This module provides the privileged path the copier
//! uses to read and write every field slot.

mod access;
mod permissions;

pub use access::{grant_by_name, FieldGrant};
pub use permissions::ReflectionPermission;
