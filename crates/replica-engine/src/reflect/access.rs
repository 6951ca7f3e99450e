//! Privileged field access
//!
//! A [`FieldGrant`] names one field of one class and reads or writes it on
//! any record of that class, hidden fields included. Grants come from
//! [`ClassRegistry::grant`] or [`grant_by_name`].

use crate::class_registry::ClassRegistry;
use crate::error::{CopyError, CopyResult};
use crate::object::{ClassId, Record, Visibility};
use crate::value::Value;

use super::permissions::ReflectionPermission;

/// Read/write access to one field slot of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGrant {
    class_id: ClassId,
    index: usize,
    visibility: Visibility,
    permissions: ReflectionPermission,
}

impl FieldGrant {
    pub(crate) fn new(class_id: ClassId, index: usize, visibility: Visibility) -> Self {
        Self {
            class_id,
            index,
            visibility,
            permissions: ReflectionPermission::FULL_ACCESS,
        }
    }

    /// Class the grant applies to
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Field index in layout order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Visibility of the granted field
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Permissions carried by the grant
    pub fn permissions(&self) -> ReflectionPermission {
        self.permissions
    }

    /// Narrow the grant to the permissions in `mask`
    pub fn restrict(self, mask: ReflectionPermission) -> Self {
        Self {
            permissions: self.permissions.intersection(mask),
            ..self
        }
    }

    /// Read the field from `record`
    pub fn read<'r>(&self, record: &'r Record) -> CopyResult<&'r Value> {
        self.check(record, ReflectionPermission::read_flag(self.visibility), "read")?;
        record
            .slot(self.index)
            .ok_or_else(|| self.short_record(record.field_count()))
    }

    /// Borrow the field of `record` for writing
    pub fn write<'r>(&self, record: &'r mut Record) -> CopyResult<&'r mut Value> {
        self.check(record, ReflectionPermission::write_flag(self.visibility), "write")?;
        let field_count = record.field_count();
        record
            .slot_mut(self.index)
            .ok_or_else(|| self.short_record(field_count))
    }

    fn check(&self, record: &Record, needed: ReflectionPermission, op: &str) -> CopyResult<()> {
        if record.class_id() != self.class_id {
            return Err(CopyError::contract(format!(
                "grant for class #{} used on a record of class #{}",
                self.class_id,
                record.class_id()
            )));
        }
        if !self.permissions.contains(needed) {
            return Err(CopyError::contract(format!(
                "grant on field {} of class #{} does not allow {} (has {})",
                self.index, self.class_id, op, self.permissions
            )));
        }
        Ok(())
    }

    fn short_record(&self, field_count: usize) -> CopyError {
        CopyError::contract(format!(
            "record of class #{} has {} fields, grant names field {}",
            self.class_id, field_count, self.index
        ))
    }
}

/// Grant access to a field by name, hidden fields included
pub fn grant_by_name(
    classes: &ClassRegistry,
    class_id: ClassId,
    name: &str,
) -> CopyResult<FieldGrant> {
    let class = classes
        .get_class(class_id)
        .ok_or_else(|| CopyError::contract(format!("class #{} is not registered", class_id)))?;
    let index = class.field_index(name).ok_or_else(|| {
        CopyError::contract(format!("class `{}` has no field `{}`", class.name, name))
    })?;
    classes.grant(class_id, index)
}
