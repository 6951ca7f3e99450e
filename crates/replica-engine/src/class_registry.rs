//! Class registry for record type descriptors

use rustc_hash::FxHashMap;

use crate::error::{CopyError, CopyResult};
use crate::object::{Class, ClassId, Record};
use crate::reflect::FieldGrant;
use crate::value::Value;

/// Class registry
#[derive(Debug, Default)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Class>,
    /// Class name to ID mapping
    name_to_id: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new class, assigning its ID
    pub fn register_class(&mut self, mut class: Class) -> ClassId {
        let id = self.classes.len();
        class.id = id;
        self.name_to_id.insert(class.name.clone(), id);
        self.classes.push(class);
        id
    }

    /// Get class by ID
    pub fn get_class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id)
    }

    /// Get class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<&Class> {
        self.name_to_id.get(name).and_then(|id| self.classes.get(*id))
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no class is registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over all classes with their IDs
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &Class)> {
        self.classes.iter().enumerate()
    }

    /// Build a record of `class_id` from field values in layout order
    pub fn instantiate(&self, class_id: ClassId, fields: Vec<Value>) -> CopyResult<Record> {
        let class = self.require(class_id)?;
        if fields.len() != class.field_count() {
            return Err(CopyError::contract(format!(
                "class `{}` has {} fields, got {}",
                class.name,
                class.field_count(),
                fields.len()
            )));
        }
        Ok(Record::new(class_id, fields))
    }

    /// Grant privileged read/write access to one field of a class
    ///
    /// The grant ignores field visibility. An unknown class or an index past
    /// the last field is a contract violation.
    pub fn grant(&self, class_id: ClassId, index: usize) -> CopyResult<FieldGrant> {
        let class = self.require(class_id)?;
        let field = class.field(index).ok_or_else(|| {
            CopyError::contract(format!(
                "field index {} out of bounds (class `{}` has {} fields)",
                index,
                class.name,
                class.field_count()
            ))
        })?;
        Ok(FieldGrant::new(class_id, index, field.visibility))
    }

    fn require(&self, class_id: ClassId) -> CopyResult<&Class> {
        self.get_class(class_id)
            .ok_or_else(|| CopyError::contract(format!("class #{} is not registered", class_id)))
    }
}
