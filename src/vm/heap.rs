//! Object storage. Live objects are kept in a map ordered by identity, so freeing an object
//! releases its storage and a stale identity finds nothing instead of aliasing a newer object.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::error::HeapFault;
use crate::vm::class::Class;
use crate::vm::value::Value;

/// Identity of a heap object. Identities are handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug)]
pub struct HeapObject {
    id: ObjectId,
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl HeapObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// Identities held in the fields of this object.
    pub fn references<'a>(&'a self) -> impl Iterator<Item = ObjectId> + 'a {
        self.fields.values().filter_map(Value::as_reference)
    }

    fn no_such_field(&self, field: &str) -> HeapFault {
        HeapFault::NoSuchField {
            id: self.id,
            class: self.class.name.clone(),
            field: String::from(field),
        }
    }
}

#[derive(Debug)]
pub struct Heap {
    objects: BTreeMap<ObjectId, HeapObject>,
    /// Identity of the next allocation, or `None` once every identity has been handed out.
    next_id: Option<u32>,
}

impl Heap {
    pub fn new(base: u32) -> Self {
        Heap { objects: BTreeMap::new(), next_id: Some(base) }
    }

    /// Allocates an instance of `class` with every instance field (inherited ones included) set
    /// to its default value.
    pub fn allocate(&mut self, class: Rc<Class>) -> Result<ObjectId, HeapFault> {
        let id = ObjectId(self.next_id.ok_or(HeapFault::IdentitiesExhausted)?);
        self.next_id = id.0.checked_add(1);
        let fields = class.instance_fields().iter()
            .map(|field| (field.name.clone(), field.ty.default_value()))
            .collect();
        debug!("allocated {} of class {}", id, class.name);
        self.objects.insert(id, HeapObject { id, class, fields });
        Ok(id)
    }

    pub fn get(&self, id: ObjectId) -> Result<&HeapObject, HeapFault> {
        self.objects.get(&id).ok_or(HeapFault::NoSuchObject { id })
    }

    fn get_mut(&mut self, id: ObjectId) -> Result<&mut HeapObject, HeapFault> {
        self.objects.get_mut(&id).ok_or(HeapFault::NoSuchObject { id })
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_ok()
    }

    pub fn get_field(&self, id: ObjectId, field: &str) -> Result<Value, HeapFault> {
        let object = self.get(id)?;
        object.fields.get(field).cloned().ok_or_else(|| object.no_such_field(field))
    }

    pub fn set_field(&mut self, id: ObjectId, field: &str, value: Value) -> Result<(), HeapFault> {
        let object = self.get_mut(id)?;
        match object.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            },
            None => Err(object.no_such_field(field)),
        }
    }

    /// Reclaims the object with the given identity. Returns false if it was not live.
    pub fn free(&mut self, id: ObjectId) -> bool {
        self.objects.remove(&id).is_some()
    }

    /// Identities of all live objects, oldest first.
    pub fn ids<'a>(&'a self) -> impl Iterator<Item = ObjectId> + 'a {
        self.objects.keys().cloned()
    }

    pub fn live_count(&self) -> usize {
        self.objects.len()
    }
}
