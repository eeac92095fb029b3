//! The method area: every loaded class, keyed by name, and the values of their static fields.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ClassFormatError, ExecutionError};
use crate::model::class_file::ClassFile;
use crate::vm::class::Class;
use crate::vm::heap::ObjectId;
use crate::vm::value::Value;

#[derive(Debug, Default)]
pub struct MethodArea {
    classes: HashMap<String, Rc<Class>>,
    /// Static field values, keyed by class name and then field name.
    static_values: HashMap<String, HashMap<String, Value>>,
}

impl MethodArea {
    pub fn new() -> Self {
        MethodArea::default()
    }

    pub fn get(&self, name: &str) -> Option<Rc<Class>> {
        self.classes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Defines a class from a parsed class file. If a class of the same name is already loaded,
    /// that class is returned and `class_file` is discarded.
    ///
    /// The superclass is linked if it is already loaded; otherwise the class becomes a root of
    /// the hierarchy. Static fields start at their `ConstantValue` if they have a numeric one,
    /// and at the default value of their type otherwise.
    pub fn define(&mut self, class_file: ClassFile) -> Result<Rc<Class>, ClassFormatError> {
        let name = class_file.name()?;
        if let Some(class) = self.classes.get(name) {
            debug!("class {} is already loaded", name);
            return Ok(class.clone());
        }
        let superclass = match class_file.super_name()? {
            Some(super_name) => {
                let superclass = self.get(super_name);
                if superclass.is_none() {
                    warn!("superclass {} of {} is not loaded; treating {} as a root class",
                          super_name, name, name);
                }
                superclass
            },
            None => None,
        };

        let class = Rc::new(Class::new(class_file, superclass)?);
        let mut statics = HashMap::new();
        for field in class.static_fields() {
            let initial = field.constant_value
                .and_then(|index| {
                    with_warn!("ConstantValue of static field ignored: {}",
                               class.constant_pool().resolve_literal(index))
                })
                .unwrap_or_else(|| field.ty.default_value());
            statics.insert(field.name.clone(), initial);
        }
        info!("loaded class {} ({} methods, {} static fields)",
              class.name, class.methods().count(), statics.len());
        self.static_values.insert(class.name.clone(), statics);
        self.classes.insert(class.name.clone(), class.clone());
        Ok(class)
    }

    /// Finds the class declaring static field `field`, starting at `class` and walking up.
    fn static_owner(&self, class: &str, field: &str) -> Result<String, ExecutionError> {
        let mut current = self.get(class).ok_or_else(|| ExecutionError::UnresolvedClass {
            class: String::from(class),
        })?;
        loop {
            let declares = self.static_values.get(&current.name)
                .map_or(false, |fields| fields.contains_key(field));
            if declares {
                return Ok(current.name.clone());
            }
            current = match current.superclass {
                Some(ref superclass) => superclass.clone(),
                None => return Err(ExecutionError::UnresolvedField {
                    class: String::from(class),
                    field: String::from(field),
                }),
            };
        }
    }

    pub fn get_static(&self, class: &str, field: &str) -> Result<Value, ExecutionError> {
        let owner = self.static_owner(class, field)?;
        Ok(self.static_values[&owner][field])
    }

    pub fn put_static(&mut self, class: &str, field: &str, value: Value)
                      -> Result<(), ExecutionError> {
        let owner = self.static_owner(class, field)?;
        if let Some(slot) = self.static_values.get_mut(&owner).and_then(|f| f.get_mut(field)) {
            *slot = value;
        }
        Ok(())
    }

    /// Identities held in static fields. These are garbage collection roots.
    pub fn static_references<'a>(&'a self) -> impl Iterator<Item = ObjectId> + 'a {
        self.static_values.values()
            .flat_map(|fields| fields.values())
            .filter_map(Value::as_reference)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::class_file::{AttributeInfo, ConstantPoolInfo};
    use crate::vm::class::test::ClassFileBuilder;

    fn counter() -> ClassFile {
        let mut builder = ClassFileBuilder::new("Counter", Some("java/lang/Object"));
        builder.field(0x0008, "count", "I").field(0x0008, "total", "J").field(0x0001, "x", "I");
        let mut class_file = builder.build();
        class_file.constant_pool.push(ConstantPoolInfo::Long { high_bytes: 0, low_bytes: 99 });
        let index = class_file.constant_pool.count() - 2;
        class_file.fields[1].attributes.push(AttributeInfo::ConstantValue {
            constant_value_index: index,
        });
        class_file
    }

    #[test]
    fn loading_twice_is_a_no_op() {
        let mut area = MethodArea::new();
        let first = area.define(counter()).unwrap();
        area.put_static("Counter", "count", Value::Int(5)).unwrap();
        let second = area.define(counter()).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(area.len(), 1);
        assert_eq!(area.get_static("Counter", "count"), Ok(Value::Int(5)));
    }

    #[test]
    fn statics_start_at_defaults_or_constant_values() {
        let mut area = MethodArea::new();
        area.define(counter()).unwrap();
        assert_eq!(area.get_static("Counter", "count"), Ok(Value::Int(0)));
        assert_eq!(area.get_static("Counter", "total"), Ok(Value::Long(99)));
        assert_eq!(area.get_static("Counter", "x"), Err(ExecutionError::UnresolvedField {
            class: String::from("Counter"),
            field: String::from("x"),
        }));
        assert_eq!(area.get_static("Missing", "x"), Err(ExecutionError::UnresolvedClass {
            class: String::from("Missing"),
        }));
    }

    #[test]
    fn statics_are_inherited() {
        let mut area = MethodArea::new();
        let mut base = ClassFileBuilder::new("Base", None);
        base.field(0x0008, "shared", "I");
        area.define(base.build()).unwrap();
        let derived = area.define(ClassFileBuilder::new("Derived", Some("Base")).build()).unwrap();
        assert_eq!(derived.superclass.as_ref().map(|c| c.name.as_str()), Some("Base"));

        area.put_static("Derived", "shared", Value::Int(3)).unwrap();
        assert_eq!(area.get_static("Base", "shared"), Ok(Value::Int(3)));
    }

    #[test]
    fn static_references_are_reported() {
        let mut area = MethodArea::new();
        let mut builder = ClassFileBuilder::new("Holder", None);
        builder.field(0x0008, "ref", "Ljava/lang/Object;");
        area.define(builder.build()).unwrap();
        assert_eq!(area.static_references().count(), 0);
        area.put_static("Holder", "ref", Value::Reference(ObjectId(1000))).unwrap();
        assert_eq!(area.static_references().collect::<Vec<_>>(), vec![ObjectId(1000)]);
    }
}
