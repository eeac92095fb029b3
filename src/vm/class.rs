//! Internal JVM representations of classes and methods.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ClassFormatError;
use crate::model::class_file::{field_access_flags, method_access_flags};
use crate::model::class_file::{AttributeInfo, ClassFile, CodeBlock};
use crate::model::class_file::constant_pool_index;
use crate::vm::constant_pool::RuntimeConstantPool;
use crate::vm::sig;

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub descriptor: String,
    pub ty: sig::Type,
    pub access_flags: field_access_flags::t,
    /// For `static` fields with a `ConstantValue` attribute, the index of the initial value.
    pub constant_value: Option<constant_pool_index>,
}

impl Field {
    pub fn is_static(&self) -> bool {
        self.access_flags & field_access_flags::ACC_STATIC != 0
    }
}

#[derive(Debug)]
/// A JVM representation of a method in a loaded class.
pub struct Method {
    /// Name of the class declaring the method.
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    pub sig: sig::Method,
    pub access_flags: method_access_flags::t,
    /// The `Code` attribute. Not present for abstract and native methods.
    pub code: Option<Rc<CodeBlock>>,
}

impl Method {
    pub fn is_static(&self) -> bool {
        self.access_flags & method_access_flags::ACC_STATIC != 0
    }

    /// `Class.name(descriptor)`, for diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}{}", self.class_name, self.name, self.descriptor)
    }
}

/// A JVM representation of a class that has been loaded.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub access_flags: u16,
    /// Name of the direct superclass, if the class file declares one.
    pub super_name: Option<String>,
    /// The superclass, if it is loaded. A declared superclass that could not be found is absent
    /// here, and the class is treated as a root of the hierarchy.
    pub superclass: Option<Rc<Class>>,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
    constant_pool: RuntimeConstantPool,
    /// Fields declared by this class, in declaration order.
    fields: Vec<Field>,
    /// Instance fields of an object of this class, including inherited ones.
    instance_fields: Vec<Field>,
    methods: HashMap<(String, String), Rc<Method>>,
}

impl Class {
    /// Builds the runtime class from a parsed class file. `superclass` must be the loaded class
    /// named by the file's `super_class`, if it could be loaded.
    pub fn new(class_file: ClassFile, superclass: Option<Rc<Class>>)
               -> Result<Class, ClassFormatError> {
        let constant_pool = &class_file.constant_pool;
        let name = String::from(class_file.name()?);
        let super_name = class_file.super_name()?.map(String::from);
        let source_file = class_file.source_file().map(String::from);
        let interfaces = class_file.interfaces.iter()
            .map(|&index| constant_pool.resolve_class_name(index).map(String::from))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = vec![];
        for field_info in &class_file.fields {
            let descriptor = constant_pool.resolve_utf8(field_info.descriptor_index)?;
            let constant_value = field_info.attributes.iter().filter_map(|attribute| {
                match *attribute {
                    AttributeInfo::ConstantValue { constant_value_index } =>
                        Some(constant_value_index),
                    _ => None,
                }
            }).next();
            fields.push(Field {
                name: String::from(constant_pool.resolve_utf8(field_info.name_index)?),
                descriptor: String::from(descriptor),
                ty: sig::Type::new(descriptor)?,
                access_flags: field_info.access_flags,
                constant_value,
            });
        }

        let mut instance_fields = superclass.as_ref()
            .map(|superclass| superclass.instance_fields.clone())
            .unwrap_or_default();
        for field in fields.iter().filter(|field| !field.is_static()) {
            // a redeclared field hides the inherited one
            instance_fields.retain(|inherited| inherited.name != field.name);
            instance_fields.push(field.clone());
        }

        let mut methods = HashMap::new();
        for method_info in class_file.methods.iter() {
            let method_name = constant_pool.resolve_utf8(method_info.name_index)?;
            let descriptor = constant_pool.resolve_utf8(method_info.descriptor_index)?;
            let method = Method {
                class_name: name.clone(),
                name: String::from(method_name),
                descriptor: String::from(descriptor),
                sig: sig::Method::new(method_name, descriptor)?,
                access_flags: method_info.access_flags,
                code: method_info.code().cloned().map(Rc::new),
            };
            methods.insert((method.name.clone(), method.descriptor.clone()), Rc::new(method));
        }

        Ok(Class {
            name,
            access_flags: class_file.access_flags,
            super_name,
            superclass,
            interfaces,
            source_file,
            constant_pool: RuntimeConstantPool::new(class_file.constant_pool),
            fields,
            instance_fields,
            methods,
        })
    }

    pub fn constant_pool(&self) -> &RuntimeConstantPool {
        &self.constant_pool
    }

    pub fn static_fields<'a>(&'a self) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(|field| field.is_static())
    }

    pub fn instance_fields(&self) -> &[Field] {
        &self.instance_fields
    }

    /// Methods declared by this class itself.
    pub fn methods<'a>(&'a self) -> impl Iterator<Item = &'a Rc<Method>> + 'a {
        self.methods.values()
    }

    /// Finds a method declared by this class.
    pub fn declared_method(&self, name: &str, descriptor: &str) -> Option<&Rc<Method>> {
        self.methods.get(&(String::from(name), String::from(descriptor)))
    }

    /// Looks a method up in this class and then in its loaded superclasses, nearest first.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<Rc<Method>> {
        self.declared_method(name, descriptor).cloned().or_else(|| {
            self.superclass.as_ref().and_then(|superclass| superclass.find_method(name, descriptor))
        })
    }

    /// Selects the method an `invokevirtual` on an instance of this class runs: the nearest
    /// declaration that is neither `static` nor `private`.
    pub fn dispatch_method(&self, name: &str, descriptor: &str) -> Option<Rc<Method>> {
        let private_or_static = method_access_flags::ACC_PRIVATE | method_access_flags::ACC_STATIC;
        self.declared_method(name, descriptor)
            .filter(|method| method.access_flags & private_or_static == 0)
            .cloned()
            .or_else(|| {
                self.superclass.as_ref()
                    .and_then(|superclass| superclass.dispatch_method(name, descriptor))
            })
    }

    /// Returns true if this class is `other` or one of its loaded subclasses.
    pub fn is_descendant(&self, other: &Class) -> bool {
        if self.name == other.name {
            true
        } else {
            self.superclass.as_ref().map_or(false, |superclass| superclass.is_descendant(other))
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::model::class_file::{ConstantPool, ConstantPoolInfo, FieldInfo, MethodInfo};

    /// A class file under construction: appends constant pool entries on demand.
    pub struct ClassFileBuilder {
        class_file: ClassFile,
    }

    impl ClassFileBuilder {
        pub fn new(name: &str, super_name: Option<&str>) -> Self {
            let mut builder = ClassFileBuilder {
                class_file: ClassFile {
                    minor_version: 0,
                    major_version: 52,
                    constant_pool: ConstantPool::new(),
                    access_flags: 0x0021,
                    this_class: 0,
                    super_class: 0,
                    interfaces: vec![],
                    fields: vec![],
                    methods: vec![],
                    attributes: vec![],
                },
            };
            builder.class_file.this_class = builder.class(name);
            if let Some(super_name) = super_name {
                builder.class_file.super_class = builder.class(super_name);
            }
            builder
        }

        fn push(&mut self, info: ConstantPoolInfo) -> u16 {
            let index = self.class_file.constant_pool.count();
            self.class_file.constant_pool.push(info);
            index
        }

        pub fn utf8(&mut self, value: &str) -> u16 {
            self.push(ConstantPoolInfo::Utf8 { value: String::from(value) })
        }

        pub fn class(&mut self, name: &str) -> u16 {
            let name_index = self.utf8(name);
            self.push(ConstantPoolInfo::Class { name_index })
        }

        pub fn integer(&mut self, value: i32) -> u16 {
            self.push(ConstantPoolInfo::Integer { bytes: value as u32 })
        }

        pub fn long(&mut self, value: i64) -> u16 {
            self.push(ConstantPoolInfo::Long {
                high_bytes: (value >> 32) as u32,
                low_bytes: value as u32,
            })
        }

        fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            self.push(ConstantPoolInfo::NameAndType { name_index, descriptor_index })
        }

        pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
            let class_index = self.class(class);
            let name_and_type_index = self.name_and_type(name, descriptor);
            self.push(ConstantPoolInfo::MethodRef { class_index, name_and_type_index })
        }

        pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
            let class_index = self.class(class);
            let name_and_type_index = self.name_and_type(name, descriptor);
            self.push(ConstantPoolInfo::FieldRef { class_index, name_and_type_index })
        }

        pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) -> &mut Self {
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            self.class_file.fields.push(FieldInfo {
                access_flags,
                name_index,
                descriptor_index,
                attributes: vec![],
            });
            self
        }

        pub fn method(&mut self, access_flags: u16, name: &str, descriptor: &str,
                      code: Option<CodeBlock>) -> &mut Self {
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            self.class_file.methods.push(MethodInfo {
                access_flags,
                name_index,
                descriptor_index,
                attributes: code.into_iter().map(AttributeInfo::Code).collect(),
            });
            self
        }

        pub fn build(&mut self) -> ClassFile {
            self.class_file.clone()
        }
    }

    pub fn class_with_fields(name: &str, fields: &[(&str, &str)]) -> Rc<Class> {
        let mut builder = ClassFileBuilder::new(name, None);
        for &(field, descriptor) in fields {
            builder.field(0x0001, field, descriptor);
        }
        Rc::new(Class::new(builder.build(), None).unwrap())
    }

    pub fn code(max_stack: u16, max_locals: u16, code: &[u8]) -> Option<CodeBlock> {
        Some(CodeBlock {
            max_stack,
            max_locals,
            code: code.to_vec(),
            exception_table: vec![],
            attributes: vec![],
        })
    }

    #[test]
    fn builds_fields_and_methods() {
        let mut builder = ClassFileBuilder::new("Counter", Some("java/lang/Object"));
        builder.field(0x0002, "count", "I")
            .field(0x0008, "instances", "J")
            .method(0x0009, "next", "(I)I", code(2, 1, &[0x1a, 0x04, 0x60, 0xac]))
            .method(0x0501, "hash", "()I", None);
        let class = Class::new(builder.build(), None).unwrap();
        assert_eq!(class.name, "Counter");
        assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
        assert!(class.superclass.is_none());
        assert_eq!(class.instance_fields().len(), 1);
        assert_eq!(class.static_fields().map(|f| f.name.as_str()).collect::<Vec<_>>(),
                   vec!["instances"]);

        let next = class.find_method("next", "(I)I").unwrap();
        assert!(next.is_static());
        assert_eq!(next.code.as_ref().map(|code| code.max_stack), Some(2));
        assert_eq!(next.qualified_name(), "Counter.next(I)I");
        assert!(class.find_method("hash", "()I").unwrap().code.is_none());
        assert!(class.find_method("next", "()I").is_none());
    }

    #[test]
    fn bad_field_descriptor() {
        let mut builder = ClassFileBuilder::new("Broken", None);
        builder.field(0, "f", "Q");
        assert_eq!(Class::new(builder.build(), None).map(|_| ()),
                   Err(ClassFormatError::BadDescriptor { descriptor: String::from("Q") }));
    }

    #[test]
    fn inherits_fields_and_methods() {
        let mut base = ClassFileBuilder::new("Base", None);
        base.field(0x0001, "x", "I")
            .method(0x0001, "get", "()I", code(1, 1, &[0x03, 0xac]))
            .method(0x0002, "secret", "()I", code(1, 1, &[0x03, 0xac]));
        let base = Rc::new(Class::new(base.build(), None).unwrap());

        let mut derived = ClassFileBuilder::new("Derived", Some("Base"));
        derived.field(0x0001, "y", "D")
            .method(0x0001, "secret", "()I", code(1, 1, &[0x04, 0xac]));
        let derived = Class::new(derived.build(), Some(base.clone())).unwrap();

        let names: Vec<_> = derived.instance_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(derived.find_method("get", "()I").unwrap().class_name, "Base");
        assert_eq!(derived.dispatch_method("secret", "()I").unwrap().class_name, "Derived");
        assert!(base.dispatch_method("secret", "()I").is_none());
        assert!(derived.is_descendant(&base));
        assert!(!base.is_descendant(&derived));
    }
}
