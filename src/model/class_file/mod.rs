//! Structures for the [JVM class file
//! format](https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html).

pub mod access_flags;
pub mod attributes;
pub mod constant_pool;

pub use self::access_flags::class_access_flags;
pub use self::access_flags::field_access_flags;
pub use self::access_flags::method_access_flags;
pub use self::attributes::{AttributeInfo, CodeBlock};
pub use self::constant_pool::ConstantPoolInfo;
pub use self::constant_pool::ConstantPool;

/// Represents an unsigned one-byte quantity.
#[allow(non_camel_case_types)]
pub type u1 = u8;

/// Represents an unsigned two-byte quantity.
#[allow(non_camel_case_types)]
pub type u2 = u16;

/// Represents an unsigned four-byte quantity.
#[allow(non_camel_case_types)]
pub type u4 = u32;

/// Represents an index into the constant pool.
#[allow(non_camel_case_types)]
pub type constant_pool_index = constant_pool::constant_pool_index;

pub const MAGIC: u4 = 0xCAFE_BABE;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Mask of flags used to denote access permissions to and properties of
    /// this field.
    pub access_flags: field_access_flags::t,
    /// Index of a `ConstantPoolInfo::Utf8` holding the field's unqualified name.
    pub name_index: constant_pool_index,
    /// Index of a `ConstantPoolInfo::Utf8` holding the field descriptor.
    pub descriptor_index: constant_pool_index,
    /// The attributes associated with this field.
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Mask of flags used to denote access permissions to and properties of
    /// this method.
    pub access_flags: method_access_flags::t,
    /// Index of a `ConstantPoolInfo::Utf8` holding the method's unqualified name.
    pub name_index: constant_pool_index,
    /// Index of a `ConstantPoolInfo::Utf8` holding the method descriptor.
    pub descriptor_index: constant_pool_index,
    /// The attributes associated with this method.
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    /// The `Code` attribute of the method. Absent for native and abstract methods.
    pub fn code(&self) -> Option<&CodeBlock> {
        self.attributes.iter().filter_map(|attribute| match *attribute {
            AttributeInfo::Code(ref code) => Some(code),
            _ => None,
        }).next()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Minor version number
    pub minor_version: u2,
    /// Major version number
    pub major_version: u2,
    /// Table of structures representing various string constants, class and
    /// interface names, field names, and other constants. The `constant_pool`
    /// table is indexed from 1 to `constant_pool_count - 1`.
    pub constant_pool: ConstantPool,
    /// Mask of flags used to denote access permissions to and properties of
    /// this class or interface.
    pub access_flags: class_access_flags::t,
    /// Index of the `ConstantPoolInfo::Class` naming this class.
    pub this_class: constant_pool_index,
    /// Zero for a class without a superclass, otherwise the index of the
    /// `ConstantPoolInfo::Class` naming the direct superclass.
    pub super_class: constant_pool_index,
    /// Indices of `ConstantPoolInfo::Class` entries naming the direct
    /// superinterfaces, in declaration order.
    pub interfaces: Vec<constant_pool_index>,
    /// Only the fields declared by this class, not inherited ones.
    pub fields: Vec<FieldInfo>,
    /// Only the methods declared by this class, not inherited ones.
    pub methods: Vec<MethodInfo>,
    /// Contains the attributes of this class.
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// The fully-qualified internal name of this class, e.g. `java/lang/Object`.
    pub fn name(&self) -> Result<&str, crate::error::ClassFormatError> {
        self.constant_pool.resolve_class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<&str>, crate::error::ClassFormatError> {
        if self.super_class == 0 {
            Ok(None)
        } else {
            self.constant_pool.resolve_class_name(self.super_class).map(Some)
        }
    }

    pub fn source_file(&self) -> Option<&str> {
        self.attributes.iter().filter_map(|attribute| match *attribute {
            AttributeInfo::SourceFile { sourcefile_index } =>
                self.constant_pool.resolve_utf8(sourcefile_index).ok(),
            _ => None,
        }).next()
    }
}
