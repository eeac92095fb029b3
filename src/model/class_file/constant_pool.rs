use crate::error::ClassFormatError;
use crate::util::one_indexed_vec::OneIndexedVec;

use super::u1;
use super::u2;
use super::u4;

#[allow(non_camel_case_types)]
pub type constant_pool_index = u2;

pub mod tags {
    use super::super::u1;
    pub const CLASS: u1 = 7;
    pub const FIELD_REF: u1 = 9;
    pub const METHOD_REF: u1 = 10;
    pub const INTERFACE_METHOD_REF: u1 = 11;
    pub const STRING: u1 = 8;
    pub const INTEGER: u1 = 3;
    pub const FLOAT: u1 = 4;
    pub const LONG: u1 = 5;
    pub const DOUBLE: u1 = 6;
    pub const NAME_AND_TYPE: u1 = 12;
    pub const UTF_8: u1 = 1;
    pub const METHOD_HANDLE: u1 = 15;
    pub const METHOD_TYPE: u1 = 16;
    pub const INVOKE_DYNAMIC: u1 = 18;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Class,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    String,
    Integer,
    Float,
    Long,
    Double,
    NameAndType,
    Utf8,
    MethodHandle,
    MethodType,
    InvokeDynamic,
    Unknown(u1),
}

impl From<u1> for Tag {
    fn from(tag: u1) -> Self {
        match tag {
            tags::CLASS => Tag::Class,
            tags::FIELD_REF => Tag::FieldRef,
            tags::METHOD_REF => Tag::MethodRef,
            tags::INTERFACE_METHOD_REF => Tag::InterfaceMethodRef,
            tags::STRING => Tag::String,
            tags::INTEGER => Tag::Integer,
            tags::FLOAT => Tag::Float,
            tags::LONG => Tag::Long,
            tags::DOUBLE => Tag::Double,
            tags::NAME_AND_TYPE => Tag::NameAndType,
            tags::UTF_8 => Tag::Utf8,
            tags::METHOD_HANDLE => Tag::MethodHandle,
            tags::METHOD_TYPE => Tag::MethodType,
            tags::INVOKE_DYNAMIC => Tag::InvokeDynamic,
            _ => Tag::Unknown(tag),
        }
    }
}

/// The `reference_kind` byte of a `CONSTANT_MethodHandle` (JVMS §5.4.3.5).
pub mod reference_kind {
    use super::super::u1;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Tag {
        GetField,
        GetStatic,
        PutField,
        PutStatic,
        InvokeVirtual,
        InvokeStatic,
        InvokeSpecial,
        NewInvokeSpecial,
        InvokeInterface,
        Unknown(u1),
    }

    impl From<u1> for Tag {
        fn from(kind: u1) -> Self {
            match kind {
                1 => Tag::GetField,
                2 => Tag::GetStatic,
                3 => Tag::PutField,
                4 => Tag::PutStatic,
                5 => Tag::InvokeVirtual,
                6 => Tag::InvokeStatic,
                7 => Tag::InvokeSpecial,
                8 => Tag::NewInvokeSpecial,
                9 => Tag::InvokeInterface,
                _ => Tag::Unknown(kind),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolInfo {
    Class { name_index: constant_pool_index },
    FieldRef { class_index: constant_pool_index, name_and_type_index: constant_pool_index },
    MethodRef { class_index: constant_pool_index, name_and_type_index: constant_pool_index },
    InterfaceMethodRef {
        class_index: constant_pool_index,
        name_and_type_index: constant_pool_index
    },
    String { string_index: constant_pool_index },
    Integer { bytes: u4 },
    Float { bytes: u4 },
    Long { high_bytes: u4, low_bytes: u4 },
    Double { high_bytes: u4, low_bytes: u4 },
    NameAndType {
        name_index: constant_pool_index,
        descriptor_index: constant_pool_index,
    },
    /// The decoded contents of a modified UTF-8 entry.
    Utf8 { value: String },
    MethodHandle { reference_kind: reference_kind::Tag, reference_index: constant_pool_index },
    MethodType { descriptor_index: constant_pool_index },
    InvokeDynamic {
        /// A valid index into the `bootstrap_methods` array of the bootstrap
        /// method table.
        bootstrap_method_attr_index: u2,
        name_and_type_index: constant_pool_index,
    },
}

impl ConstantPoolInfo {
    pub fn tag(&self) -> Tag {
        match *self {
            ConstantPoolInfo::Class { .. } => Tag::Class,
            ConstantPoolInfo::FieldRef { .. } => Tag::FieldRef,
            ConstantPoolInfo::MethodRef { .. } => Tag::MethodRef,
            ConstantPoolInfo::InterfaceMethodRef { .. } => Tag::InterfaceMethodRef,
            ConstantPoolInfo::String { .. } => Tag::String,
            ConstantPoolInfo::Integer { .. } => Tag::Integer,
            ConstantPoolInfo::Float { .. } => Tag::Float,
            ConstantPoolInfo::Long { .. } => Tag::Long,
            ConstantPoolInfo::Double { .. } => Tag::Double,
            ConstantPoolInfo::NameAndType { .. } => Tag::NameAndType,
            ConstantPoolInfo::Utf8 { .. } => Tag::Utf8,
            ConstantPoolInfo::MethodHandle { .. } => Tag::MethodHandle,
            ConstantPoolInfo::MethodType { .. } => Tag::MethodType,
            ConstantPoolInfo::InvokeDynamic { .. } => Tag::InvokeDynamic,
        }
    }

    /// Long and double entries take up two consecutive indices.
    pub fn is_wide(&self) -> bool {
        match *self {
            ConstantPoolInfo::Long { .. } | ConstantPoolInfo::Double { .. } => true,
            _ => false,
        }
    }
}

/// The constant pool of a class, indexed from 1 to `count() - 1`. The index following a long or
/// double entry is a reserved slot that holds `None` and can't be dereferenced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    entries: OneIndexedVec<Option<ConstantPoolInfo>>,
}

impl ConstantPool {
    pub fn new() -> Self {
        ConstantPool { entries: OneIndexedVec::new() }
    }

    /// Appends an entry, reserving the following slot if the entry is a long or double.
    pub fn push(&mut self, info: ConstantPoolInfo) {
        let wide = info.is_wide();
        self.entries.push(Some(info));
        if wide {
            self.entries.push(None);
        }
    }

    /// The `constant_pool_count` of the class file: one more than the number of index slots.
    pub fn count(&self) -> u16 {
        (self.entries.len() + 1) as u16
    }

    /// The number of entries actually present, not counting reserved slots.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Iterates over the present entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (constant_pool_index, &ConstantPoolInfo)> {
        self.entries.indexed()
            .filter_map(|(i, e)| e.as_ref().map(|info| (i as constant_pool_index, info)))
    }

    pub fn get(&self, index: constant_pool_index) -> Result<&ConstantPoolInfo, ClassFormatError> {
        match self.entries.get(index as usize) {
            Some(Some(info)) => Ok(info),
            _ => Err(ClassFormatError::IndexOutOfRange { index, count: self.count() }),
        }
    }

    /// Dereferences `index` and checks that the entry has the expected tag.
    pub fn get_tagged(&self, index: constant_pool_index, expected: Tag)
                      -> Result<&ConstantPoolInfo, ClassFormatError> {
        let info = self.get(index)?;
        if info.tag() == expected {
            Ok(info)
        } else {
            Err(wrong_tag(index, expected, info))
        }
    }

    pub fn resolve_utf8(&self, index: constant_pool_index) -> Result<&str, ClassFormatError> {
        match *self.get(index)? {
            ConstantPoolInfo::Utf8 { ref value } => Ok(value),
            ref info => Err(wrong_tag(index, Tag::Utf8, info)),
        }
    }

    pub fn resolve_class_name(&self, index: constant_pool_index)
                              -> Result<&str, ClassFormatError> {
        match *self.get(index)? {
            ConstantPoolInfo::Class { name_index } => self.resolve_utf8(name_index),
            ref info => Err(wrong_tag(index, Tag::Class, info)),
        }
    }

    /// Resolves a `NameAndType` entry to its name and descriptor strings.
    pub fn resolve_name_and_type(&self, index: constant_pool_index)
                                 -> Result<(&str, &str), ClassFormatError> {
        match *self.get(index)? {
            ConstantPoolInfo::NameAndType { name_index, descriptor_index } =>
                Ok((self.resolve_utf8(name_index)?, self.resolve_utf8(descriptor_index)?)),
            ref info => Err(wrong_tag(index, Tag::NameAndType, info)),
        }
    }

    /// Resolves a field, method, or interface method reference to its class name, member name,
    /// and descriptor. `expected` selects which of the three reference tags is acceptable.
    pub fn resolve_member_ref(&self, index: constant_pool_index, expected: Tag)
                              -> Result<(&str, &str, &str), ClassFormatError> {
        let (class_index, name_and_type_index) = match *self.get_tagged(index, expected)? {
            ConstantPoolInfo::FieldRef { class_index, name_and_type_index }
            | ConstantPoolInfo::MethodRef { class_index, name_and_type_index }
            | ConstantPoolInfo::InterfaceMethodRef { class_index, name_and_type_index } =>
                (class_index, name_and_type_index),
            ref info => return Err(wrong_tag(index, expected, info)),
        };
        let class = self.resolve_class_name(class_index)?;
        let (name, descriptor) = self.resolve_name_and_type(name_and_type_index)?;
        Ok((class, name, descriptor))
    }

    /// Checks that every reference between entries of the pool points at an entry of the right
    /// kind. Method handles and invokedynamic entries are not checked.
    pub fn check_references(&self) -> Result<(), ClassFormatError> {
        for (_, info) in self.iter() {
            match *info {
                ConstantPoolInfo::Class { name_index } => {
                    self.get_tagged(name_index, Tag::Utf8)?;
                },
                ConstantPoolInfo::String { string_index } => {
                    self.get_tagged(string_index, Tag::Utf8)?;
                },
                ConstantPoolInfo::FieldRef { class_index, name_and_type_index }
                | ConstantPoolInfo::MethodRef { class_index, name_and_type_index }
                | ConstantPoolInfo::InterfaceMethodRef { class_index, name_and_type_index } => {
                    self.get_tagged(class_index, Tag::Class)?;
                    self.get_tagged(name_and_type_index, Tag::NameAndType)?;
                },
                ConstantPoolInfo::NameAndType { name_index, descriptor_index } => {
                    self.get_tagged(name_index, Tag::Utf8)?;
                    self.get_tagged(descriptor_index, Tag::Utf8)?;
                },
                ConstantPoolInfo::MethodType { descriptor_index } => {
                    self.get_tagged(descriptor_index, Tag::Utf8)?;
                },
                _ => (),
            }
        }
        Ok(())
    }
}

fn wrong_tag(index: constant_pool_index, expected: Tag, info: &ConstantPoolInfo)
             -> ClassFormatError {
    ClassFormatError::WrongTag { index, expected, actual: info.tag() }
}
