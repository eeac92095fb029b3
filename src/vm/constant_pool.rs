//! Resolution of constant pool entries into the symbolic references and literal values the
//! interpreter works with.

use crate::error::ExecutionError;
use crate::model::class_file::constant_pool::{constant_pool_index, Tag};
use crate::model::class_file::{ConstantPool, ConstantPoolInfo};
use crate::vm::value::Value;

/// A reference to an unresolved structure in the runtime constant pool.
pub mod symref {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Class {
        pub name: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Method {
        pub class: Class,
        pub name: String,
        pub descriptor: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Field {
        pub class: Class,
        pub name: String,
        pub descriptor: String,
    }

    impl fmt::Display for Method {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{}.{}{}", self.class.name, self.name, self.descriptor)
        }
    }
}

/// The constant pool of a loaded class, as seen by the interpreter.
#[derive(Debug)]
pub struct RuntimeConstantPool {
    pool: ConstantPool,
}

impl RuntimeConstantPool {
    pub fn new(pool: ConstantPool) -> Self {
        RuntimeConstantPool { pool }
    }

    pub fn class_ref(&self, index: constant_pool_index) -> Result<symref::Class, ExecutionError> {
        let name = self.pool.resolve_class_name(index)?;
        Ok(symref::Class { name: String::from(name) })
    }

    /// Resolves a `Methodref`, or an `InterfaceMethodref` when `interface` is set.
    pub fn method_ref(&self, index: constant_pool_index, interface: bool)
                      -> Result<symref::Method, ExecutionError> {
        let tag = if interface { Tag::InterfaceMethodRef } else { Tag::MethodRef };
        let (class, name, descriptor) = self.pool.resolve_member_ref(index, tag)?;
        Ok(symref::Method {
            class: symref::Class { name: String::from(class) },
            name: String::from(name),
            descriptor: String::from(descriptor),
        })
    }

    /// Resolves either kind of method reference; `invokestatic` and `invokespecial` accept both.
    pub fn any_method_ref(&self, index: constant_pool_index)
                          -> Result<symref::Method, ExecutionError> {
        let interface = self.pool.get(index)?.tag() == Tag::InterfaceMethodRef;
        self.method_ref(index, interface)
    }

    pub fn field_ref(&self, index: constant_pool_index) -> Result<symref::Field, ExecutionError> {
        let (class, name, descriptor) = self.pool.resolve_member_ref(index, Tag::FieldRef)?;
        Ok(symref::Field {
            class: symref::Class { name: String::from(class) },
            name: String::from(name),
            descriptor: String::from(descriptor),
        })
    }

    /// Resolves a numeric constant, as loaded by `ldc` or named by a `ConstantValue` attribute.
    /// String, class and method handle constants need objects this runtime can't create.
    pub fn resolve_literal(&self, index: constant_pool_index) -> Result<Value, ExecutionError> {
        match *self.pool.get(index)? {
            ConstantPoolInfo::Integer { bytes } => Ok(Value::Int(bytes as i32)),
            ConstantPoolInfo::Float { bytes } => Ok(Value::Float(f32::from_bits(bytes))),
            ConstantPoolInfo::Long { high_bytes, low_bytes } =>
                Ok(Value::Long(wide_bits(high_bytes, low_bytes) as i64)),
            ConstantPoolInfo::Double { high_bytes, low_bytes } =>
                Ok(Value::Double(f64::from_bits(wide_bits(high_bytes, low_bytes)))),
            _ => Err(ExecutionError::UnsupportedConstant { index }),
        }
    }
}

fn wide_bits(high_bytes: u32, low_bytes: u32) -> u64 {
    ((high_bytes as u64) << 32) | low_bytes as u64
}
