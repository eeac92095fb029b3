//! Internal JVM representations of Java values.

use std::fmt;

use crate::vm::heap::ObjectId;

/// A value in the Java virtual machine. References are tagged so that the garbage collector can
/// tell them apart from numbers when it scans frames for roots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A 32-bit signed integral type, representing the Java types `byte`, `char`, `short`, `int`,
    /// and `boolean`.
    Int(i32),
    /// A 32-bit floating-point type, representing the Java type `float`.
    Float(f32),
    /// A 64-bit signed integral type, representing the Java type `long`.
    Long(i64),
    /// A 64-bit floating-point type, representing the Java type `double`.
    Double(f64),
    /// A reference to an object in the heap.
    Reference(ObjectId),
    /// A reference to a Java object which is `null`.
    NullReference,
}

impl Value {
    /// Long and double values take up two local variable slots and two words of operand stack.
    pub fn is_category_2(&self) -> bool {
        match *self {
            Value::Long(_) | Value::Double(_) => true,
            _ => false,
        }
    }

    /// Number of local variable slots (or operand stack words) the value occupies.
    pub fn width(&self) -> usize {
        if self.is_category_2() { 2 } else { 1 }
    }

    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Reference(_) => "reference",
            Value::NullReference => "null",
        }
    }

    /// The heap identity held by the value, if any.
    pub fn as_reference(&self) -> Option<ObjectId> {
        match *self {
            Value::Reference(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Reference(id) => write!(f, "{}", id),
            Value::NullReference => write!(f, "null"),
        }
    }
}
