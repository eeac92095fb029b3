//! Field and method descriptors (JVMS §4.3).

use std::fmt;

use crate::error::ClassFormatError;
use crate::vm::value::Value;

/// The type of a field, parameter, or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Reference(Class),
}

/// The type of an object: either a named class or an array of some component type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Class {
    Scalar(String),
    Array(Box<Type>),
}

/// A method's name together with its parsed descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: String,
    pub params: Vec<Type>,
    pub return_ty: Option<Type>,
}

fn bad_descriptor(descriptor: &str) -> ClassFormatError {
    ClassFormatError::BadDescriptor { descriptor: String::from(descriptor) }
}

/// Parses one field type from the front of `input`, returning it with the unparsed rest.
fn parse_type(input: &str) -> Option<(Type, &str)> {
    let mut chars = input.chars();
    let ty = match chars.next()? {
        'B' => Type::Byte,
        'C' => Type::Char,
        'D' => Type::Double,
        'F' => Type::Float,
        'I' => Type::Int,
        'J' => Type::Long,
        'S' => Type::Short,
        'Z' => Type::Boolean,
        'L' => {
            let rest = chars.as_str();
            let end = rest.find(';')?;
            if end == 0 {
                return None;
            }
            return Some((Type::Reference(Class::Scalar(String::from(&rest[..end]))),
                         &rest[end + 1..]));
        },
        '[' => {
            let (component, rest) = parse_type(chars.as_str())?;
            return Some((Type::Reference(Class::Array(Box::new(component))), rest));
        },
        _ => return None,
    };
    Some((ty, chars.as_str()))
}

impl Type {
    /// Parses a complete field descriptor such as `I` or `[Ljava/lang/String;`.
    pub fn new(descriptor: &str) -> Result<Type, ClassFormatError> {
        match parse_type(descriptor) {
            Some((ty, "")) => Ok(ty),
            _ => Err(bad_descriptor(descriptor)),
        }
    }

    /// The value a field of this type holds before anything is stored into it.
    pub fn default_value(&self) -> Value {
        match *self {
            Type::Byte | Type::Char | Type::Int | Type::Short | Type::Boolean => Value::Int(0),
            Type::Float => Value::Float(0.0),
            Type::Long => Value::Long(0),
            Type::Double => Value::Double(0.0),
            Type::Reference(_) => Value::NullReference,
        }
    }

    pub fn is_category_2(&self) -> bool {
        match *self {
            Type::Long | Type::Double => true,
            _ => false,
        }
    }

    /// Number of local variable slots a value of this type occupies.
    pub fn width(&self) -> usize {
        if self.is_category_2() { 2 } else { 1 }
    }
}

impl Class {
    /// Builds a class signature from an internal class name, where array classes are named by
    /// their descriptor, e.g. `[I`.
    pub fn new(name: &str) -> Result<Class, ClassFormatError> {
        if name.starts_with('[') {
            match Type::new(name)? {
                Type::Reference(class) => Ok(class),
                _ => Err(bad_descriptor(name)),
            }
        } else if name.is_empty() {
            Err(bad_descriptor(name))
        } else {
            Ok(Class::Scalar(String::from(name)))
        }
    }
}

impl Method {
    /// Parses a method descriptor such as `(IJ)V`.
    pub fn new(name: &str, descriptor: &str) -> Result<Method, ClassFormatError> {
        let mut rest = match descriptor.strip_prefix('(') {
            Some(rest) => rest,
            None => return Err(bad_descriptor(descriptor)),
        };
        let mut params = vec![];
        while !rest.starts_with(')') {
            let (ty, next) = parse_type(rest).ok_or_else(|| bad_descriptor(descriptor))?;
            params.push(ty);
            rest = next;
        }
        let return_ty = match &rest[1..] {
            "V" => None,
            ret => Some(Type::new(ret).map_err(|_| bad_descriptor(descriptor))?),
        };
        Ok(Method { name: String::from(name), params, return_ty })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Type::Byte => write!(f, "B"),
            Type::Char => write!(f, "C"),
            Type::Double => write!(f, "D"),
            Type::Float => write!(f, "F"),
            Type::Int => write!(f, "I"),
            Type::Long => write!(f, "J"),
            Type::Short => write!(f, "S"),
            Type::Boolean => write!(f, "Z"),
            Type::Reference(Class::Scalar(ref name)) => write!(f, "L{};", name),
            Type::Reference(Class::Array(ref component)) => write!(f, "[{}", component),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        match self.return_ty {
            Some(ref ty) => write!(f, "){}", ty),
            None => write!(f, ")V"),
        }
    }
}
