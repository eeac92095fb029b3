//! Host implementations of methods that have no bytecode.

use std::collections::HashMap;
use std::fmt;

use crate::vm::constant_pool::symref;
use crate::vm::heap::Heap;
use crate::vm::value::Value;

/// The result of a native call: the return value (if the method isn't `void`) or an error
/// message.
pub type NativeResult = Result<Option<Value>, String>;

pub struct NativeMethod(Box<dyn Fn(&mut Heap, &[Value]) -> NativeResult>);

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<native method>")
    }
}

impl NativeMethod {
    /// Calls the method. `args` holds the receiver first for instance methods.
    pub fn invoke(&self, heap: &mut Heap, args: &[Value]) -> NativeResult {
        (self.0)(heap, args)
    }
}

/// Native methods keyed by class name, method name and descriptor.
#[derive(Debug, Default)]
pub struct NativeMethods {
    methods: HashMap<(String, String, String), NativeMethod>,
}

impl NativeMethods {
    pub fn new() -> Self {
        NativeMethods::default()
    }

    /// Registers `f` as the implementation of `class.name descriptor`, replacing any earlier
    /// registration.
    pub fn register<F>(&mut self, class: &str, name: &str, descriptor: &str, f: F)
        where F: Fn(&mut Heap, &[Value]) -> NativeResult + 'static
    {
        debug!("registered native method {}.{}{}", class, name, descriptor);
        self.methods.insert((String::from(class), String::from(name), String::from(descriptor)),
                            NativeMethod(Box::new(f)));
    }

    pub fn bind(&self, symref: &symref::Method) -> Option<&NativeMethod> {
        self.get(&symref.class.name, &symref.name, &symref.descriptor)
    }

    pub fn get(&self, class: &str, name: &str, descriptor: &str) -> Option<&NativeMethod> {
        self.methods.get(&(String::from(class), String::from(name), String::from(descriptor)))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_and_invoke() {
        let mut natives = NativeMethods::new();
        natives.register("java/lang/Math", "max", "(II)I", |_, args| match *args {
            [Value::Int(a), Value::Int(b)] => Ok(Some(Value::Int(a.max(b)))),
            _ => Err(String::from("expected two ints")),
        });
        let mut heap = Heap::new(1000);
        let max = natives.get("java/lang/Math", "max", "(II)I").unwrap();
        assert_eq!(max.invoke(&mut heap, &[Value::Int(3), Value::Int(9)]), Ok(Some(Value::Int(9))));
        assert!(max.invoke(&mut heap, &[Value::Int(3)]).is_err());
        assert!(natives.get("java/lang/Math", "max", "(JJ)J").is_none());
        assert_eq!(natives.len(), 1);
    }
}
