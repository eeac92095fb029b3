//! A small class file assembler for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use mini_jvm::logging::SimpleLogger;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_SUPER: u16 = 0x0020;

/// Installs the stderr logger at the level named by `MINI_JVM_LOG`. Only the first call in a
/// test binary installs it.
pub fn init_logging() {
    let _ = SimpleLogger::init_from_env(log::Level::Warn);
}

pub fn u2(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Builds the bytes of a class file. Constant pool entries are appended on demand, and UTF-8 and
/// class entries are shared.
#[derive(Clone)]
pub struct ClassAssembler {
    pool: Vec<u8>,
    next_index: u16,
    utf8s: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    this_class: u16,
    super_class: u16,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
}

impl ClassAssembler {
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut assembler = ClassAssembler {
            pool: vec![],
            next_index: 1,
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            this_class: 0,
            super_class: 0,
            fields: vec![],
            methods: vec![],
        };
        assembler.this_class = assembler.class(name);
        if let Some(super_name) = super_name {
            assembler.super_class = assembler.class(super_name);
        }
        assembler
    }

    fn entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.pool.extend_from_slice(bytes);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8s.get(value) {
            return index;
        }
        let mut bytes = vec![1];
        bytes.extend_from_slice(&u2(value.len() as u16));
        bytes.extend_from_slice(value.as_bytes());
        let index = self.entry(&bytes, 1);
        self.utf8s.insert(String::from(value), index);
        index
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7];
        bytes.extend_from_slice(&u2(name_index));
        let index = self.entry(&bytes, 1);
        self.classes.insert(String::from(name), index);
        index
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.entry(&bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.entry(&bytes, 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![6];
        bytes.extend_from_slice(&value.to_bits().to_be_bytes());
        self.entry(&bytes, 2)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = vec![12];
        bytes.extend_from_slice(&u2(name_index));
        bytes.extend_from_slice(&u2(descriptor_index));
        self.entry(&bytes, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&u2(class_index));
        bytes.extend_from_slice(&u2(name_and_type_index));
        self.entry(&bytes, 1)
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(9, class, name, descriptor)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(10, class, name, descriptor)
    }

    pub fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(11, class, name, descriptor)
    }

    fn member(&mut self, access_flags: u16, name: &str, descriptor: &str,
              attributes: Vec<Vec<u8>>) -> Vec<u8> {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = vec![];
        bytes.extend_from_slice(&u2(access_flags));
        bytes.extend_from_slice(&u2(name_index));
        bytes.extend_from_slice(&u2(descriptor_index));
        bytes.extend_from_slice(&u2(attributes.len() as u16));
        for attribute in attributes {
            bytes.extend(attribute);
        }
        bytes
    }

    fn attribute(&mut self, name: &str, body: &[u8]) -> Vec<u8> {
        let name_index = self.utf8(name);
        let mut bytes = vec![];
        bytes.extend_from_slice(&u2(name_index));
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) -> &mut Self {
        let field = self.member(access_flags, name, descriptor, vec![]);
        self.fields.push(field);
        self
    }

    /// A static field initialized from an `Integer` constant.
    pub fn constant_field(&mut self, name: &str, value: i32) -> &mut Self {
        let constant = self.integer(value);
        let attribute = self.attribute("ConstantValue", &u2(constant));
        let field = self.member(ACC_PUBLIC | ACC_STATIC, name, "I", vec![attribute]);
        self.fields.push(field);
        self
    }

    pub fn method(&mut self, access_flags: u16, name: &str, descriptor: &str, max_stack: u16,
                  max_locals: u16, code: &[u8]) -> &mut Self {
        let mut body = vec![];
        body.extend_from_slice(&u2(max_stack));
        body.extend_from_slice(&u2(max_locals));
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(code);
        body.extend_from_slice(&u2(0)); // exception table
        body.extend_from_slice(&u2(0)); // attributes
        let attribute = self.attribute("Code", &body);
        let method = self.member(access_flags, name, descriptor, vec![attribute]);
        self.methods.push(method);
        self
    }

    /// A method without a `Code` attribute.
    pub fn native_method(&mut self, access_flags: u16, name: &str, descriptor: &str) -> &mut Self {
        let method = self.member(access_flags | ACC_NATIVE, name, descriptor, vec![]);
        self.methods.push(method);
        self
    }

    pub fn assemble(&self) -> Vec<u8> {
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
        bytes.extend_from_slice(&u2(self.next_index));
        bytes.extend_from_slice(&self.pool);
        bytes.extend_from_slice(&u2(ACC_PUBLIC | ACC_SUPER));
        bytes.extend_from_slice(&u2(self.this_class));
        bytes.extend_from_slice(&u2(self.super_class));
        bytes.extend_from_slice(&u2(0)); // interfaces
        bytes.extend_from_slice(&u2(self.fields.len() as u16));
        for field in &self.fields {
            bytes.extend_from_slice(field);
        }
        bytes.extend_from_slice(&u2(self.methods.len() as u16));
        for method in &self.methods {
            bytes.extend_from_slice(method);
        }
        bytes.extend_from_slice(&u2(0)); // attributes
        bytes
    }
}

/// Concatenates instruction fragments into a code array.
pub fn code(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}
