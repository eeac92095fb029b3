//! Error taxonomy of the virtual machine.
//!
//! Class format errors are fatal to loading one class, execution errors are fatal to one thread,
//! and heap faults are fatal to the single heap operation that raised them.

use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

use crate::model::class_file::constant_pool::Tag;
use crate::vm::heap::ObjectId;

/// Result type for operations that may fail with any VM error.
pub type Result<T> = std::result::Result<T, Error>;

/// The class file bytes do not describe a well-formed class.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassFormatError {
    #[error("bad magic number 0x{found:08X}")]
    BadMagic { found: u32 },

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("constant pool index {index} holds {actual:?}, expected {expected:?}")]
    WrongTag { index: u16, expected: Tag, actual: Tag },

    #[error("constant pool index {index} is out of range for a pool of count {count}")]
    IndexOutOfRange { index: u16, count: u16 },

    #[error("unexpected end of input with {remaining} bytes remaining")]
    UnexpectedEndOfInput { remaining: usize },

    #[error("malformed modified UTF-8 in constant pool entry {index}")]
    MalformedUtf8 { index: u16 },

    #[error("attribute {name} declares {declared} bytes but its body is {consumed} bytes")]
    AttributeLength { name: String, declared: u32, consumed: usize },

    #[error("{count} unexpected bytes after the end of the class file")]
    TrailingBytes { count: usize },

    #[error("malformed descriptor {descriptor:?}")]
    BadDescriptor { descriptor: String },

    #[error("malformed class file ({kind:?})")]
    Malformed { kind: ErrorKind },
}

impl<'a> ParseError<&'a [u8]> for ClassFormatError {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof => ClassFormatError::UnexpectedEndOfInput { remaining: input.len() },
            kind => ClassFormatError::Malformed { kind },
        }
    }

    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

/// Failure of a heap operation. Never corrupts other heap entries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeapFault {
    #[error("no live object with identity {id}")]
    NoSuchObject { id: ObjectId },

    #[error("class {class} of object {id} declares no field {field}")]
    NoSuchField { id: ObjectId, class: String, field: String },

    #[error("every object identity has been handed out")]
    IdentitiesExhausted,
}

/// What went wrong while executing bytecode. See `InterpreterFault` for the same error together
/// with the location it happened at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("operand stack underflow")]
    OperandStackUnderflow,

    #[error("operand stack overflow (max stack {max_stack})")]
    OperandStackOverflow { max_stack: u16 },

    #[error("invalid local variable index {index} (max locals {max_locals})")]
    InvalidLocalIndex { index: usize, max_locals: u16 },

    #[error("call stack is empty")]
    EmptyCallStack,

    #[error("call depth {depth} exceeds the configured limit")]
    CallDepthExceeded { depth: usize },

    #[error("unsupported opcode 0x{opcode:02X} at pc {pc}")]
    UnsupportedOpcode { opcode: u8, pc: usize },

    #[error("unresolved method {class}.{name}{descriptor}")]
    UnresolvedMethod { class: String, name: String, descriptor: String },

    #[error("class {class} declares no static field {field}")]
    UnresolvedField { class: String, field: String },

    #[error("class {class} is not loaded")]
    UnresolvedClass { class: String },

    #[error("method {class}.{name}{descriptor} has no Code attribute")]
    NoCodeAttribute { class: String, name: String, descriptor: String },

    #[error("native method {class}.{name}{descriptor} failed: {message}")]
    NativeMethod { class: String, name: String, descriptor: String, message: String },

    #[error("arithmetic fault: division by zero")]
    ArithmeticFault,

    #[error("expected {expected} on the operand stack, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    #[error("null reference")]
    NullReference,

    #[error("branch target {target} is outside the method's code")]
    BranchOutOfRange { target: i64 },

    #[error("execution ran past the end of the code at pc {pc}")]
    FellOffCode { pc: usize },

    #[error("constant pool entry {index} cannot be loaded onto the operand stack")]
    UnsupportedConstant { index: u16 },

    #[error(transparent)]
    Heap(#[from] HeapFault),

    #[error(transparent)]
    ClassFormat(#[from] ClassFormatError),
}

/// An `ExecutionError` raised by a specific instruction, with enough context to reproduce it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} in {class}.{method} at pc {pc} (opcode 0x{opcode:02X})")]
pub struct InterpreterFault {
    #[source]
    pub error: ExecutionError,
    pub class: String,
    pub method: String,
    pub pc: usize,
    pub opcode: u8,
}

/// The class source collaborator found nothing under the requested name.
#[derive(Error, Debug)]
#[error("class {name} not found")]
pub struct ClassNotFound {
    pub name: String,
    #[source]
    pub cause: Option<std::io::Error>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("class format error: {0}")]
    ClassFormat(#[from] ClassFormatError),

    #[error(transparent)]
    ClassNotFound(#[from] ClassNotFound),

    #[error("class {name} is its own superclass")]
    ClassCircularity { name: String },

    #[error("class {expected} was requested but the bytes define {found}")]
    NoClassDefFound { expected: String, found: String },

    #[error("interpreter fault: {0}")]
    Interpreter(#[from] InterpreterFault),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("heap fault: {0}")]
    Heap(#[from] HeapFault),

    #[error("no thread with id {0}")]
    NoSuchThread(u64),
}
