//! The runtime: loaded classes, the heap, threads of execution and the interpreter that runs
//! them.

pub mod bytecode;
pub mod class;
pub mod class_source;
pub mod constant_pool;
pub mod frame;
pub mod gc;
pub mod heap;
pub mod interpreter;
pub mod method_area;
pub mod native;
pub mod runtime;
pub mod sig;
pub mod thread;
pub mod value;

pub use self::class::{Class, Method};
pub use self::class_source::{ClassSource, DirectoryClassSource, MemoryClassSource};
pub use self::constant_pool::{symref, RuntimeConstantPool};
pub use self::frame::Frame;
pub use self::heap::{Heap, HeapObject, ObjectId};
pub use self::interpreter::{Interpreter, Step};
pub use self::method_area::MethodArea;
pub use self::native::NativeMethods;
pub use self::runtime::Runtime;
pub use self::thread::{Thread, ThreadId};
pub use self::value::Value;
