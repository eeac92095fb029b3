//! The `Runtime` ties the method area, the heap, threads and a class source together.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::config::VmOptions;
use crate::error::{Error, ExecutionError, Result};
use crate::parser::class_file::parse_class_file;
use crate::vm::class::Class;
use crate::vm::class_source::ClassSource;
use crate::vm::frame::Frame;
use crate::vm::gc;
use crate::vm::heap::{Heap, ObjectId};
use crate::vm::interpreter::{Interpreter, Step};
use crate::vm::method_area::MethodArea;
use crate::vm::native::{NativeMethods, NativeResult};
use crate::vm::thread::{Thread, ThreadId};
use crate::vm::value::Value;

const OBJECT: &str = "java/lang/Object";

pub struct Runtime {
    options: VmOptions,
    method_area: MethodArea,
    heap: Heap,
    natives: NativeMethods,
    source: Box<dyn ClassSource>,
    threads: HashMap<ThreadId, Thread>,
    next_thread_id: ThreadId,
    /// Names of the classes being loaded right now, to detect circular superclass chains.
    pending: HashSet<String>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .field("classes", &self.method_area.len())
            .field("objects", &self.heap.live_count())
            .field("threads", &self.threads.len())
            .finish()
    }
}

impl Runtime {
    /// Creates a runtime that loads classes from `source`.
    ///
    /// `java/lang/Object.<init>()V` is bound to a native no-op, so that constructors compiled
    /// against the standard library run without it.
    pub fn new<S: ClassSource + 'static>(source: S, options: VmOptions) -> Self {
        let mut natives = NativeMethods::new();
        natives.register(OBJECT, "<init>", "()V", |_, _| Ok(None));
        Runtime {
            heap: Heap::new(options.heap_id_base),
            options,
            method_area: MethodArea::new(),
            natives,
            source: Box::new(source),
            threads: HashMap::new(),
            next_thread_id: 1,
            pending: HashSet::new(),
        }
    }

    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    pub fn method_area(&self) -> &MethodArea {
        &self.method_area
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Registers a host implementation for a method without bytecode.
    pub fn register_native<F>(&mut self, class: &str, name: &str, descriptor: &str, f: F)
        where F: Fn(&mut Heap, &[Value]) -> NativeResult + 'static
    {
        self.natives.register(class, name, descriptor, f);
    }

    /// Returns the class named `name`, loading it and its superclasses from the class source if
    /// they aren't loaded yet. A superclass the source doesn't have is skipped with a warning and
    /// the class becomes a root of the hierarchy.
    pub fn load_class(&mut self, name: &str) -> Result<Rc<Class>> {
        if let Some(class) = self.method_area.get(name) {
            return Ok(class);
        }
        if !self.pending.insert(String::from(name)) {
            return Err(Error::ClassCircularity { name: String::from(name) });
        }
        let result = self.source.find_class(name)
            .map_err(Error::from)
            .and_then(|bytes| self.load_bytes(Some(name), &bytes));
        self.pending.remove(name);
        result
    }

    /// Defines a class from class file bytes that didn't come from the class source. Its
    /// superclass is still looked up there.
    pub fn define_class(&mut self, bytes: &[u8]) -> Result<Rc<Class>> {
        self.load_bytes(None, bytes)
    }

    fn load_bytes(&mut self, expected: Option<&str>, bytes: &[u8]) -> Result<Rc<Class>> {
        let class_file = parse_class_file(bytes)?;
        let name = String::from(class_file.name()?);
        if let Some(expected) = expected {
            if name != expected {
                return Err(Error::NoClassDefFound { expected: String::from(expected), found: name });
            }
        }
        if let Some(super_name) = class_file.super_name()?.map(String::from) {
            match self.load_class(&super_name) {
                Ok(_) => (),
                Err(Error::ClassNotFound(e)) => warn!("loading {} without its superclass: {}", name, e),
                Err(e) => return Err(e),
            }
        }
        Ok(self.method_area.define(class_file)?)
    }

    /// Allocates an instance of `class`, loading the class if needed.
    pub fn allocate(&mut self, class: &str) -> Result<ObjectId> {
        let class = self.load_class(class)?;
        Ok(self.heap.allocate(class)?)
    }

    pub fn get_static(&self, class: &str, field: &str) -> Result<Value> {
        Ok(self.method_area.get_static(class, field)?)
    }

    /// Creates a thread whose only frame is about to execute `class.name descriptor` with `args`
    /// (the receiver first for instance methods) in its local variables.
    pub fn spawn_thread(&mut self, class: &str, name: &str, descriptor: &str, args: Vec<Value>)
                        -> Result<ThreadId> {
        let class = self.load_class(class)?;
        let method = class.find_method(name, descriptor)
            .ok_or_else(|| ExecutionError::UnresolvedMethod {
                class: class.name.clone(),
                name: String::from(name),
                descriptor: String::from(descriptor),
            })?;
        let expected = method.sig.params.len() + if method.is_static() { 0 } else { 1 };
        if args.len() != expected {
            return Err(ExecutionError::TypeMismatch {
                expected: "one argument per parameter",
                found: format!("{} arguments", args.len()),
            }.into());
        }
        let declaring = self.method_area.get(&method.class_name).unwrap_or(class);
        let frame = Frame::new(declaring, method, args)?;

        let id = self.next_thread_id;
        self.next_thread_id += 1;
        let mut thread = Thread::new(id);
        thread.push_frame(frame);
        self.threads.insert(id, thread);
        Ok(id)
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    /// Forgets a thread. Whatever it references is no longer a root.
    pub fn remove_thread(&mut self, id: ThreadId) -> Option<Thread> {
        self.threads.remove(&id)
    }

    /// Executes one instruction of thread `id`.
    ///
    /// An instruction that names a class which isn't loaded yet fails without effect, so the
    /// class is loaded from the class source and the instruction is executed again.
    pub fn step(&mut self, id: ThreadId) -> Result<Step> {
        loop {
            let thread = self.threads.get_mut(&id).ok_or(Error::NoSuchThread(id))?;
            let fault = match Interpreter::new(&mut self.method_area, &mut self.heap,
                                               &self.natives, &self.options).step(thread) {
                Ok(step) => {
                    self.collect_over_threshold();
                    return Ok(step);
                },
                Err(fault) => fault,
            };
            let missing = match fault.error {
                ExecutionError::UnresolvedClass { ref class } if !self.method_area.contains(class) =>
                    class.clone(),
                _ => return Err(fault.into()),
            };
            debug!("thread {}: loading {} on demand", id, missing);
            match self.load_class(&missing) {
                Ok(_) => (),
                Err(Error::ClassNotFound(_)) => return Err(fault.into()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Runs thread `id` until its outermost method returns, and returns what it returned. The
    /// thread stays in the runtime, so a faulting thread's frames can still be inspected.
    pub fn run_thread(&mut self, id: ThreadId) -> Result<Option<Value>> {
        loop {
            if let Step::Finished(value) = self.step(id)? {
                return Ok(value);
            }
        }
    }

    /// Runs a method on a fresh thread to completion and discards the thread.
    pub fn invoke_static(&mut self, class: &str, name: &str, descriptor: &str, args: Vec<Value>)
                         -> Result<Option<Value>> {
        let id = self.spawn_thread(class, name, descriptor, args)?;
        let result = self.run_thread(id);
        self.threads.remove(&id);
        result
    }

    /// Collects garbage with every thread's frames and every static field as roots. Returns the
    /// number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        let roots = gc::collect_roots(self.threads.values(), &self.method_area);
        debug!("collecting garbage from {} roots", roots.len());
        gc::collect(&mut self.heap, &roots)
    }

    fn collect_over_threshold(&mut self) {
        if let Some(threshold) = self.options.gc_threshold {
            if self.heap.live_count() > threshold {
                self.collect_garbage();
            }
        }
    }
}
