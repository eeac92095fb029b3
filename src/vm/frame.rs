use std::rc::Rc;

use crate::error::ExecutionError;
use crate::model::class_file::CodeBlock;
use crate::vm::class::{Class, Method};
use crate::vm::heap::ObjectId;
use crate::vm::value::Value;

/// A frame is used to store data and partial results, as well as to perform dynamic linking and
/// return values for methods.
#[derive(Debug)]
pub struct Frame {
    /// The class declaring the currently executing method.
    class: Rc<Class>,
    method: Rc<Method>,
    /// Contains the bytecode currently executing in this frame, along with related structures.
    code: Rc<CodeBlock>,
    /// Offset of the next byte to decode.
    pc: usize,
    /// The local variables of the current method.
    /// Values that occupy two indices (`long` and `double`) are stored in one slot followed by a
    /// `None` value in the subsequent index.
    local_variables: Vec<Option<Value>>,
    /// The operand stack manipulated by the instructions of the current method.
    operand_stack: Vec<Value>,
    /// Depth of the operand stack in words.
    words: usize,
    /// Lowest operand stack depth reached by the instruction in progress.
    low_water: usize,
    /// Values the instruction in progress popped from below `low_water`, top first.
    undo: Vec<Value>,
}

impl Frame {
    /// Creates a frame for `method` with the arguments (receiver first, if any) laid out in the
    /// first local variable slots.
    pub fn new(class: Rc<Class>, method: Rc<Method>, args: Vec<Value>)
               -> Result<Self, ExecutionError> {
        let code = method.code.clone().ok_or_else(|| ExecutionError::NoCodeAttribute {
            class: class.name.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        })?;
        let mut frame = Frame {
            class,
            method,
            local_variables: vec![None; code.max_locals as usize],
            code,
            pc: 0,
            operand_stack: vec![],
            words: 0,
            low_water: 0,
            undo: vec![],
        };
        let mut index = 0;
        for arg in args {
            frame.set_local(index, arg)?;
            index += arg.width();
        }
        Ok(frame)
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn method(&self) -> &Rc<Method> {
        &self.method
    }

    pub fn code(&self) -> &[u8] {
        &self.code.code
    }

    pub fn code_block(&self) -> &Rc<CodeBlock> {
        &self.code
    }

    pub fn max_stack(&self) -> u16 {
        self.code.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.code.max_locals
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    fn invalid_local(&self, index: usize) -> ExecutionError {
        ExecutionError::InvalidLocalIndex { index, max_locals: self.code.max_locals }
    }

    pub fn get_local(&self, index: usize) -> Result<Value, ExecutionError> {
        match self.local_variables.get(index) {
            Some(&Some(value)) => Ok(value),
            Some(&None) => Err(ExecutionError::TypeMismatch {
                expected: "initialized local variable",
                found: format!("empty slot {}", index),
            }),
            None => Err(self.invalid_local(index)),
        }
    }

    pub fn set_local(&mut self, index: usize, value: Value) -> Result<(), ExecutionError> {
        if index + value.width() > self.local_variables.len() {
            let bad = if index < self.local_variables.len() { index + 1 } else { index };
            return Err(self.invalid_local(bad));
        }
        // invalidate the slot after this one if we're storing a category 2 operand
        if value.is_category_2() {
            self.local_variables[index + 1] = None;
        }
        self.local_variables[index] = Some(value);
        // invalidate the slot before this one if it was formerly storing a category 2 operand
        if index > 0 {
            if let Some(prev) = self.local_variables[index - 1] {
                if prev.is_category_2() {
                    self.local_variables[index - 1] = None;
                }
            }
        }
        Ok(())
    }

    pub fn local_variables(&self) -> &[Option<Value>] {
        &self.local_variables
    }

    /// Pushes without checking the declared maximum depth; see `stack_words`.
    pub fn push(&mut self, value: Value) {
        self.words += value.width();
        self.operand_stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        let value = self.operand_stack.pop()?;
        self.words -= value.width();
        if self.operand_stack.len() < self.low_water {
            self.low_water = self.operand_stack.len();
            self.undo.push(value);
        }
        Some(value)
    }

    /// The value `depth` entries below the top of the operand stack.
    pub fn peek(&self, depth: usize) -> Option<Value> {
        self.operand_stack.len().checked_sub(depth + 1).map(|i| self.operand_stack[i])
    }

    pub fn operand_stack(&self) -> &[Value] {
        &self.operand_stack
    }

    /// Number of values on the operand stack.
    pub fn stack_depth(&self) -> usize {
        self.operand_stack.len()
    }

    /// Depth of the operand stack in words, as bounded by `max_stack`.
    pub fn stack_words(&self) -> usize {
        self.words
    }

    /// Removes the top `count` values and returns them in the order they were pushed. Nothing is
    /// removed if there are fewer than `count`.
    pub fn pop_n(&mut self, count: usize) -> Option<Vec<Value>> {
        if count > self.operand_stack.len() {
            return None;
        }
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.extend(self.pop());
        }
        values.reverse();
        Some(values)
    }

    /// Marks the start of an instruction. Operand stack changes made from here on can be undone
    /// with `rollback`.
    pub(crate) fn begin_instruction(&mut self) {
        self.low_water = self.operand_stack.len();
        self.undo.clear();
    }

    /// Restores the operand stack and pc to what they were when the instruction at `pc` began.
    pub(crate) fn rollback(&mut self, pc: usize) {
        while self.operand_stack.len() > self.low_water {
            self.pop();
        }
        while let Some(value) = self.undo.pop() {
            self.push(value);
        }
        self.low_water = self.operand_stack.len();
        self.pc = pc;
    }

    /// Heap identities held by the locals and operand stack of this frame.
    pub fn references<'a>(&'a self) -> impl Iterator<Item = ObjectId> + 'a {
        self.local_variables.iter().filter_map(|slot| slot.and_then(|v| v.as_reference()))
            .chain(self.operand_stack.iter().filter_map(Value::as_reference))
    }
}
