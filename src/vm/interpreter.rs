//! The bytecode dispatch loop.
//!
//! Each call to `Interpreter::step` decodes and executes exactly one instruction of the current
//! frame of a thread. An instruction either completes or fails as a whole: on failure the frame's
//! operand stack and pc are put back the way they were before the instruction began, and the
//! error is reported together with the failing pc and opcode.
//!
//! Native methods are the exception: what a native does to the heap stays done even if its
//! return value is then rejected, since only the frame is rolled back.

use std::rc::Rc;

use crate::config::VmOptions;
use crate::error::{ExecutionError, InterpreterFault};
use crate::model::class_file::class_access_flags;
use crate::vm::bytecode::{mnemonic, opcode};
use crate::vm::class::Method;
use crate::vm::constant_pool::symref;
use crate::vm::frame::Frame;
use crate::vm::heap::Heap;
use crate::vm::method_area::MethodArea;
use crate::vm::native::NativeMethods;
use crate::vm::sig;
use crate::vm::thread::Thread;
use crate::vm::value::Value;

/// Outcome of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// The thread has more to execute.
    Running,
    /// The outermost frame returned. Holds the return value of a non-`void` method.
    Finished(Option<Value>),
}

/// What an instruction does to the call stack once its effect on the current frame is complete.
enum Action {
    Next,
    Invoke(Frame),
    Return(Option<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
}

/// Decodes the operands following an opcode.
struct Operands<'c> {
    code: &'c [u8],
    /// Offset of the next operand byte.
    pc: usize,
}

impl<'c> Operands<'c> {
    fn u1(&mut self) -> Result<u8, ExecutionError> {
        let byte = *self.code.get(self.pc).ok_or(ExecutionError::FellOffCode { pc: self.pc })?;
        self.pc += 1;
        Ok(byte)
    }

    fn i1(&mut self) -> Result<i8, ExecutionError> {
        self.u1().map(|byte| byte as i8)
    }

    fn u2(&mut self) -> Result<u16, ExecutionError> {
        let high = self.u1()? as u16;
        let low = self.u1()? as u16;
        Ok((high << 8) | low)
    }

    fn i2(&mut self) -> Result<i16, ExecutionError> {
        self.u2().map(|short| short as i16)
    }

    fn i4(&mut self) -> Result<i32, ExecutionError> {
        let high = self.u2()? as u32;
        let low = self.u2()? as u32;
        Ok(((high << 16) | low) as i32)
    }

    /// Skips the padding that puts switch operands at a multiple of four bytes from the start of
    /// the code.
    fn align4(&mut self) {
        self.pc = (self.pc + 3) & !3;
    }
}

/// Branch offsets are relative to the address of the branch opcode itself.
fn branch_target(code_len: usize, pc: usize, offset: i32) -> Result<usize, ExecutionError> {
    let target = pc as i64 + offset as i64;
    if target < 0 || target >= code_len as i64 {
        Err(ExecutionError::BranchOutOfRange { target })
    } else {
        Ok(target as usize)
    }
}

/// The verification type of a value; `null` is a reference.
fn kind(value: Value) -> &'static str {
    match value {
        Value::NullReference => "reference",
        value => value.type_name(),
    }
}

fn type_kind(ty: &sig::Type) -> &'static str {
    match *ty {
        sig::Type::Long => "long",
        sig::Type::Float => "float",
        sig::Type::Double => "double",
        sig::Type::Reference(_) => "reference",
        _ => "int",
    }
}

fn mismatch(expected: &'static str, found: Value) -> ExecutionError {
    ExecutionError::TypeMismatch { expected, found: String::from(found.type_name()) }
}

fn check_type(value: Value, ty: &sig::Type) -> Result<Value, ExecutionError> {
    let expected = type_kind(ty);
    if kind(value) == expected {
        Ok(value)
    } else {
        Err(mismatch(expected, value))
    }
}

/// `fcmpl`/`fcmpg` and their double counterparts. `nan` is the result when either is NaN.
fn compare_floats<T: PartialOrd>(a: T, b: T, nan: i32) -> i32 {
    if a > b {
        1
    } else if a == b {
        0
    } else if a < b {
        -1
    } else {
        nan
    }
}

fn unresolved(symref: &symref::Method) -> ExecutionError {
    ExecutionError::UnresolvedMethod {
        class: symref.class.name.clone(),
        name: symref.name.clone(),
        descriptor: symref.descriptor.clone(),
    }
}

fn fault(frame: &Frame, error: ExecutionError, pc: usize, opcode: u8) -> InterpreterFault {
    let method = frame.method();
    match frame.code_block().line_number_at(pc) {
        Some(line) => debug!("{} failed at pc {} (line {}): {}",
                             method.qualified_name(), pc, line, error),
        None => debug!("{} failed at pc {}: {}", method.qualified_name(), pc, error),
    }
    InterpreterFault {
        error,
        class: frame.class().name.clone(),
        method: format!("{}{}", method.name, method.descriptor),
        pc,
        opcode,
    }
}

/// A fault raised when there is no frame to attribute it to.
fn orphan_fault(error: ExecutionError) -> InterpreterFault {
    InterpreterFault { error, class: String::new(), method: String::new(), pc: 0, opcode: 0 }
}

pub struct Interpreter<'a> {
    method_area: &'a mut MethodArea,
    heap: &'a mut Heap,
    natives: &'a NativeMethods,
    options: &'a VmOptions,
}

impl<'a> Interpreter<'a> {
    pub fn new(method_area: &'a mut MethodArea, heap: &'a mut Heap, natives: &'a NativeMethods,
               options: &'a VmOptions) -> Self {
        Interpreter { method_area, heap, natives, options }
    }

    /// Steps `thread` until its outermost frame returns.
    pub fn run(&mut self, thread: &mut Thread) -> Result<Option<Value>, InterpreterFault> {
        loop {
            if let Step::Finished(value) = self.step(thread)? {
                return Ok(value);
            }
        }
    }

    /// Executes one instruction of the current frame of `thread`.
    pub fn step(&mut self, thread: &mut Thread) -> Result<Step, InterpreterFault> {
        if let Some(value) = thread.result() {
            return Ok(Step::Finished(value));
        }
        let depth = thread.depth();
        let frame = thread.current_frame_mut().map_err(orphan_fault)?;
        let pc = frame.pc();
        let opcode = match frame.code().get(pc) {
            Some(&opcode) => opcode,
            None => return Err(fault(frame, ExecutionError::FellOffCode { pc }, pc, 0)),
        };
        trace!("{} pc {}: {} stack {:?}",
               frame.method().qualified_name(), pc, mnemonic(opcode), frame.operand_stack());

        frame.begin_instruction();
        let max_call_depth = self.options.max_call_depth;
        let result = self.execute(frame, pc, opcode).and_then(|action| match action {
            Action::Invoke(_) if depth >= max_call_depth =>
                Err(ExecutionError::CallDepthExceeded { depth: depth + 1 }),
            action => Ok(action),
        });

        match result {
            Err(error) => {
                frame.rollback(pc);
                Err(fault(frame, error, pc, opcode))
            },
            Ok(Action::Next) => Ok(Step::Running),
            Ok(Action::Invoke(callee)) => {
                thread.push_frame(callee);
                Ok(Step::Running)
            },
            Ok(Action::Return(value)) => {
                thread.pop_frame().map_err(orphan_fault)?;
                match thread.current_frame_mut() {
                    Ok(caller) => {
                        if let Some(value) = value {
                            caller.push(value);
                        }
                        Ok(Step::Running)
                    },
                    Err(_) => {
                        thread.finish(value);
                        Ok(Step::Finished(value))
                    },
                }
            },
        }
    }

    fn execute(&mut self, frame: &mut Frame, pc: usize, opcode: u8)
               -> Result<Action, ExecutionError> {
        let code = frame.code_block().clone();
        let code_len = code.code.len();
        let max_stack = frame.max_stack();
        let mut operands = Operands { code: &code.code, pc: pc + 1 };
        let mut next_pc = None;
        let mut action = Action::Next;

        macro_rules! pop {
            () => (frame.pop().ok_or(ExecutionError::OperandStackUnderflow)?);
            ($variant: path, $name: expr) => ({
                match pop!() {
                    $variant(v) => v,
                    v => return Err(mismatch($name, v)),
                }
            });
        }

        macro_rules! pop_reference {
            () => ({
                match pop!() {
                    v @ Value::Reference(_) | v @ Value::NullReference => v,
                    v => return Err(mismatch("reference", v)),
                }
            });
        }

        macro_rules! pop_object {
            () => ({
                match pop_reference!() {
                    Value::Reference(id) => id,
                    _ => return Err(ExecutionError::NullReference),
                }
            });
        }

        macro_rules! pop_category_1 {
            () => ({
                match pop!() {
                    v if !v.is_category_2() => v,
                    v => return Err(mismatch("category 1 value", v)),
                }
            });
        }

        macro_rules! ensure_room {
            ($words: expr) => ({
                if frame.stack_words() + $words > max_stack as usize {
                    return Err(ExecutionError::OperandStackOverflow { max_stack });
                }
            });
        }

        macro_rules! push {
            ($($v: expr),+) => ({
                $(
                    let v = $v;
                    ensure_room!(v.width());
                    frame.push(v);
                )+
            });
        }

        macro_rules! load {
            ($index: expr, $name: expr) => ({
                let value = frame.get_local($index as usize)?;
                if kind(value) != $name {
                    return Err(mismatch($name, value));
                }
                push!(value);
            });
        }

        macro_rules! store {
            ($index: expr, $name: expr) => ({
                let value = pop!();
                if kind(value) != $name {
                    return Err(mismatch($name, value));
                }
                frame.set_local($index as usize, value)?;
            });
        }

        macro_rules! iinc {
            ($index: expr, $constant: expr) => ({
                let index = $index as usize;
                match frame.get_local(index)? {
                    Value::Int(v) => frame.set_local(index, Value::Int(v.wrapping_add($constant)))?,
                    v => return Err(mismatch("int", v)),
                }
            });
        }

        // pops the right operand, then the left one
        macro_rules! binary {
            ($variant: path, $name: expr, |$a: ident, $b: ident| $result: expr) => ({
                let $b = pop!($variant, $name);
                let $a = pop!($variant, $name);
                push!($variant($result));
            });
        }

        macro_rules! unary {
            ($from: path, $name: expr, |$a: ident| $result: expr) => ({
                let $a = pop!($from, $name);
                push!($result);
            });
        }

        // long shifts take an int shift distance
        macro_rules! shift {
            ($variant: path, $name: expr, |$a: ident, $b: ident| $result: expr) => ({
                let $b = pop!(Value::Int, "int");
                let $a = pop!($variant, $name);
                push!($variant($result));
            });
        }

        macro_rules! branch_if {
            ($cond: expr) => ({
                let offset = operands.i2()? as i32;
                if $cond {
                    next_pc = Some(branch_target(code_len, pc, offset)?);
                }
            });
        }

        macro_rules! if_zero {
            (|$a: ident| $cond: expr) => ({
                let $a = pop!(Value::Int, "int");
                branch_if!($cond);
            });
        }

        macro_rules! if_icmp {
            (|$a: ident, $b: ident| $cond: expr) => ({
                let $b = pop!(Value::Int, "int");
                let $a = pop!(Value::Int, "int");
                branch_if!($cond);
            });
        }

        match opcode {
            opcode::NOP => (),
            opcode::ACONST_NULL => push!(Value::NullReference),
            opcode::ICONST_M1 => push!(Value::Int(-1)),
            opcode::ICONST_0 => push!(Value::Int(0)),
            opcode::ICONST_1 => push!(Value::Int(1)),
            opcode::ICONST_2 => push!(Value::Int(2)),
            opcode::ICONST_3 => push!(Value::Int(3)),
            opcode::ICONST_4 => push!(Value::Int(4)),
            opcode::ICONST_5 => push!(Value::Int(5)),
            opcode::LCONST_0 => push!(Value::Long(0)),
            opcode::LCONST_1 => push!(Value::Long(1)),
            opcode::FCONST_0 => push!(Value::Float(0.0)),
            opcode::FCONST_1 => push!(Value::Float(1.0)),
            opcode::FCONST_2 => push!(Value::Float(2.0)),
            opcode::DCONST_0 => push!(Value::Double(0.0)),
            opcode::DCONST_1 => push!(Value::Double(1.0)),
            opcode::BIPUSH => push!(Value::Int(operands.i1()? as i32)),
            opcode::SIPUSH => push!(Value::Int(operands.i2()? as i32)),
            opcode::LDC | opcode::LDC_W | opcode::LDC2_W => {
                let index = if opcode == opcode::LDC { operands.u1()? as u16 } else { operands.u2()? };
                let value = frame.class().constant_pool().resolve_literal(index)?;
                let wide = opcode == opcode::LDC2_W;
                if value.is_category_2() != wide {
                    let expected = if wide { "long or double" } else { "category 1 value" };
                    return Err(mismatch(expected, value));
                }
                push!(value);
            },

            opcode::ILOAD => load!(operands.u1()?, "int"),
            opcode::LLOAD => load!(operands.u1()?, "long"),
            opcode::FLOAD => load!(operands.u1()?, "float"),
            opcode::DLOAD => load!(operands.u1()?, "double"),
            opcode::ALOAD => load!(operands.u1()?, "reference"),
            opcode::ILOAD_0..=opcode::ILOAD_3 => load!(opcode - opcode::ILOAD_0, "int"),
            opcode::LLOAD_0..=opcode::LLOAD_3 => load!(opcode - opcode::LLOAD_0, "long"),
            opcode::FLOAD_0..=opcode::FLOAD_3 => load!(opcode - opcode::FLOAD_0, "float"),
            opcode::DLOAD_0..=opcode::DLOAD_3 => load!(opcode - opcode::DLOAD_0, "double"),
            opcode::ALOAD_0..=opcode::ALOAD_3 => load!(opcode - opcode::ALOAD_0, "reference"),

            opcode::ISTORE => store!(operands.u1()?, "int"),
            opcode::LSTORE => store!(operands.u1()?, "long"),
            opcode::FSTORE => store!(operands.u1()?, "float"),
            opcode::DSTORE => store!(operands.u1()?, "double"),
            opcode::ASTORE => store!(operands.u1()?, "reference"),
            opcode::ISTORE_0..=opcode::ISTORE_3 => store!(opcode - opcode::ISTORE_0, "int"),
            opcode::LSTORE_0..=opcode::LSTORE_3 => store!(opcode - opcode::LSTORE_0, "long"),
            opcode::FSTORE_0..=opcode::FSTORE_3 => store!(opcode - opcode::FSTORE_0, "float"),
            opcode::DSTORE_0..=opcode::DSTORE_3 => store!(opcode - opcode::DSTORE_0, "double"),
            opcode::ASTORE_0..=opcode::ASTORE_3 => store!(opcode - opcode::ASTORE_0, "reference"),

            opcode::POP => {
                pop_category_1!();
            },
            opcode::POP2 => {
                if !pop!().is_category_2() {
                    pop_category_1!();
                }
            },
            opcode::DUP => {
                let value = pop_category_1!();
                push!(value, value);
            },
            opcode::DUP_X1 => {
                let value1 = pop_category_1!();
                let value2 = pop_category_1!();
                push!(value1, value2, value1);
            },
            opcode::DUP_X2 => {
                let value1 = pop_category_1!();
                let value2 = pop!();
                if value2.is_category_2() {
                    push!(value1, value2, value1);
                } else {
                    let value3 = pop_category_1!();
                    push!(value1, value3, value2, value1);
                }
            },
            opcode::DUP2 => {
                let value1 = pop!();
                if value1.is_category_2() {
                    push!(value1, value1);
                } else {
                    let value2 = pop_category_1!();
                    push!(value2, value1, value2, value1);
                }
            },
            opcode::DUP2_X1 => {
                let value1 = pop!();
                if value1.is_category_2() {
                    let value2 = pop_category_1!();
                    push!(value1, value2, value1);
                } else {
                    let value2 = pop_category_1!();
                    let value3 = pop_category_1!();
                    push!(value2, value1, value3, value2, value1);
                }
            },
            opcode::DUP2_X2 => {
                let value1 = pop!();
                if value1.is_category_2() {
                    let value2 = pop!();
                    if value2.is_category_2() {
                        push!(value1, value2, value1);
                    } else {
                        let value3 = pop_category_1!();
                        push!(value1, value3, value2, value1);
                    }
                } else {
                    let value2 = pop_category_1!();
                    let value3 = pop!();
                    if value3.is_category_2() {
                        push!(value2, value1, value3, value2, value1);
                    } else {
                        let value4 = pop_category_1!();
                        push!(value2, value1, value4, value3, value2, value1);
                    }
                }
            },
            opcode::SWAP => {
                let value1 = pop_category_1!();
                let value2 = pop_category_1!();
                push!(value1, value2);
            },

            opcode::IADD => binary!(Value::Int, "int", |a, b| a.wrapping_add(b)),
            opcode::LADD => binary!(Value::Long, "long", |a, b| a.wrapping_add(b)),
            opcode::FADD => binary!(Value::Float, "float", |a, b| a + b),
            opcode::DADD => binary!(Value::Double, "double", |a, b| a + b),
            opcode::ISUB => binary!(Value::Int, "int", |a, b| a.wrapping_sub(b)),
            opcode::LSUB => binary!(Value::Long, "long", |a, b| a.wrapping_sub(b)),
            opcode::FSUB => binary!(Value::Float, "float", |a, b| a - b),
            opcode::DSUB => binary!(Value::Double, "double", |a, b| a - b),
            opcode::IMUL => binary!(Value::Int, "int", |a, b| a.wrapping_mul(b)),
            opcode::LMUL => binary!(Value::Long, "long", |a, b| a.wrapping_mul(b)),
            opcode::FMUL => binary!(Value::Float, "float", |a, b| a * b),
            opcode::DMUL => binary!(Value::Double, "double", |a, b| a * b),
            opcode::IDIV => binary!(Value::Int, "int", |a, b| {
                if b == 0 {
                    return Err(ExecutionError::ArithmeticFault);
                }
                a.wrapping_div(b)
            }),
            opcode::LDIV => binary!(Value::Long, "long", |a, b| {
                if b == 0 {
                    return Err(ExecutionError::ArithmeticFault);
                }
                a.wrapping_div(b)
            }),
            opcode::FDIV => binary!(Value::Float, "float", |a, b| a / b),
            opcode::DDIV => binary!(Value::Double, "double", |a, b| a / b),
            opcode::IREM => binary!(Value::Int, "int", |a, b| {
                if b == 0 {
                    return Err(ExecutionError::ArithmeticFault);
                }
                a.wrapping_rem(b)
            }),
            opcode::LREM => binary!(Value::Long, "long", |a, b| {
                if b == 0 {
                    return Err(ExecutionError::ArithmeticFault);
                }
                a.wrapping_rem(b)
            }),
            opcode::FREM => binary!(Value::Float, "float", |a, b| a % b),
            opcode::DREM => binary!(Value::Double, "double", |a, b| a % b),
            opcode::INEG => unary!(Value::Int, "int", |a| Value::Int(a.wrapping_neg())),
            opcode::LNEG => unary!(Value::Long, "long", |a| Value::Long(a.wrapping_neg())),
            opcode::FNEG => unary!(Value::Float, "float", |a| Value::Float(-a)),
            opcode::DNEG => unary!(Value::Double, "double", |a| Value::Double(-a)),
            opcode::ISHL => shift!(Value::Int, "int", |a, b| a.wrapping_shl(b as u32)),
            opcode::LSHL => shift!(Value::Long, "long", |a, b| a.wrapping_shl(b as u32)),
            opcode::ISHR => shift!(Value::Int, "int", |a, b| a.wrapping_shr(b as u32)),
            opcode::LSHR => shift!(Value::Long, "long", |a, b| a.wrapping_shr(b as u32)),
            opcode::IUSHR => shift!(Value::Int, "int", |a, b| (a as u32).wrapping_shr(b as u32) as i32),
            opcode::LUSHR => shift!(Value::Long, "long", |a, b| (a as u64).wrapping_shr(b as u32) as i64),
            opcode::IAND => binary!(Value::Int, "int", |a, b| a & b),
            opcode::LAND => binary!(Value::Long, "long", |a, b| a & b),
            opcode::IOR => binary!(Value::Int, "int", |a, b| a | b),
            opcode::LOR => binary!(Value::Long, "long", |a, b| a | b),
            opcode::IXOR => binary!(Value::Int, "int", |a, b| a ^ b),
            opcode::LXOR => binary!(Value::Long, "long", |a, b| a ^ b),
            opcode::IINC => {
                let index = operands.u1()?;
                let constant = operands.i1()? as i32;
                iinc!(index, constant);
            },

            opcode::I2L => unary!(Value::Int, "int", |a| Value::Long(a as i64)),
            opcode::I2F => unary!(Value::Int, "int", |a| Value::Float(a as f32)),
            opcode::I2D => unary!(Value::Int, "int", |a| Value::Double(a as f64)),
            opcode::L2I => unary!(Value::Long, "long", |a| Value::Int(a as i32)),
            opcode::L2F => unary!(Value::Long, "long", |a| Value::Float(a as f32)),
            opcode::L2D => unary!(Value::Long, "long", |a| Value::Double(a as f64)),
            // `as` saturates and maps NaN to zero, as the JVM does
            opcode::F2I => unary!(Value::Float, "float", |a| Value::Int(a as i32)),
            opcode::F2L => unary!(Value::Float, "float", |a| Value::Long(a as i64)),
            opcode::F2D => unary!(Value::Float, "float", |a| Value::Double(a as f64)),
            opcode::D2I => unary!(Value::Double, "double", |a| Value::Int(a as i32)),
            opcode::D2L => unary!(Value::Double, "double", |a| Value::Long(a as i64)),
            opcode::D2F => unary!(Value::Double, "double", |a| Value::Float(a as f32)),
            opcode::I2B => unary!(Value::Int, "int", |a| Value::Int(a as i8 as i32)),
            opcode::I2C => unary!(Value::Int, "int", |a| Value::Int(a as u16 as i32)),
            opcode::I2S => unary!(Value::Int, "int", |a| Value::Int(a as i16 as i32)),

            opcode::LCMP => {
                let b = pop!(Value::Long, "long");
                let a = pop!(Value::Long, "long");
                push!(Value::Int(a.cmp(&b) as i32));
            },
            opcode::FCMPL | opcode::FCMPG => {
                let b = pop!(Value::Float, "float");
                let a = pop!(Value::Float, "float");
                let nan = if opcode == opcode::FCMPL { -1 } else { 1 };
                push!(Value::Int(compare_floats(a, b, nan)));
            },
            opcode::DCMPL | opcode::DCMPG => {
                let b = pop!(Value::Double, "double");
                let a = pop!(Value::Double, "double");
                let nan = if opcode == opcode::DCMPL { -1 } else { 1 };
                push!(Value::Int(compare_floats(a, b, nan)));
            },
            opcode::IFEQ => if_zero!(|a| a == 0),
            opcode::IFNE => if_zero!(|a| a != 0),
            opcode::IFLT => if_zero!(|a| a < 0),
            opcode::IFGE => if_zero!(|a| a >= 0),
            opcode::IFGT => if_zero!(|a| a > 0),
            opcode::IFLE => if_zero!(|a| a <= 0),
            opcode::IF_ICMPEQ => if_icmp!(|a, b| a == b),
            opcode::IF_ICMPNE => if_icmp!(|a, b| a != b),
            opcode::IF_ICMPLT => if_icmp!(|a, b| a < b),
            opcode::IF_ICMPGE => if_icmp!(|a, b| a >= b),
            opcode::IF_ICMPGT => if_icmp!(|a, b| a > b),
            opcode::IF_ICMPLE => if_icmp!(|a, b| a <= b),
            opcode::IF_ACMPEQ | opcode::IF_ACMPNE => {
                let b = pop_reference!();
                let a = pop_reference!();
                branch_if!((a == b) == (opcode == opcode::IF_ACMPEQ));
            },
            opcode::IFNULL | opcode::IFNONNULL => {
                let a = pop_reference!();
                branch_if!((a == Value::NullReference) == (opcode == opcode::IFNULL));
            },
            opcode::GOTO => branch_if!(true),
            opcode::GOTO_W => {
                let offset = operands.i4()?;
                next_pc = Some(branch_target(code_len, pc, offset)?);
            },
            opcode::TABLESWITCH => {
                operands.align4();
                let default = operands.i4()?;
                let low = operands.i4()?;
                let high = operands.i4()?;
                let index = pop!(Value::Int, "int");
                let offset = if index < low || index > high {
                    default
                } else {
                    operands.pc += 4 * (index as i64 - low as i64) as usize;
                    operands.i4()?
                };
                next_pc = Some(branch_target(code_len, pc, offset)?);
            },
            opcode::LOOKUPSWITCH => {
                operands.align4();
                let default = operands.i4()?;
                let npairs = operands.i4()?;
                let key = pop!(Value::Int, "int");
                let mut offset = default;
                for _ in 0..npairs.max(0) {
                    let candidate = operands.i4()?;
                    let candidate_offset = operands.i4()?;
                    if candidate == key {
                        offset = candidate_offset;
                        break;
                    }
                }
                next_pc = Some(branch_target(code_len, pc, offset)?);
            },

            opcode::IRETURN => return Ok(Action::Return(Some(Value::Int(pop!(Value::Int, "int"))))),
            opcode::LRETURN => return Ok(Action::Return(Some(Value::Long(pop!(Value::Long, "long"))))),
            opcode::FRETURN => return Ok(Action::Return(Some(Value::Float(pop!(Value::Float, "float"))))),
            opcode::DRETURN =>
                return Ok(Action::Return(Some(Value::Double(pop!(Value::Double, "double"))))),
            opcode::ARETURN => return Ok(Action::Return(Some(pop_reference!()))),
            opcode::RETURN => return Ok(Action::Return(None)),

            opcode::GETSTATIC => {
                let field = frame.class().constant_pool().field_ref(operands.u2()?)?;
                let value = self.method_area.get_static(&field.class.name, &field.name)?;
                push!(value);
            },
            opcode::PUTSTATIC => {
                let field = frame.class().constant_pool().field_ref(operands.u2()?)?;
                let ty = sig::Type::new(&field.descriptor)?;
                let value = check_type(pop!(), &ty)?;
                self.method_area.put_static(&field.class.name, &field.name, value)?;
            },
            opcode::GETFIELD => {
                let field = frame.class().constant_pool().field_ref(operands.u2()?)?;
                let id = pop_object!();
                let value = self.heap.get_field(id, &field.name)?;
                push!(value);
            },
            opcode::PUTFIELD => {
                let field = frame.class().constant_pool().field_ref(operands.u2()?)?;
                let ty = sig::Type::new(&field.descriptor)?;
                let value = check_type(pop!(), &ty)?;
                let id = pop_object!();
                self.heap.set_field(id, &field.name, value)?;
            },
            opcode::NEW => {
                let class_ref = frame.class().constant_pool().class_ref(operands.u2()?)?;
                let class = self.method_area.get(&class_ref.name)
                    .ok_or(ExecutionError::UnresolvedClass { class: class_ref.name })?;
                ensure_room!(1);
                let id = self.heap.allocate(class)?;
                push!(Value::Reference(id));
            },

            opcode::INVOKEVIRTUAL => {
                let symref = frame.class().constant_pool().method_ref(operands.u2()?, false)?;
                action = self.invoke(frame, &symref, InvokeKind::Virtual)?;
            },
            opcode::INVOKESPECIAL => {
                let symref = frame.class().constant_pool().any_method_ref(operands.u2()?)?;
                action = self.invoke(frame, &symref, InvokeKind::Special)?;
            },
            opcode::INVOKESTATIC => {
                let symref = frame.class().constant_pool().any_method_ref(operands.u2()?)?;
                action = self.invoke(frame, &symref, InvokeKind::Static)?;
            },
            opcode::INVOKEINTERFACE => {
                let symref = frame.class().constant_pool().method_ref(operands.u2()?, true)?;
                // the historical count and zero bytes
                operands.u2()?;
                action = self.invoke(frame, &symref, InvokeKind::Interface)?;
            },

            opcode::WIDE => {
                let modified = operands.u1()?;
                let index = operands.u2()?;
                match modified {
                    opcode::ILOAD => load!(index, "int"),
                    opcode::LLOAD => load!(index, "long"),
                    opcode::FLOAD => load!(index, "float"),
                    opcode::DLOAD => load!(index, "double"),
                    opcode::ALOAD => load!(index, "reference"),
                    opcode::ISTORE => store!(index, "int"),
                    opcode::LSTORE => store!(index, "long"),
                    opcode::FSTORE => store!(index, "float"),
                    opcode::DSTORE => store!(index, "double"),
                    opcode::ASTORE => store!(index, "reference"),
                    opcode::IINC => {
                        let constant = operands.i2()? as i32;
                        iinc!(index, constant);
                    },
                    _ => return Err(ExecutionError::UnsupportedOpcode { opcode: modified, pc }),
                }
            },

            // arrays, exceptions, monitors, type checks, subroutines and invokedynamic
            _ => return Err(ExecutionError::UnsupportedOpcode { opcode, pc }),
        }

        frame.set_pc(next_pc.unwrap_or(operands.pc));
        Ok(action)
    }

    fn resolve_method(&self, symref: &symref::Method) -> Result<Rc<Method>, ExecutionError> {
        let class = self.method_area.get(&symref.class.name)
            .ok_or_else(|| ExecutionError::UnresolvedClass { class: symref.class.name.clone() })?;
        class.find_method(&symref.name, &symref.descriptor).ok_or_else(|| unresolved(symref))
    }

    /// Selects the method an invocation runs. A resolution failure is reported as `Ok(None)` if
    /// a native method is registered under the symbolic name.
    fn select_method(&self, frame: &Frame, symref: &symref::Method, kind: InvokeKind,
                     receiver: Option<Value>) -> Result<Option<Rc<Method>>, ExecutionError> {
        let selected = match kind {
            InvokeKind::Static => self.resolve_method(symref),
            InvokeKind::Special => self.resolve_method(symref).map(|resolved| {
                // invoking a superclass method from a class with ACC_SUPER looks the method up
                // starting at the direct superclass of the current class
                let current = frame.class();
                let in_superclass = current.access_flags & class_access_flags::ACC_SUPER != 0
                    && symref.name != "<init>"
                    && current.name != symref.class.name
                    && self.method_area.get(&symref.class.name)
                        .map_or(false, |named| current.is_descendant(&named));
                if in_superclass {
                    current.superclass.as_ref()
                        .and_then(|superclass| superclass.find_method(&symref.name,
                                                                      &symref.descriptor))
                        .unwrap_or(resolved)
                } else {
                    resolved
                }
            }),
            InvokeKind::Virtual | InvokeKind::Interface => {
                match receiver {
                    Some(Value::Reference(id)) => {
                        let class = self.heap.get(id)?.class().clone();
                        class.dispatch_method(&symref.name, &symref.descriptor)
                            .ok_or_else(|| unresolved(symref))
                    },
                    _ => Err(ExecutionError::NullReference),
                }
            },
        };
        match selected {
            Ok(method) => {
                if method.is_static() != (kind == InvokeKind::Static) {
                    return Err(unresolved(symref));
                }
                Ok(Some(method))
            },
            Err(ExecutionError::NullReference) => Err(ExecutionError::NullReference),
            Err(error) => match self.natives.bind(symref) {
                Some(_) => Ok(None),
                None => Err(error),
            },
        }
    }

    /// Pops the arguments of an invocation and either builds the callee's frame or runs the
    /// native implementation in place.
    fn invoke(&mut self, frame: &mut Frame, symref: &symref::Method, kind: InvokeKind)
              -> Result<Action, ExecutionError> {
        let sig = sig::Method::new(&symref.name, &symref.descriptor)?;
        let receiver_count = if kind == InvokeKind::Static { 0 } else { 1 };
        let args = frame.pop_n(sig.params.len() + receiver_count)
            .ok_or(ExecutionError::OperandStackUnderflow)?;
        let receiver = if receiver_count == 1 {
            match args[0] {
                receiver @ Value::Reference(_) => Some(receiver),
                Value::NullReference => return Err(ExecutionError::NullReference),
                other => return Err(mismatch("reference", other)),
            }
        } else {
            None
        };
        for (&arg, ty) in args[receiver_count..].iter().zip(&sig.params) {
            check_type(arg, ty)?;
        }
        if let Some(ref ty) = sig.return_ty {
            if frame.stack_words() + ty.width() > frame.max_stack() as usize {
                return Err(ExecutionError::OperandStackOverflow { max_stack: frame.max_stack() });
            }
        }

        let method = self.select_method(frame, symref, kind, receiver)?;
        if let Some(ref method) = method {
            if method.code.is_some() {
                let class = self.method_area.get(&method.class_name)
                    .ok_or_else(|| ExecutionError::UnresolvedClass {
                        class: method.class_name.clone(),
                    })?;
                return Ok(Action::Invoke(Frame::new(class, method.clone(), args)?));
            }
        }

        let natives = self.natives;
        let (class, name, descriptor) = match method {
            Some(ref method) => (&method.class_name, &method.name, &method.descriptor),
            None => (&symref.class.name, &symref.name, &symref.descriptor),
        };
        let native = natives.get(class, name, descriptor)
            .ok_or_else(|| ExecutionError::NoCodeAttribute {
                class: class.clone(),
                name: name.clone(),
                descriptor: descriptor.clone(),
            })?;
        debug!("calling native method {}.{}{}", class, name, descriptor);
        let result = native.invoke(self.heap, &args)
            .map_err(|message| ExecutionError::NativeMethod {
                class: class.clone(),
                name: name.clone(),
                descriptor: descriptor.clone(),
                message,
            })?;
        match (result, sig.return_ty) {
            (Some(value), Some(ty)) => frame.push(check_type(value, &ty)?),
            (None, None) => (),
            (Some(value), None) => return Err(mismatch("void", value)),
            (None, Some(ty)) => return Err(ExecutionError::TypeMismatch {
                expected: type_kind(&ty),
                found: String::from("void"),
            }),
        }
        Ok(Action::Next)
    }
}
