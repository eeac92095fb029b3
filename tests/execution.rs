mod common;

use mini_jvm::error::{Error, ExecutionError};
use mini_jvm::vm::bytecode::opcode::*;
use mini_jvm::vm::{MemoryClassSource, Runtime, Step, Value};
use mini_jvm::VmOptions;

use common::{code, u2, ClassAssembler, ACC_PUBLIC, ACC_STATIC};

const PUBLIC_STATIC: u16 = ACC_PUBLIC | ACC_STATIC;

fn runtime(classes: &[&ClassAssembler], options: VmOptions) -> Runtime {
    common::init_logging();
    let mut source = MemoryClassSource::new();
    for class in classes {
        let bytes = class.assemble();
        let name = mini_jvm::parser::class_file::parse_class_file(&bytes).unwrap()
            .name().unwrap().to_owned();
        source.add(&name, bytes);
    }
    Runtime::new(source, options)
}

fn fault(result: Result<Option<Value>, Error>) -> mini_jvm::error::InterpreterFault {
    match result {
        Err(Error::Interpreter(fault)) => fault,
        other => panic!("expected an interpreter fault, got {:?}", other),
    }
}

#[test]
fn sum_lands_on_the_caller_stack() {
    let mut calc = ClassAssembler::new("Calc", Some("java/lang/Object"));
    let sum = calc.method_ref("Calc", "sum", "()I");
    calc.method(PUBLIC_STATIC, "sum", "()I", 2, 0, &[ICONST_5, BIPUSH, 10, IADD, IRETURN])
        .method(PUBLIC_STATIC, "main", "()I", 1, 0, &code(&[&[INVOKESTATIC], &u2(sum), &[IRETURN]]));
    let mut runtime = runtime(&[&calc], VmOptions::default());
    let id = runtime.spawn_thread("Calc", "main", "()I", vec![]).unwrap();

    // invokestatic, then the four instructions of sum
    for _ in 0..5 {
        assert_eq!(runtime.step(id).unwrap(), Step::Running);
    }
    let thread = runtime.thread(id).unwrap();
    assert_eq!(thread.depth(), 1);
    assert_eq!(thread.current_frame().unwrap().operand_stack(), &[Value::Int(15)]);
    assert_eq!(runtime.run_thread(id).unwrap(), Some(Value::Int(15)));
}

#[test]
fn equality_branch_consumes_both_operands() {
    let mut branch = ClassAssembler::new("Branch", None);
    for &(name, second) in &[("same", 3u8), ("different", 4u8)] {
        branch.method(PUBLIC_STATIC, name, "()I", 2, 0, &[
            BIPUSH, 3,          // 0
            BIPUSH, second,     // 2
            IF_ICMPEQ, 0, 7,    // 4
            ICONST_0,           // 7
            IRETURN,            // 8
            NOP,                // 9
            NOP,                // 10
            ICONST_1,           // 11
            IRETURN,            // 12
        ]);
    }
    let mut runtime = runtime(&[&branch], VmOptions::default());
    for &(name, target, result) in &[("same", 11, 1), ("different", 7, 0)] {
        let id = runtime.spawn_thread("Branch", name, "()I", vec![]).unwrap();
        for _ in 0..3 {
            runtime.step(id).unwrap();
        }
        let frame = runtime.thread(id).unwrap().current_frame().unwrap();
        assert!(frame.operand_stack().is_empty());
        assert_eq!(frame.pc(), target);
        assert_eq!(runtime.run_thread(id).unwrap(), Some(Value::Int(result)));
    }
}

#[test]
fn branch_after_multi_byte_instructions() {
    let mut main = ClassAssembler::new("Main", None);
    let seven = main.integer(7);
    main.method(PUBLIC_STATIC, "main", "()I", 2, 0, &code(&[
        &[SIPUSH, 0x01, 0x00],          // 0
        &[LDC_W], &u2(seven),           // 3
        &[IADD],                        // 6
        &[GOTO, 0, 5],                  // 7, jumps to 12
        &[ICONST_0],                    // 10
        &[IRETURN],                     // 11
        &[IRETURN],                     // 12
    ]));
    let mut runtime = runtime(&[&main], VmOptions::default());
    assert_eq!(runtime.invoke_static("Main", "main", "()I", vec![]).unwrap(),
               Some(Value::Int(263)));
}

#[test]
fn division_by_zero_is_atomic() {
    let mut main = ClassAssembler::new("Main", None);
    main.method(PUBLIC_STATIC, "divide", "(II)I", 3, 2,
                &[BIPUSH, 42, ILOAD_0, ILOAD_1, IDIV, IADD, IRETURN]);
    let mut runtime = runtime(&[&main], VmOptions::default());
    assert_eq!(runtime.invoke_static("Main", "divide", "(II)I", vec![Value::Int(9), Value::Int(3)])
                   .unwrap(),
               Some(Value::Int(45)));

    let id = runtime.spawn_thread("Main", "divide", "(II)I", vec![Value::Int(9), Value::Int(0)])
        .unwrap();
    let fault = fault(runtime.run_thread(id));
    assert_eq!(fault.error, ExecutionError::ArithmeticFault);
    assert_eq!((fault.class.as_str(), fault.method.as_str()), ("Main", "divide(II)I"));
    assert_eq!((fault.pc, fault.opcode), (4, IDIV));
    let frame = runtime.thread(id).unwrap().current_frame().unwrap();
    assert_eq!(frame.operand_stack(), &[Value::Int(42), Value::Int(9), Value::Int(0)]);
    assert_eq!(frame.pc(), 4);
}

#[test]
fn long_division_by_zero() {
    let mut main = ClassAssembler::new("Main", None);
    main.method(PUBLIC_STATIC, "main", "()J", 4, 0, &[LCONST_1, LCONST_0, LREM, LRETURN]);
    let mut runtime = runtime(&[&main], VmOptions::default());
    let fault = fault(runtime.invoke_static("Main", "main", "()J", vec![]));
    assert_eq!(fault.error, ExecutionError::ArithmeticFault);
}

#[test]
fn invocation_with_missing_arguments_underflows() {
    let mut main = ClassAssembler::new("Main", None);
    let add = main.method_ref("Main", "add", "(II)I");
    main.method(PUBLIC_STATIC, "add", "(II)I", 2, 2, &[ILOAD_0, ILOAD_1, IADD, IRETURN])
        .method(PUBLIC_STATIC, "main", "()I", 2, 0,
                &code(&[&[ICONST_1], &[INVOKESTATIC], &u2(add), &[IRETURN]]));
    let mut runtime = runtime(&[&main], VmOptions::default());
    let id = runtime.spawn_thread("Main", "main", "()I", vec![]).unwrap();
    let fault = fault(runtime.run_thread(id));
    assert_eq!(fault.error, ExecutionError::OperandStackUnderflow);
    assert_eq!(fault.pc, 1);
    let thread = runtime.thread(id).unwrap();
    assert_eq!(thread.depth(), 1);
    assert_eq!(thread.current_frame().unwrap().operand_stack(), &[Value::Int(1)]);
}

#[test]
fn unknown_method() {
    let mut main = ClassAssembler::new("Main", None);
    let missing = main.method_ref("Main", "missing", "()V");
    main.method(PUBLIC_STATIC, "main", "()V", 0, 0,
                &code(&[&[INVOKESTATIC], &u2(missing), &[RETURN]]));
    let mut runtime = runtime(&[&main], VmOptions::default());
    let fault = fault(runtime.invoke_static("Main", "main", "()V", vec![]));
    assert_eq!(fault.error, ExecutionError::UnresolvedMethod {
        class: String::from("Main"),
        name: String::from("missing"),
        descriptor: String::from("()V"),
    });
}

/// `Square extends Shape`, both with constructors the way a compiler emits them.
fn shapes() -> Vec<ClassAssembler> {
    let mut shape = ClassAssembler::new("Shape", Some("java/lang/Object"));
    let object_init = shape.method_ref("java/lang/Object", "<init>", "()V");
    shape.method(ACC_PUBLIC, "<init>", "()V", 1, 1,
                 &code(&[&[ALOAD_0, INVOKESPECIAL], &u2(object_init), &[RETURN]]))
        .method(ACC_PUBLIC, "area", "()I", 1, 1, &[ICONST_0, IRETURN])
        .method(ACC_PUBLIC, "sides", "()I", 1, 1, &[ICONST_4, IRETURN]);

    let mut square = ClassAssembler::new("Square", Some("Shape"));
    let shape_init = square.method_ref("Shape", "<init>", "()V");
    let side = square.field_ref("Square", "side", "I");
    square.field(ACC_PUBLIC, "side", "I")
        .method(ACC_PUBLIC, "<init>", "(I)V", 2, 2, &code(&[
            &[ALOAD_0, INVOKESPECIAL], &u2(shape_init),
            &[ALOAD_0, ILOAD_1, PUTFIELD], &u2(side),
            &[RETURN],
        ]))
        .method(ACC_PUBLIC, "area", "()I", 2, 1,
                &code(&[&[ALOAD_0, GETFIELD], &u2(side), &[DUP, IMUL, IRETURN]]));

    let mut main = ClassAssembler::new("Main", Some("java/lang/Object"));
    let class = main.class("Square");
    let init = main.method_ref("Square", "<init>", "(I)V");
    let area = main.method_ref("Shape", "area", "()I");
    let sides = main.method_ref("Shape", "sides", "()I");
    main.method(PUBLIC_STATIC, "main", "()I", 3, 1, &code(&[
        &[NEW], &u2(class),
        &[DUP, BIPUSH, 5, INVOKESPECIAL], &u2(init),
        &[ASTORE_0],
        &[ALOAD_0, INVOKEVIRTUAL], &u2(area),
        &[ALOAD_0, INVOKEVIRTUAL], &u2(sides),
        &[IADD, IRETURN],
    ]));
    vec![shape, square, main]
}

#[test]
fn virtual_dispatch_through_loaded_hierarchy() {
    let classes = shapes();
    let mut runtime = runtime(&classes.iter().collect::<Vec<_>>(), VmOptions::default());
    assert_eq!(runtime.invoke_static("Main", "main", "()I", vec![]).unwrap(),
               Some(Value::Int(29)));
    // Square was loaded on demand by `new`, Shape as its superclass
    assert!(runtime.method_area().contains("Square"));
    assert!(runtime.method_area().contains("Shape"));
    assert!(!runtime.method_area().contains("java/lang/Object"));
}

#[test]
fn static_fields() {
    let mut counter = ClassAssembler::new("Counter", None);
    let total = counter.field_ref("Counter", "total", "J");
    let start = counter.field_ref("Counter", "START", "I");
    counter.field(PUBLIC_STATIC, "total", "J")
        .constant_field("START", 40)
        .method(PUBLIC_STATIC, "bump", "()I", 4, 0, &code(&[
            &[GETSTATIC], &u2(total),
            &[LCONST_1, LADD, PUTSTATIC], &u2(total),
            &[GETSTATIC], &u2(start),
            &[ICONST_2, IADD, IRETURN],
        ]));
    let mut runtime = runtime(&[&counter], VmOptions::default());
    runtime.load_class("Counter").unwrap();
    assert_eq!(runtime.get_static("Counter", "START").unwrap(), Value::Int(40));
    assert_eq!(runtime.get_static("Counter", "total").unwrap(), Value::Long(0));
    for _ in 0..3 {
        assert_eq!(runtime.invoke_static("Counter", "bump", "()I", vec![]).unwrap(),
                   Some(Value::Int(42)));
    }
    assert_eq!(runtime.get_static("Counter", "total").unwrap(), Value::Long(3));
}

#[test]
fn native_methods() {
    let mut main = ClassAssembler::new("Main", None);
    let hash = main.method_ref("Main", "hash", "(J)I");
    main.native_method(PUBLIC_STATIC, "hash", "(J)I")
        .method(PUBLIC_STATIC, "main", "()I", 2, 0,
                &code(&[&[LCONST_1, INVOKESTATIC], &u2(hash), &[IRETURN]]));
    let mut runtime = runtime(&[&main], VmOptions::default());
    runtime.register_native("Main", "hash", "(J)I", |_, args| match args {
        [Value::Long(n)] => Ok(Some(Value::Int((*n as i32) * 31))),
        _ => Err(String::from("bad arguments")),
    });
    assert_eq!(runtime.invoke_static("Main", "main", "()I", vec![]).unwrap(),
               Some(Value::Int(31)));

    runtime.register_native("Main", "hash", "(J)I", |_, _| Err(String::from("unavailable")));
    let fault = fault(runtime.invoke_static("Main", "main", "()I", vec![]));
    assert_eq!(fault.error, ExecutionError::NativeMethod {
        class: String::from("Main"),
        name: String::from("hash"),
        descriptor: String::from("(J)I"),
        message: String::from("unavailable"),
    });
}

#[test]
fn recursion_limit() {
    let mut main = ClassAssembler::new("Main", None);
    let count = main.method_ref("Main", "count", "(I)I");
    // count(n) = n == 0 ? 0 : 1 + count(n - 1)
    main.method(PUBLIC_STATIC, "count", "(I)I", 3, 1, &code(&[
        &[ILOAD_0, IFNE, 0, 5],         // 0
        &[ICONST_0, IRETURN],           // 4
        &[ICONST_1, ILOAD_0, ICONST_1, ISUB, INVOKESTATIC], &u2(count),   // 6
        &[IADD, IRETURN],               // 13
    ]));
    let mut runtime = runtime(&[&main], VmOptions::default().with_max_call_depth(16));
    assert_eq!(runtime.invoke_static("Main", "count", "(I)I", vec![Value::Int(15)]).unwrap(),
               Some(Value::Int(15)));
    let fault = fault(runtime.invoke_static("Main", "count", "(I)I", vec![Value::Int(16)]));
    assert_eq!(fault.error, ExecutionError::CallDepthExceeded { depth: 17 });
}

#[test]
fn wrong_class_name_in_source() {
    common::init_logging();
    let mut source = MemoryClassSource::new();
    source.add("Expected", ClassAssembler::new("Actual", None).assemble());
    let mut runtime = Runtime::new(source, VmOptions::default());
    match runtime.load_class("Expected") {
        Err(Error::NoClassDefFound { expected, found }) => {
            assert_eq!(expected, "Expected");
            assert_eq!(found, "Actual");
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn circular_superclasses() {
    let a = ClassAssembler::new("A", Some("B"));
    let b = ClassAssembler::new("B", Some("A"));
    let mut runtime = runtime(&[&a, &b], VmOptions::default());
    match runtime.load_class("A") {
        Err(Error::ClassCircularity { name }) => assert_eq!(name, "A"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(runtime.method_area().is_empty());
}

#[test]
fn defined_class_finds_its_superclass_in_the_source() {
    let base = ClassAssembler::new("Base", None);
    let mut runtime = runtime(&[&base], VmOptions::default());
    let mut extra = ClassAssembler::new("Extra", Some("Base"));
    extra.method(PUBLIC_STATIC, "four", "()I", 1, 0, &[ICONST_4, IRETURN]);

    let class = runtime.define_class(&extra.assemble()).unwrap();
    assert_eq!(class.superclass.as_ref().map(|c| c.name.as_str()), Some("Base"));
    assert_eq!(runtime.method_area().len(), 2);
    assert_eq!(runtime.invoke_static("Extra", "four", "()I", vec![]).unwrap(), Some(Value::Int(4)));

    // a second definition under the same name keeps the first
    let again = runtime.define_class(&ClassAssembler::new("Extra", None).assemble()).unwrap();
    assert!(again.superclass.is_some());
    assert_eq!(runtime.method_area().len(), 2);
}
