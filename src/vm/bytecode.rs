//! Opcodes of the instruction set (JVMS §6.5), with their mnemonics for tracing.

pub mod opcode {
    pub const NOP: u8 = 0x00;
    pub const ACONST_NULL: u8 = 0x01;
    pub const ICONST_M1: u8 = 0x02;
    pub const ICONST_0: u8 = 0x03;
    pub const ICONST_1: u8 = 0x04;
    pub const ICONST_2: u8 = 0x05;
    pub const ICONST_3: u8 = 0x06;
    pub const ICONST_4: u8 = 0x07;
    pub const ICONST_5: u8 = 0x08;
    pub const LCONST_0: u8 = 0x09;
    pub const LCONST_1: u8 = 0x0a;
    pub const FCONST_0: u8 = 0x0b;
    pub const FCONST_1: u8 = 0x0c;
    pub const FCONST_2: u8 = 0x0d;
    pub const DCONST_0: u8 = 0x0e;
    pub const DCONST_1: u8 = 0x0f;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD: u8 = 0x15;
    pub const LLOAD: u8 = 0x16;
    pub const FLOAD: u8 = 0x17;
    pub const DLOAD: u8 = 0x18;
    pub const ALOAD: u8 = 0x19;
    pub const ILOAD_0: u8 = 0x1a;
    pub const ILOAD_1: u8 = 0x1b;
    pub const ILOAD_2: u8 = 0x1c;
    pub const ILOAD_3: u8 = 0x1d;
    pub const LLOAD_0: u8 = 0x1e;
    pub const LLOAD_1: u8 = 0x1f;
    pub const LLOAD_2: u8 = 0x20;
    pub const LLOAD_3: u8 = 0x21;
    pub const FLOAD_0: u8 = 0x22;
    pub const FLOAD_1: u8 = 0x23;
    pub const FLOAD_2: u8 = 0x24;
    pub const FLOAD_3: u8 = 0x25;
    pub const DLOAD_0: u8 = 0x26;
    pub const DLOAD_1: u8 = 0x27;
    pub const DLOAD_2: u8 = 0x28;
    pub const DLOAD_3: u8 = 0x29;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ALOAD_1: u8 = 0x2b;
    pub const ALOAD_2: u8 = 0x2c;
    pub const ALOAD_3: u8 = 0x2d;
    pub const IALOAD: u8 = 0x2e;
    pub const LALOAD: u8 = 0x2f;
    pub const FALOAD: u8 = 0x30;
    pub const DALOAD: u8 = 0x31;
    pub const AALOAD: u8 = 0x32;
    pub const BALOAD: u8 = 0x33;
    pub const CALOAD: u8 = 0x34;
    pub const SALOAD: u8 = 0x35;
    pub const ISTORE: u8 = 0x36;
    pub const LSTORE: u8 = 0x37;
    pub const FSTORE: u8 = 0x38;
    pub const DSTORE: u8 = 0x39;
    pub const ASTORE: u8 = 0x3a;
    pub const ISTORE_0: u8 = 0x3b;
    pub const ISTORE_1: u8 = 0x3c;
    pub const ISTORE_2: u8 = 0x3d;
    pub const ISTORE_3: u8 = 0x3e;
    pub const LSTORE_0: u8 = 0x3f;
    pub const LSTORE_1: u8 = 0x40;
    pub const LSTORE_2: u8 = 0x41;
    pub const LSTORE_3: u8 = 0x42;
    pub const FSTORE_0: u8 = 0x43;
    pub const FSTORE_1: u8 = 0x44;
    pub const FSTORE_2: u8 = 0x45;
    pub const FSTORE_3: u8 = 0x46;
    pub const DSTORE_0: u8 = 0x47;
    pub const DSTORE_1: u8 = 0x48;
    pub const DSTORE_2: u8 = 0x49;
    pub const DSTORE_3: u8 = 0x4a;
    pub const ASTORE_0: u8 = 0x4b;
    pub const ASTORE_1: u8 = 0x4c;
    pub const ASTORE_2: u8 = 0x4d;
    pub const ASTORE_3: u8 = 0x4e;
    pub const IASTORE: u8 = 0x4f;
    pub const LASTORE: u8 = 0x50;
    pub const FASTORE: u8 = 0x51;
    pub const DASTORE: u8 = 0x52;
    pub const AASTORE: u8 = 0x53;
    pub const BASTORE: u8 = 0x54;
    pub const CASTORE: u8 = 0x55;
    pub const SASTORE: u8 = 0x56;
    pub const POP: u8 = 0x57;
    pub const POP2: u8 = 0x58;
    pub const DUP: u8 = 0x59;
    pub const DUP_X1: u8 = 0x5a;
    pub const DUP_X2: u8 = 0x5b;
    pub const DUP2: u8 = 0x5c;
    pub const DUP2_X1: u8 = 0x5d;
    pub const DUP2_X2: u8 = 0x5e;
    pub const SWAP: u8 = 0x5f;
    pub const IADD: u8 = 0x60;
    pub const LADD: u8 = 0x61;
    pub const FADD: u8 = 0x62;
    pub const DADD: u8 = 0x63;
    pub const ISUB: u8 = 0x64;
    pub const LSUB: u8 = 0x65;
    pub const FSUB: u8 = 0x66;
    pub const DSUB: u8 = 0x67;
    pub const IMUL: u8 = 0x68;
    pub const LMUL: u8 = 0x69;
    pub const FMUL: u8 = 0x6a;
    pub const DMUL: u8 = 0x6b;
    pub const IDIV: u8 = 0x6c;
    pub const LDIV: u8 = 0x6d;
    pub const FDIV: u8 = 0x6e;
    pub const DDIV: u8 = 0x6f;
    pub const IREM: u8 = 0x70;
    pub const LREM: u8 = 0x71;
    pub const FREM: u8 = 0x72;
    pub const DREM: u8 = 0x73;
    pub const INEG: u8 = 0x74;
    pub const LNEG: u8 = 0x75;
    pub const FNEG: u8 = 0x76;
    pub const DNEG: u8 = 0x77;
    pub const ISHL: u8 = 0x78;
    pub const LSHL: u8 = 0x79;
    pub const ISHR: u8 = 0x7a;
    pub const LSHR: u8 = 0x7b;
    pub const IUSHR: u8 = 0x7c;
    pub const LUSHR: u8 = 0x7d;
    pub const IAND: u8 = 0x7e;
    pub const LAND: u8 = 0x7f;
    pub const IOR: u8 = 0x80;
    pub const LOR: u8 = 0x81;
    pub const IXOR: u8 = 0x82;
    pub const LXOR: u8 = 0x83;
    pub const IINC: u8 = 0x84;
    pub const I2L: u8 = 0x85;
    pub const I2F: u8 = 0x86;
    pub const I2D: u8 = 0x87;
    pub const L2I: u8 = 0x88;
    pub const L2F: u8 = 0x89;
    pub const L2D: u8 = 0x8a;
    pub const F2I: u8 = 0x8b;
    pub const F2L: u8 = 0x8c;
    pub const F2D: u8 = 0x8d;
    pub const D2I: u8 = 0x8e;
    pub const D2L: u8 = 0x8f;
    pub const D2F: u8 = 0x90;
    pub const I2B: u8 = 0x91;
    pub const I2C: u8 = 0x92;
    pub const I2S: u8 = 0x93;
    pub const LCMP: u8 = 0x94;
    pub const FCMPL: u8 = 0x95;
    pub const FCMPG: u8 = 0x96;
    pub const DCMPL: u8 = 0x97;
    pub const DCMPG: u8 = 0x98;
    pub const IFEQ: u8 = 0x99;
    pub const IFNE: u8 = 0x9a;
    pub const IFLT: u8 = 0x9b;
    pub const IFGE: u8 = 0x9c;
    pub const IFGT: u8 = 0x9d;
    pub const IFLE: u8 = 0x9e;
    pub const IF_ICMPEQ: u8 = 0x9f;
    pub const IF_ICMPNE: u8 = 0xa0;
    pub const IF_ICMPLT: u8 = 0xa1;
    pub const IF_ICMPGE: u8 = 0xa2;
    pub const IF_ICMPGT: u8 = 0xa3;
    pub const IF_ICMPLE: u8 = 0xa4;
    pub const IF_ACMPEQ: u8 = 0xa5;
    pub const IF_ACMPNE: u8 = 0xa6;
    pub const GOTO: u8 = 0xa7;
    pub const JSR: u8 = 0xa8;
    pub const RET: u8 = 0xa9;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const IRETURN: u8 = 0xac;
    pub const LRETURN: u8 = 0xad;
    pub const FRETURN: u8 = 0xae;
    pub const DRETURN: u8 = 0xaf;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const NEWARRAY: u8 = 0xbc;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const ARRAYLENGTH: u8 = 0xbe;
    pub const ATHROW: u8 = 0xbf;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const MONITORENTER: u8 = 0xc2;
    pub const MONITOREXIT: u8 = 0xc3;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
    pub const IFNULL: u8 = 0xc6;
    pub const IFNONNULL: u8 = 0xc7;
    pub const GOTO_W: u8 = 0xc8;
    pub const JSR_W: u8 = 0xc9;
    pub const BREAKPOINT: u8 = 0xca;
    pub const IMPDEP1: u8 = 0xfe;
    pub const IMPDEP2: u8 = 0xff;
}

/// The mnemonic of an opcode, e.g. `"iadd"`. Unassigned opcodes are `"???"`.
pub fn mnemonic(op: u8) -> &'static str {
    match op {
        opcode::NOP => "nop",
        opcode::ACONST_NULL => "aconst_null",
        opcode::ICONST_M1 => "iconst_m1",
        opcode::ICONST_0 => "iconst_0",
        opcode::ICONST_1 => "iconst_1",
        opcode::ICONST_2 => "iconst_2",
        opcode::ICONST_3 => "iconst_3",
        opcode::ICONST_4 => "iconst_4",
        opcode::ICONST_5 => "iconst_5",
        opcode::LCONST_0 => "lconst_0",
        opcode::LCONST_1 => "lconst_1",
        opcode::FCONST_0 => "fconst_0",
        opcode::FCONST_1 => "fconst_1",
        opcode::FCONST_2 => "fconst_2",
        opcode::DCONST_0 => "dconst_0",
        opcode::DCONST_1 => "dconst_1",
        opcode::BIPUSH => "bipush",
        opcode::SIPUSH => "sipush",
        opcode::LDC => "ldc",
        opcode::LDC_W => "ldc_w",
        opcode::LDC2_W => "ldc2_w",
        opcode::ILOAD => "iload",
        opcode::LLOAD => "lload",
        opcode::FLOAD => "fload",
        opcode::DLOAD => "dload",
        opcode::ALOAD => "aload",
        opcode::ILOAD_0 => "iload_0",
        opcode::ILOAD_1 => "iload_1",
        opcode::ILOAD_2 => "iload_2",
        opcode::ILOAD_3 => "iload_3",
        opcode::LLOAD_0 => "lload_0",
        opcode::LLOAD_1 => "lload_1",
        opcode::LLOAD_2 => "lload_2",
        opcode::LLOAD_3 => "lload_3",
        opcode::FLOAD_0 => "fload_0",
        opcode::FLOAD_1 => "fload_1",
        opcode::FLOAD_2 => "fload_2",
        opcode::FLOAD_3 => "fload_3",
        opcode::DLOAD_0 => "dload_0",
        opcode::DLOAD_1 => "dload_1",
        opcode::DLOAD_2 => "dload_2",
        opcode::DLOAD_3 => "dload_3",
        opcode::ALOAD_0 => "aload_0",
        opcode::ALOAD_1 => "aload_1",
        opcode::ALOAD_2 => "aload_2",
        opcode::ALOAD_3 => "aload_3",
        opcode::IALOAD => "iaload",
        opcode::LALOAD => "laload",
        opcode::FALOAD => "faload",
        opcode::DALOAD => "daload",
        opcode::AALOAD => "aaload",
        opcode::BALOAD => "baload",
        opcode::CALOAD => "caload",
        opcode::SALOAD => "saload",
        opcode::ISTORE => "istore",
        opcode::LSTORE => "lstore",
        opcode::FSTORE => "fstore",
        opcode::DSTORE => "dstore",
        opcode::ASTORE => "astore",
        opcode::ISTORE_0 => "istore_0",
        opcode::ISTORE_1 => "istore_1",
        opcode::ISTORE_2 => "istore_2",
        opcode::ISTORE_3 => "istore_3",
        opcode::LSTORE_0 => "lstore_0",
        opcode::LSTORE_1 => "lstore_1",
        opcode::LSTORE_2 => "lstore_2",
        opcode::LSTORE_3 => "lstore_3",
        opcode::FSTORE_0 => "fstore_0",
        opcode::FSTORE_1 => "fstore_1",
        opcode::FSTORE_2 => "fstore_2",
        opcode::FSTORE_3 => "fstore_3",
        opcode::DSTORE_0 => "dstore_0",
        opcode::DSTORE_1 => "dstore_1",
        opcode::DSTORE_2 => "dstore_2",
        opcode::DSTORE_3 => "dstore_3",
        opcode::ASTORE_0 => "astore_0",
        opcode::ASTORE_1 => "astore_1",
        opcode::ASTORE_2 => "astore_2",
        opcode::ASTORE_3 => "astore_3",
        opcode::IASTORE => "iastore",
        opcode::LASTORE => "lastore",
        opcode::FASTORE => "fastore",
        opcode::DASTORE => "dastore",
        opcode::AASTORE => "aastore",
        opcode::BASTORE => "bastore",
        opcode::CASTORE => "castore",
        opcode::SASTORE => "sastore",
        opcode::POP => "pop",
        opcode::POP2 => "pop2",
        opcode::DUP => "dup",
        opcode::DUP_X1 => "dup_x1",
        opcode::DUP_X2 => "dup_x2",
        opcode::DUP2 => "dup2",
        opcode::DUP2_X1 => "dup2_x1",
        opcode::DUP2_X2 => "dup2_x2",
        opcode::SWAP => "swap",
        opcode::IADD => "iadd",
        opcode::LADD => "ladd",
        opcode::FADD => "fadd",
        opcode::DADD => "dadd",
        opcode::ISUB => "isub",
        opcode::LSUB => "lsub",
        opcode::FSUB => "fsub",
        opcode::DSUB => "dsub",
        opcode::IMUL => "imul",
        opcode::LMUL => "lmul",
        opcode::FMUL => "fmul",
        opcode::DMUL => "dmul",
        opcode::IDIV => "idiv",
        opcode::LDIV => "ldiv",
        opcode::FDIV => "fdiv",
        opcode::DDIV => "ddiv",
        opcode::IREM => "irem",
        opcode::LREM => "lrem",
        opcode::FREM => "frem",
        opcode::DREM => "drem",
        opcode::INEG => "ineg",
        opcode::LNEG => "lneg",
        opcode::FNEG => "fneg",
        opcode::DNEG => "dneg",
        opcode::ISHL => "ishl",
        opcode::LSHL => "lshl",
        opcode::ISHR => "ishr",
        opcode::LSHR => "lshr",
        opcode::IUSHR => "iushr",
        opcode::LUSHR => "lushr",
        opcode::IAND => "iand",
        opcode::LAND => "land",
        opcode::IOR => "ior",
        opcode::LOR => "lor",
        opcode::IXOR => "ixor",
        opcode::LXOR => "lxor",
        opcode::IINC => "iinc",
        opcode::I2L => "i2l",
        opcode::I2F => "i2f",
        opcode::I2D => "i2d",
        opcode::L2I => "l2i",
        opcode::L2F => "l2f",
        opcode::L2D => "l2d",
        opcode::F2I => "f2i",
        opcode::F2L => "f2l",
        opcode::F2D => "f2d",
        opcode::D2I => "d2i",
        opcode::D2L => "d2l",
        opcode::D2F => "d2f",
        opcode::I2B => "i2b",
        opcode::I2C => "i2c",
        opcode::I2S => "i2s",
        opcode::LCMP => "lcmp",
        opcode::FCMPL => "fcmpl",
        opcode::FCMPG => "fcmpg",
        opcode::DCMPL => "dcmpl",
        opcode::DCMPG => "dcmpg",
        opcode::IFEQ => "ifeq",
        opcode::IFNE => "ifne",
        opcode::IFLT => "iflt",
        opcode::IFGE => "ifge",
        opcode::IFGT => "ifgt",
        opcode::IFLE => "ifle",
        opcode::IF_ICMPEQ => "if_icmpeq",
        opcode::IF_ICMPNE => "if_icmpne",
        opcode::IF_ICMPLT => "if_icmplt",
        opcode::IF_ICMPGE => "if_icmpge",
        opcode::IF_ICMPGT => "if_icmpgt",
        opcode::IF_ICMPLE => "if_icmple",
        opcode::IF_ACMPEQ => "if_acmpeq",
        opcode::IF_ACMPNE => "if_acmpne",
        opcode::GOTO => "goto",
        opcode::JSR => "jsr",
        opcode::RET => "ret",
        opcode::TABLESWITCH => "tableswitch",
        opcode::LOOKUPSWITCH => "lookupswitch",
        opcode::IRETURN => "ireturn",
        opcode::LRETURN => "lreturn",
        opcode::FRETURN => "freturn",
        opcode::DRETURN => "dreturn",
        opcode::ARETURN => "areturn",
        opcode::RETURN => "return",
        opcode::GETSTATIC => "getstatic",
        opcode::PUTSTATIC => "putstatic",
        opcode::GETFIELD => "getfield",
        opcode::PUTFIELD => "putfield",
        opcode::INVOKEVIRTUAL => "invokevirtual",
        opcode::INVOKESPECIAL => "invokespecial",
        opcode::INVOKESTATIC => "invokestatic",
        opcode::INVOKEINTERFACE => "invokeinterface",
        opcode::INVOKEDYNAMIC => "invokedynamic",
        opcode::NEW => "new",
        opcode::NEWARRAY => "newarray",
        opcode::ANEWARRAY => "anewarray",
        opcode::ARRAYLENGTH => "arraylength",
        opcode::ATHROW => "athrow",
        opcode::CHECKCAST => "checkcast",
        opcode::INSTANCEOF => "instanceof",
        opcode::MONITORENTER => "monitorenter",
        opcode::MONITOREXIT => "monitorexit",
        opcode::WIDE => "wide",
        opcode::MULTIANEWARRAY => "multianewarray",
        opcode::IFNULL => "ifnull",
        opcode::IFNONNULL => "ifnonnull",
        opcode::GOTO_W => "goto_w",
        opcode::JSR_W => "jsr_w",
        opcode::BREAKPOINT => "breakpoint",
        opcode::IMPDEP1 => "impdep1",
        opcode::IMPDEP2 => "impdep2",
        _ => "???",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mnemonics() {
        assert_eq!(mnemonic(opcode::IADD), "iadd");
        assert_eq!(mnemonic(opcode::IF_ICMPEQ), "if_icmpeq");
        assert_eq!(mnemonic(0xcb), "???");
    }
}
