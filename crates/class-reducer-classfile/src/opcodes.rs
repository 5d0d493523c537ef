//! JVM opcodes referenced by the reducer.

pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_0: u8 = 0x03;
pub const ICONST_1: u8 = 0x04;
pub const LCONST_0: u8 = 0x09;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;
pub const ILOAD: u8 = 0x15;
pub const ALOAD: u8 = 0x19;
pub const ALOAD_0: u8 = 0x2a;
pub const ISTORE: u8 = 0x36;
pub const ASTORE: u8 = 0x3a;
pub const POP: u8 = 0x57;
pub const POP2: u8 = 0x58;
pub const DUP: u8 = 0x59;
pub const IINC: u8 = 0x84;
pub const IFEQ: u8 = 0x99;
pub const GOTO: u8 = 0xa7;
pub const JSR: u8 = 0xa8;
pub const RET: u8 = 0xa9;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const IRETURN: u8 = 0xac;
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
pub const CHECKCAST: u8 = 0xc0;
pub const INSTANCEOF: u8 = 0xc1;
pub const WIDE: u8 = 0xc4;
pub const MULTIANEWARRAY: u8 = 0xc5;
pub const IFNULL: u8 = 0xc6;
pub const IFNONNULL: u8 = 0xc7;
pub const GOTO_W: u8 = 0xc8;
pub const JSR_W: u8 = 0xc9;
pub const BREAKPOINT: u8 = 0xca;
pub const IMPDEP1: u8 = 0xfe;
pub const IMPDEP2: u8 = 0xff;

/// Length of every fixed-size instruction, `None` for `tableswitch`,
/// `lookupswitch`, `wide` and unassigned opcodes.
pub fn fixed_length(opcode: u8) -> Option<usize> {
    match opcode {
        0x00..=0x0f => Some(1),
        BIPUSH => Some(2),
        SIPUSH => Some(3),
        LDC => Some(2),
        LDC_W | LDC2_W => Some(3),
        0x15..=0x19 => Some(2),
        0x1a..=0x35 => Some(1),
        0x36..=0x3a => Some(2),
        0x3b..=0x83 => Some(1),
        IINC => Some(3),
        0x85..=0x98 => Some(1),
        0x99..=JSR => Some(3),
        RET => Some(2),
        IRETURN..=RETURN => Some(1),
        GETSTATIC..=INVOKESTATIC => Some(3),
        INVOKEINTERFACE | INVOKEDYNAMIC => Some(5),
        NEW => Some(3),
        NEWARRAY => Some(2),
        ANEWARRAY => Some(3),
        0xbe | 0xbf => Some(1),
        CHECKCAST | INSTANCEOF => Some(3),
        0xc2 | 0xc3 => Some(1),
        MULTIANEWARRAY => Some(4),
        IFNULL | IFNONNULL => Some(3),
        GOTO_W | JSR_W => Some(5),
        BREAKPOINT | IMPDEP1 | IMPDEP2 => Some(1),
        _ => None,
    }
}

pub fn is_invoke(opcode: u8) -> bool {
    matches!(
        opcode,
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE
    )
}
