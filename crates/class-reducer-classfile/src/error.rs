//! Error type for class-file decoding and manipulation.

use thiserror::Error;

/// Everything that can go wrong while reading or rewriting a class file.
///
/// Variants are kept distinct so callers can tell a truncated buffer from a
/// structurally invalid one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("unexpected end of input at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("bad magic number {0:#010x} (expected 0xcafebabe)")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool index {0} is out of range or unusable")]
    BadConstantIndex(u16),

    #[error("constant #{index} is not a {expected}")]
    UnexpectedConstant { index: u16, expected: &'static str },

    #[error("{0} trailing bytes after end of class file")]
    TrailingBytes(usize),

    #[error("invalid modified UTF-8 in constant #{0}")]
    InvalidUtf8(u16),

    #[error("malformed code attribute: {0}")]
    MalformedCode(String),

    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("malformed descriptor '{0}'")]
    BadDescriptor(String),

    #[error("{what} index {index} out of range")]
    MemberOutOfRange { what: &'static str, index: usize },
}

pub type Result<T> = std::result::Result<T, ClassFileError>;
