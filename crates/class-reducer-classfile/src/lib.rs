//! Lossless JVM class-file model used by the reducer.
//!
//! The model decodes only what transformations need (constant pool, members,
//! `Code` bodies) and keeps every other attribute as raw bytes, so
//! `ClassFile::parse(b)?.to_bytes() == b` for well-formed input.
//!
//! - [`ClassFile`]: parse / serialize, member and attribute accessors
//! - [`ConstantPool`]: typed entries, symbolic reference resolution, interning
//! - [`CodeAttribute`] and [`Instructions`]: method bodies and instruction walking
//! - [`MethodDescriptor`] / [`FieldType`]: descriptor parsing
//! - [`ClassBuilder`]: assembling small classes for fixtures

pub mod builder;
pub mod class_file;
pub mod code;
pub mod constant_pool;
pub mod descriptor;
pub mod error;
pub mod opcodes;
pub mod reader;

pub use builder::{insn, ClassBuilder};
pub use class_file::{Attribute, ClassFile, MemberInfo};
pub use code::{instruction_length, CodeAttribute, ExceptionHandler, Instruction, Instructions};
pub use constant_pool::{Constant, ConstantPool, MemberRef, RefKind};
pub use descriptor::{FieldType, MethodDescriptor};
pub use error::ClassFileError;
