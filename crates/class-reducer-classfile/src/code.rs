//! The `Code` attribute and a linear instruction walker over method bodies.

use crate::class_file::{parse_attributes, write_attributes, Attribute};
use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::opcodes::{self, fixed_length};
use crate::reader::{put_u16, put_u32, read_i32_at, read_u16_at, ByteReader};

/// One entry of a method's exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Decoded `Code` attribute body. Nested attributes stay raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl CodeAttribute {
    /// Decode from the attribute's `info` bytes.
    pub fn parse(info: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(info);
        let max_stack = r.u16()?;
        let max_locals = r.u16()?;
        let code_len = r.u32()? as usize;
        let code = r.take(code_len)?.to_vec();

        let handler_count = r.u16()?;
        let mut exception_table = Vec::with_capacity(handler_count as usize);
        for _ in 0..handler_count {
            exception_table.push(ExceptionHandler {
                start_pc: r.u16()?,
                end_pc: r.u16()?,
                handler_pc: r.u16()?,
                catch_type: r.u16()?,
            });
        }

        let attributes = parse_attributes(&mut r)?;
        if r.remaining() != 0 {
            return Err(ClassFileError::MalformedCode(format!(
                "{} unexpected bytes after nested attributes",
                r.remaining()
            )));
        }

        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    /// Encode back into attribute `info` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.code.len() + 12);
        put_u16(&mut out, self.max_stack);
        put_u16(&mut out, self.max_locals);
        put_u32(&mut out, self.code.len() as u32);
        out.extend_from_slice(&self.code);
        put_u16(&mut out, self.exception_table.len() as u16);
        for h in &self.exception_table {
            put_u16(&mut out, h.start_pc);
            put_u16(&mut out, h.end_pc);
            put_u16(&mut out, h.handler_pc);
            put_u16(&mut out, h.catch_type);
        }
        write_attributes(&mut out, &self.attributes);
        out
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.code)
    }

    /// Drop every nested attribute whose name is in `names`; returns how many
    /// were removed.
    pub fn remove_attributes(&mut self, pool: &ConstantPool, names: &[&str]) -> usize {
        let before = self.attributes.len();
        self.attributes
            .retain(|a| !pool.utf8(a.name_index).is_ok_and(|n| names.contains(&n.as_str())));
        before - self.attributes.len()
    }
}

/// A decoded instruction header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: u8,
    pub length: usize,
}

impl Instruction {
    /// The `u16` operand following the opcode (constant pool index for field
    /// and invoke instructions).
    pub fn u16_operand(&self, code: &[u8]) -> Result<u16> {
        read_u16_at(code, self.offset + 1)
    }
}

/// Length in bytes of the instruction starting at `offset`.
pub fn instruction_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = *code.get(offset).ok_or(ClassFileError::UnexpectedEof {
        offset,
        needed: 1,
    })?;

    let length = match opcode {
        opcodes::TABLESWITCH => {
            let pad = (4 - (offset + 1) % 4) % 4;
            let base = offset + 1 + pad;
            let low = read_i32_at(code, base + 4)?;
            let high = read_i32_at(code, base + 8)?;
            if high < low {
                return Err(ClassFileError::MalformedCode(format!(
                    "tableswitch at {offset} has high {high} < low {low}"
                )));
            }
            let entries = (high as i64 - low as i64 + 1) as usize;
            1 + pad + 12 + entries * 4
        }
        opcodes::LOOKUPSWITCH => {
            let pad = (4 - (offset + 1) % 4) % 4;
            let base = offset + 1 + pad;
            let pairs = read_i32_at(code, base + 4)?;
            if pairs < 0 {
                return Err(ClassFileError::MalformedCode(format!(
                    "lookupswitch at {offset} has negative pair count"
                )));
            }
            1 + pad + 8 + pairs as usize * 8
        }
        opcodes::WIDE => {
            let modified = *code.get(offset + 1).ok_or(ClassFileError::UnexpectedEof {
                offset: offset + 1,
                needed: 1,
            })?;
            match modified {
                opcodes::IINC => 6,
                0x15..=0x19 | 0x36..=0x3a | opcodes::RET => 4,
                _ => {
                    return Err(ClassFileError::MalformedCode(format!(
                        "wide applied to opcode {modified:#04x} at {offset}"
                    )))
                }
            }
        }
        _ => fixed_length(opcode).ok_or(ClassFileError::UnknownOpcode { opcode, offset })?,
    };

    if offset + length > code.len() {
        return Err(ClassFileError::MalformedCode(format!(
            "instruction at {offset} runs past end of code ({} bytes)",
            code.len()
        )));
    }
    Ok(length)
}

/// Iterator over the instructions of a code array. Stops after the first
/// decoding error.
pub struct Instructions<'a> {
    code: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            pos: 0,
            failed: false,
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.code.len() {
            return None;
        }
        match instruction_length(self.code, self.pos) {
            Ok(length) => {
                let insn = Instruction {
                    offset: self.pos,
                    opcode: self.code[self.pos],
                    length,
                };
                self.pos += length;
                Some(Ok(insn))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
