//! Call-site removal.

use anyhow::Result;
use class_reducer_classfile::opcodes::{is_invoke, INVOKESTATIC};
use class_reducer_classfile::{FieldType, MethodDescriptor};
use tracing::{debug, trace};

use super::{decode, pop_sequence, CLINIT, INIT};
use crate::module::{
    bytecode_from, class_from, Base, ForcibleReducer, MemberKey, Position, ReductionResult,
};

/// Replaces the first not-yet-rejected call to a `void` method with pops of
/// the receiver and arguments.
///
/// Positions are `(method, offset)` pairs. Constructor calls and
/// `invokedynamic` are never touched. A call site whose pops would not fit in
/// the instruction's bytes is skipped.
pub struct RemoveVoidMethodCalls;

impl ForcibleReducer for RemoveVoidMethodCalls {
    fn apply(&self, base: &Base<'_>) -> Result<ReductionResult> {
        let mut class = class_from(base.bytecode())?;
        for index in 0..class.methods.len() {
            let Some(mut code) = class.code(index)? else {
                continue;
            };
            let method = MemberKey::method(&class, index)?;
            for insn in decode(&code)? {
                if !is_invoke(insn.opcode) {
                    continue;
                }
                let target = class
                    .constant_pool
                    .member_ref(insn.u16_operand(&code.code)?)?;
                if target.name == INIT || target.name == CLINIT {
                    continue;
                }
                let descriptor = MethodDescriptor::parse(&target.descriptor)?;
                if !descriptor.is_void() {
                    continue;
                }
                let position = Position::Instruction {
                    method: method.clone(),
                    offset: insn.offset,
                };
                if base.is_rejected(&position) {
                    continue;
                }

                let mut values = Vec::with_capacity(descriptor.params.len() + 1);
                if insn.opcode != INVOKESTATIC {
                    values.push(false);
                }
                values.extend(descriptor.params.iter().map(FieldType::is_wide));
                let Some(pops) = pop_sequence(&values, insn.length) else {
                    trace!(%position, "too many operands to discard in place");
                    continue;
                };

                debug!(
                    "Removing call of method '{}.{}' at {}",
                    target.class_name, target.name, position
                );
                code.code[insn.offset..insn.offset + insn.length].copy_from_slice(&pops);
                class.set_code(index, &code)?;
                return Ok(base.to_result(bytecode_from(&class), position));
            }
        }
        Ok(base.to_minimal_result())
    }
}
