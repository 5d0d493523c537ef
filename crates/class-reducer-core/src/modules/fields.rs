//! Field-level reductions.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use class_reducer_classfile::class_file::ACC_STATIC;
use class_reducer_classfile::opcodes::{GETFIELD, GETSTATIC, PUTFIELD, PUTSTATIC};
use class_reducer_classfile::{ClassFile, Constant, FieldType};
use tracing::{debug, trace};

use super::{decode, ensure_member, method_bodies, pop_sequence};
use crate::module::{Member, MemberKey, MemberReducer};

/// Removes fields of this class that no instruction reads, turning every
/// store into the field into pops of the stored operands.
pub struct RemoveWriteOnlyFields;

impl MemberReducer for RemoveWriteOnlyFields {
    fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>> {
        let owner = class.this_class_name()?;
        let reads = read_fields(class, &owner)?;
        let mut members = Vec::new();
        for index in 0..class.fields.len() {
            let key = MemberKey::field(class, index)?;
            if !reads.contains(&(key.name.clone(), key.descriptor.clone())) {
                members.push(Member { key, index });
            }
        }
        Ok(members)
    }

    fn process(&self, mut class: ClassFile, member: &Member) -> Result<ClassFile> {
        ensure_member(&MemberKey::field(&class, member.index)?, &member.key)?;
        let owner = class.this_class_name()?;
        let wide = FieldType::parse(&member.key.descriptor)?.is_wide();
        debug!("Removing write-only field '{}'", member.key);
        class.fields.remove(member.index);

        for (index, mut code) in method_bodies(&class)? {
            let mut rewritten = 0usize;
            for insn in decode(&code)? {
                let values = match insn.opcode {
                    PUTSTATIC => vec![wide],
                    PUTFIELD => vec![false, wide],
                    _ => continue,
                };
                let target = class
                    .constant_pool
                    .member_ref(insn.u16_operand(&code.code)?)?;
                if target.class_name != owner
                    || target.name != member.key.name
                    || target.descriptor != member.key.descriptor
                {
                    continue;
                }
                let pops = pop_sequence(&values, insn.length)
                    .ok_or_else(|| anyhow!("store at {} cannot be replaced", insn.offset))?;
                code.code[insn.offset..insn.offset + insn.length].copy_from_slice(&pops);
                rewritten += 1;
            }
            if rewritten > 0 {
                trace!(field = %member.key, method = index, rewritten, "discarded stores");
                class.set_code(index, &code)?;
            }
        }
        Ok(class)
    }
}

/// Fields of `owner` that are read by `getfield`/`getstatic` or referenced by
/// a method handle anywhere in the class.
fn read_fields(class: &ClassFile, owner: &str) -> Result<HashSet<(String, String)>> {
    let mut reads = HashSet::new();
    for (_, code) in method_bodies(class)? {
        for insn in decode(&code)? {
            if insn.opcode != GETFIELD && insn.opcode != GETSTATIC {
                continue;
            }
            let target = class
                .constant_pool
                .member_ref(insn.u16_operand(&code.code)?)?;
            if target.class_name == owner {
                reads.insert((target.name, target.descriptor));
            }
        }
    }
    for (_, constant) in class.constant_pool.iter() {
        // Reference kinds 1..=4 are getField, getStatic, putField, putStatic.
        if let Constant::MethodHandle {
            reference_kind: 1..=4,
            reference_index,
        } = constant
        {
            let target = class.constant_pool.member_ref(*reference_index)?;
            if target.class_name == owner {
                reads.insert((target.name, target.descriptor));
            }
        }
    }
    Ok(reads)
}

/// Clears `ACC_STATIC` on static fields of non-interface classes.
pub struct RemoveStaticAttributes;

impl MemberReducer for RemoveStaticAttributes {
    fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>> {
        if class.is_interface() {
            return Ok(Vec::new());
        }
        let mut members = Vec::new();
        for (index, field) in class.fields.iter().enumerate() {
            if field.has_flag(ACC_STATIC) {
                members.push(Member {
                    key: MemberKey::field(class, index)?,
                    index,
                });
            }
        }
        Ok(members)
    }

    fn process(&self, mut class: ClassFile, member: &Member) -> Result<ClassFile> {
        ensure_member(&MemberKey::field(&class, member.index)?, &member.key)?;
        debug!("Removing static attribute of field '{}'", member.key);
        class.fields[member.index].access_flags &= !ACC_STATIC;
        Ok(class)
    }
}
