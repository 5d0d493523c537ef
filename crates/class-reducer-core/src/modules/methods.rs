//! Method-level reductions.

use std::collections::HashSet;

use anyhow::Result;
use class_reducer_classfile::class_file::{ACC_ABSTRACT, ACC_NATIVE, ACC_PRIVATE};
use class_reducer_classfile::opcodes::RETURN;
use class_reducer_classfile::{ClassFile, Constant};

use tracing::debug;

use super::{ensure_member, is_main, CLINIT, INIT};
use crate::module::{Member, MemberKey, MemberReducer};

/// Removes methods whose body is a single `return`, and abstract methods.
/// Constructors and static initializers are kept.
pub struct RemoveEmptyMethods;

impl MemberReducer for RemoveEmptyMethods {
    fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        for index in 0..class.methods.len() {
            let key = MemberKey::method(class, index)?;
            if key.name == INIT || key.name == CLINIT {
                continue;
            }
            let empty = match class.code(index)? {
                Some(code) => code.code == [RETURN],
                None => class.methods[index].has_flag(ACC_ABSTRACT),
            };
            if empty {
                members.push(Member { key, index });
            }
        }
        Ok(members)
    }

    fn process(&self, mut class: ClassFile, member: &Member) -> Result<ClassFile> {
        ensure_member(&MemberKey::method(&class, member.index)?, &member.key)?;
        debug!("Removing empty method '{}'", member.key);
        class.methods.remove(member.index);
        Ok(class)
    }
}

/// Removes private methods that no method reference of this class points to.
pub struct RemoveUnusedPrivateMethods;

impl MemberReducer for RemoveUnusedPrivateMethods {
    fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>> {
        let referenced = referenced_methods(class)?;
        let mut members = Vec::new();
        for (index, method) in class.methods.iter().enumerate() {
            if !method.has_flag(ACC_PRIVATE) {
                continue;
            }
            let key = MemberKey::method(class, index)?;
            if key.name == INIT || key.name == CLINIT {
                continue;
            }
            if !referenced.contains(&(key.name.clone(), key.descriptor.clone())) {
                members.push(Member { key, index });
            }
        }
        Ok(members)
    }

    fn process(&self, mut class: ClassFile, member: &Member) -> Result<ClassFile> {
        ensure_member(&MemberKey::method(&class, member.index)?, &member.key)?;
        debug!("Removing unused private method '{}'", member.key);
        class.methods.remove(member.index);
        Ok(class)
    }
}

fn referenced_methods(class: &ClassFile) -> Result<HashSet<(String, String)>> {
    let owner = class.this_class_name()?;
    let mut referenced = HashSet::new();
    for (index, constant) in class.constant_pool.iter() {
        if !matches!(
            constant,
            Constant::Methodref { .. } | Constant::InterfaceMethodref { .. }
        ) {
            continue;
        }
        let target = class.constant_pool.member_ref(index)?;
        if target.class_name == owner {
            referenced.insert((target.name, target.descriptor));
        }
    }
    Ok(referenced)
}

/// Resets the access flags of concrete methods to none. Skips interfaces,
/// constructors, static initializers and `main`.
pub struct RemoveAllMethodAttributes;

impl MemberReducer for RemoveAllMethodAttributes {
    fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>> {
        if class.is_interface() {
            return Ok(Vec::new());
        }
        let mut members = Vec::new();
        for (index, method) in class.methods.iter().enumerate() {
            if method.access_flags == 0 || method.has_flag(ACC_ABSTRACT | ACC_NATIVE) {
                continue;
            }
            let key = MemberKey::method(class, index)?;
            if key.name == INIT || key.name == CLINIT || is_main(&key) {
                continue;
            }
            if class.code(index)?.is_none() {
                continue;
            }
            members.push(Member { key, index });
        }
        Ok(members)
    }

    fn process(&self, mut class: ClassFile, member: &Member) -> Result<ClassFile> {
        ensure_member(&MemberKey::method(&class, member.index)?, &member.key)?;
        debug!(
            "Removing access flags {:#06x} of method '{}'",
            class.methods[member.index].access_flags, member.key
        );
        class.methods[member.index].access_flags = 0;
        Ok(class)
    }
}
