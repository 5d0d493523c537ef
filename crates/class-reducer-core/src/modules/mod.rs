//! Built-in reduction modules and the helpers they share.

use anyhow::{ensure, Result};
use class_reducer_classfile::opcodes::{NOP, POP, POP2};
use class_reducer_classfile::{ClassFile, CodeAttribute, Instruction};

use crate::module::{Cost, MemberKey, ModuleEntry, ReductionModule, Soundness};

pub mod attributes;
pub mod calls;
pub mod fields;
pub mod methods;

pub use attributes::StripDebugAttributes;
pub use calls::RemoveVoidMethodCalls;
pub use fields::{RemoveStaticAttributes, RemoveWriteOnlyFields};
pub use methods::{RemoveAllMethodAttributes, RemoveEmptyMethods, RemoveUnusedPrivateMethods};

pub(crate) const INIT: &str = "<init>";
pub(crate) const CLINIT: &str = "<clinit>";

/// Static description of a built-in module.
#[derive(Debug, Clone, Copy)]
pub struct ModuleSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub soundness: Soundness,
    pub cost: Cost,
    build: fn() -> ReductionModule,
}

impl ModuleSpec {
    pub fn instantiate(&self) -> ModuleEntry {
        ModuleEntry {
            id: self.id,
            description: self.description,
            soundness: self.soundness,
            cost: self.cost,
            module: (self.build)(),
        }
    }
}

/// Every built-in module, in registration order.
pub const CATALOG: &[ModuleSpec] = &[
    ModuleSpec {
        id: "StripDebugAttributes",
        description: "Drop source-file, line-number and local-variable debug attributes",
        soundness: Soundness::Sound,
        cost: Cost::Normal,
        build: || ReductionModule::Whole(Box::new(StripDebugAttributes)),
    },
    ModuleSpec {
        id: "RemoveEmptyMethods",
        description: "Remove methods whose body is a bare return",
        soundness: Soundness::Sound,
        cost: Cost::Normal,
        build: || ReductionModule::Member(Box::new(RemoveEmptyMethods)),
    },
    ModuleSpec {
        id: "RemoveUnusedPrivateMethods",
        description: "Remove private methods the class never references",
        soundness: Soundness::Sound,
        cost: Cost::Normal,
        build: || ReductionModule::Member(Box::new(RemoveUnusedPrivateMethods)),
    },
    ModuleSpec {
        id: "RemoveWriteOnlyFields",
        description: "Remove fields that are never read, discarding their stores",
        soundness: Soundness::Sound,
        cost: Cost::Normal,
        build: || ReductionModule::Member(Box::new(RemoveWriteOnlyFields)),
    },
    ModuleSpec {
        id: "RemoveStaticAttributes",
        description: "Clear the static flag of static fields",
        soundness: Soundness::Unsound,
        cost: Cost::Normal,
        build: || ReductionModule::Member(Box::new(RemoveStaticAttributes)),
    },
    ModuleSpec {
        id: "RemoveAllMethodAttributes",
        description: "Clear all access flags of methods other than main and <clinit>",
        soundness: Soundness::Unsound,
        cost: Cost::Normal,
        build: || ReductionModule::Member(Box::new(RemoveAllMethodAttributes)),
    },
    ModuleSpec {
        id: "RemoveVoidMethodCalls",
        description: "Replace calls to void methods with pops of their arguments",
        soundness: Soundness::Unsound,
        cost: Cost::Expensive,
        build: || ReductionModule::Forcible(Box::new(RemoveVoidMethodCalls)),
    },
];

/// Decoded `Code` bodies keyed by method index, skipping bodiless methods.
pub(crate) fn method_bodies(class: &ClassFile) -> Result<Vec<(usize, CodeAttribute)>> {
    let mut bodies = Vec::new();
    for index in 0..class.methods.len() {
        if let Some(code) = class.code(index)? {
            bodies.push((index, code));
        }
    }
    Ok(bodies)
}

pub(crate) fn decode(code: &CodeAttribute) -> Result<Vec<Instruction>> {
    Ok(code.instructions().collect::<Result<Vec<_>, _>>()?)
}

/// `public static void main(String[])`, the usual entry point of a test class.
pub(crate) fn is_main(key: &MemberKey) -> bool {
    key.name == "main" && key.descriptor == "([Ljava/lang/String;)V"
}

/// Guard against a stale member index before mutating a class.
pub(crate) fn ensure_member(actual: &MemberKey, expected: &MemberKey) -> Result<()> {
    ensure!(
        actual == expected,
        "member {} no longer at its index (found {})",
        expected,
        actual
    );
    Ok(())
}

/// Instructions that discard `values` from the operand stack, padded with
/// `nop` to exactly `length` bytes.
///
/// `values` lists stack entries bottom to top; `true` marks a category-2
/// (`long`/`double`) value. Adjacent category-1 values are folded into one
/// `pop2`. Returns `None` when the pops do not fit in `length` bytes.
pub(crate) fn pop_sequence(values: &[bool], length: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(length);
    let mut remaining = values.len();
    while remaining > 0 {
        let top_wide = values[remaining - 1];
        if top_wide {
            out.push(POP2);
            remaining -= 1;
        } else if remaining >= 2 && !values[remaining - 2] {
            out.push(POP2);
            remaining -= 2;
        } else {
            out.push(POP);
            remaining -= 1;
        }
    }
    if out.len() > length {
        return None;
    }
    out.resize(length, NOP);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pop_sequence_packing() {
        assert_eq!(pop_sequence(&[], 3), Some(vec![NOP, NOP, NOP]));
        assert_eq!(pop_sequence(&[false], 3), Some(vec![POP, NOP, NOP]));
        assert_eq!(pop_sequence(&[false, false], 3), Some(vec![POP2, NOP, NOP]));
        assert_eq!(pop_sequence(&[false, true], 3), Some(vec![POP2, POP, NOP]));
        assert_eq!(pop_sequence(&[true, false], 3), Some(vec![POP, POP2, NOP]));
        assert_eq!(
            pop_sequence(&[false, false, false], 3),
            Some(vec![POP2, POP, NOP])
        );
        assert_eq!(pop_sequence(&[true, true, true], 3), Some(vec![POP2, POP2, POP2]));
        assert_eq!(pop_sequence(&[true, true, true, false], 3), None);
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<_> = CATALOG.iter().map(|m| m.id.to_lowercase()).collect();
        assert_eq!(ids.len(), CATALOG.len());
        let entry = CATALOG[0].instantiate();
        assert_eq!(entry.id, "StripDebugAttributes");
        assert_eq!(entry.module.shape(), "whole");
    }
}
