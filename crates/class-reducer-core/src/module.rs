//! The reduction-module contract.
//!
//! A module proposes one candidate reduction of a class at a time. It comes in
//! one of three shapes:
//!
//! - [`WholeReducer`]: a single transformation of the whole class.
//! - [`MemberReducer`]: enumerates eligible fields/methods and transforms one
//!   member per attempt.
//! - [`ForcibleReducer`]: full control over candidate generation, including
//!   reading the set of already-rejected positions.
//!
//! [`ReductionModule::attempt`] gives the engine a single entry point for all
//! three shapes.

use std::collections::HashSet;
use std::fmt;

use anyhow::{anyhow, Context as _, Result};
use class_reducer_classfile::ClassFile;
use serde::{Deserialize, Serialize};

/// Whether a module preserves the class's observable semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Soundness {
    Sound,
    Unsound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cost {
    Normal,
    Expensive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Field,
    Method,
}

/// Stable identity of a field or method within one class: survives
/// re-parsing, unlike member indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberKey {
    pub kind: MemberKind,
    pub name: String,
    pub descriptor: String,
}

impl MemberKey {
    pub fn field(class: &ClassFile, index: usize) -> Result<Self> {
        let member = class
            .fields
            .get(index)
            .ok_or_else(|| anyhow!("field index {} out of range", index))?;
        Ok(Self {
            kind: MemberKind::Field,
            name: class.member_name(member)?,
            descriptor: class.member_descriptor(member)?,
        })
    }

    pub fn method(class: &ClassFile, index: usize) -> Result<Self> {
        let member = class
            .methods
            .get(index)
            .ok_or_else(|| anyhow!("method index {} out of range", index))?;
        Ok(Self {
            kind: MemberKind::Method,
            name: class.member_name(member)?,
            descriptor: class.member_descriptor(member)?,
        })
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.descriptor)
    }
}

/// An eligible member as seen in the class it was enumerated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub key: MemberKey,
    /// Index into `fields` or `methods` of that class.
    pub index: usize,
}

/// Where inside a class a reduction applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Position {
    Whole,
    Member(MemberKey),
    Instruction { method: MemberKey, offset: usize },
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Whole => write!(f, "<class>"),
            Position::Member(key) => write!(f, "{}", key),
            Position::Instruction { method, offset } => write!(f, "{}@{}", method, offset),
        }
    }
}

/// The current bytecode of an artifact and the positions already rejected
/// for the module being asked.
#[derive(Debug, Clone, Copy)]
pub struct Base<'a> {
    bytecode: &'a [u8],
    rejected: &'a HashSet<Position>,
}

impl<'a> Base<'a> {
    pub fn new(bytecode: &'a [u8], rejected: &'a HashSet<Position>) -> Self {
        Self { bytecode, rejected }
    }

    pub fn bytecode(&self) -> &'a [u8] {
        self.bytecode
    }

    pub fn cache(&self) -> &'a HashSet<Position> {
        self.rejected
    }

    pub fn is_rejected(&self, position: &Position) -> bool {
        self.rejected.contains(position)
    }

    pub fn to_result(&self, bytecode: Vec<u8>, position: Position) -> ReductionResult {
        ReductionResult::Candidate { bytecode, position }
    }

    pub fn to_minimal_result(&self) -> ReductionResult {
        ReductionResult::Minimal
    }
}

/// Outcome of one module attempt.
#[derive(Debug)]
pub enum ReductionResult {
    /// A proposed reduction to test.
    Candidate { bytecode: Vec<u8>, position: Position },
    /// Nothing left to try from this base.
    Minimal,
    /// The attempt failed. `position` is the offending position when known.
    Invalid {
        position: Option<Position>,
        error: anyhow::Error,
    },
}

impl ReductionResult {
    pub fn is_minimal(&self) -> bool {
        matches!(self, ReductionResult::Minimal)
    }
}

pub trait WholeReducer: Send + Sync {
    fn apply(&self, class: ClassFile) -> Result<ClassFile>;
}

pub trait MemberReducer: Send + Sync {
    /// Eligible members in declaration order.
    fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>>;

    fn process(&self, class: ClassFile, member: &Member) -> Result<ClassFile>;
}

pub trait ForcibleReducer: Send + Sync {
    fn apply(&self, base: &Base<'_>) -> Result<ReductionResult>;
}

pub enum ReductionModule {
    Whole(Box<dyn WholeReducer>),
    Member(Box<dyn MemberReducer>),
    Forcible(Box<dyn ForcibleReducer>),
}

impl ReductionModule {
    pub fn shape(&self) -> &'static str {
        match self {
            ReductionModule::Whole(_) => "whole",
            ReductionModule::Member(_) => "member",
            ReductionModule::Forcible(_) => "forcible",
        }
    }

    /// Produce the next candidate for `base`, or report that none is left.
    ///
    /// Never panics on module failure: errors come back as
    /// [`ReductionResult::Invalid`].
    pub fn attempt(&self, base: &Base<'_>) -> ReductionResult {
        if base.is_rejected(&Position::Whole) {
            return ReductionResult::Minimal;
        }
        match self {
            ReductionModule::Whole(reducer) => attempt_whole(reducer.as_ref(), base),
            ReductionModule::Member(reducer) => attempt_member(reducer.as_ref(), base),
            ReductionModule::Forcible(reducer) => match reducer.apply(base) {
                Ok(result) => result,
                Err(error) => ReductionResult::Invalid {
                    position: None,
                    error,
                },
            },
        }
    }
}

impl fmt::Debug for ReductionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReductionModule::{}", self.shape())
    }
}

fn attempt_whole(reducer: &dyn WholeReducer, base: &Base<'_>) -> ReductionResult {
    let outcome = class_from(base.bytecode()).and_then(|class| reducer.apply(class));
    match outcome {
        Ok(class) => {
            let bytecode = bytecode_from(&class);
            if bytecode == base.bytecode() {
                base.to_minimal_result()
            } else {
                base.to_result(bytecode, Position::Whole)
            }
        }
        Err(error) => ReductionResult::Invalid {
            position: Some(Position::Whole),
            error,
        },
    }
}

fn attempt_member(reducer: &dyn MemberReducer, base: &Base<'_>) -> ReductionResult {
    let class = match class_from(base.bytecode()) {
        Ok(class) => class,
        Err(error) => {
            return ReductionResult::Invalid {
                position: Some(Position::Whole),
                error,
            }
        }
    };
    let members = match reducer.eligible_members(&class) {
        Ok(members) => members,
        Err(error) => {
            return ReductionResult::Invalid {
                position: Some(Position::Whole),
                error,
            }
        }
    };
    let Some(member) = members
        .into_iter()
        .find(|m| !base.is_rejected(&Position::Member(m.key.clone())))
    else {
        return base.to_minimal_result();
    };

    let position = Position::Member(member.key.clone());
    match reducer.process(class, &member) {
        Ok(class) => base.to_result(bytecode_from(&class), position),
        Err(error) => ReductionResult::Invalid {
            position: Some(position),
            error,
        },
    }
}

/// Parse bytecode into the structural model.
pub fn class_from(bytecode: &[u8]) -> Result<ClassFile> {
    ClassFile::parse(bytecode).context("failed to parse class file")
}

/// Serialize the structural model back to bytecode.
pub fn bytecode_from(class: &ClassFile) -> Vec<u8> {
    class.to_bytes()
}

/// A registered module: identity, classification and implementation.
#[derive(Debug)]
pub struct ModuleEntry {
    /// Simple name used for filtering, e.g. `RemoveEmptyMethods`.
    pub id: &'static str,
    pub description: &'static str,
    pub soundness: Soundness,
    pub cost: Cost,
    pub module: ReductionModule,
}

impl ModuleEntry {
    pub fn attempt(&self, base: &Base<'_>) -> ReductionResult {
        self.module.attempt(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use class_reducer_classfile::class_file::{ACC_PRIVATE, ACC_PUBLIC};
    use class_reducer_classfile::ClassBuilder;

    struct DropFields;

    impl MemberReducer for DropFields {
        fn eligible_members(&self, class: &ClassFile) -> Result<Vec<Member>> {
            (0..class.fields.len())
                .map(|index| {
                    Ok(Member {
                        key: MemberKey::field(class, index)?,
                        index,
                    })
                })
                .collect()
        }

        fn process(&self, mut class: ClassFile, member: &Member) -> Result<ClassFile> {
            class.fields.remove(member.index);
            Ok(class)
        }
    }

    struct Identity;

    impl WholeReducer for Identity {
        fn apply(&self, class: ClassFile) -> Result<ClassFile> {
            Ok(class)
        }
    }

    struct Broken;

    impl ForcibleReducer for Broken {
        fn apply(&self, _base: &Base<'_>) -> Result<ReductionResult> {
            Err(anyhow!("boom"))
        }
    }

    fn two_fields() -> Vec<u8> {
        let mut b = ClassBuilder::new("demo/Fields");
        b.field(ACC_PRIVATE, "a", "I");
        b.field(ACC_PUBLIC, "b", "J");
        b.build()
    }

    #[test]
    fn test_member_attempt_skips_rejected_positions() {
        let bytes = two_fields();
        let module = ReductionModule::Member(Box::new(DropFields));
        let mut rejected = HashSet::new();

        let first = module.attempt(&Base::new(&bytes, &rejected));
        let ReductionResult::Candidate { position, bytecode } = first else {
            panic!("expected a candidate");
        };
        assert_eq!(position.to_string(), "a:I");
        assert_eq!(class_from(&bytecode).unwrap().fields.len(), 1);

        rejected.insert(position);
        let second = module.attempt(&Base::new(&bytes, &rejected));
        let ReductionResult::Candidate { position, .. } = second else {
            panic!("expected a candidate");
        };
        assert_eq!(position.to_string(), "b:J");

        rejected.insert(position);
        assert!(module.attempt(&Base::new(&bytes, &rejected)).is_minimal());
    }

    #[test]
    fn test_whole_attempt_without_change_is_minimal() {
        let bytes = two_fields();
        let module = ReductionModule::Whole(Box::new(Identity));
        let rejected = HashSet::new();
        assert!(module.attempt(&Base::new(&bytes, &rejected)).is_minimal());
    }

    #[test]
    fn test_failures_become_invalid_results() {
        let rejected = HashSet::new();
        let module = ReductionModule::Forcible(Box::new(Broken));
        let bytes = two_fields();
        assert!(matches!(
            module.attempt(&Base::new(&bytes, &rejected)),
            ReductionResult::Invalid { position: None, .. }
        ));

        let garbage = [0xde, 0xad];
        let module = ReductionModule::Member(Box::new(DropFields));
        assert!(matches!(
            module.attempt(&Base::new(&garbage, &rejected)),
            ReductionResult::Invalid {
                position: Some(Position::Whole),
                ..
            }
        ));
    }

    #[test]
    fn test_rejected_whole_position_disables_module() {
        let bytes = two_fields();
        let rejected = HashSet::from([Position::Whole]);
        let module = ReductionModule::Member(Box::new(DropFields));
        assert!(module.attempt(&Base::new(&bytes, &rejected)).is_minimal());
    }
}
