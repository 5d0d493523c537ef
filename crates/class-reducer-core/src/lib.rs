//! Reduction engine for JVM class files.
//!
//! Given a set of class files and a suite of interestingness scripts, the
//! engine repeatedly applies reduction modules and keeps every candidate for
//! which all scripts still succeed, until no module can make further
//! progress.
//!
//! - [`module`]: the three module shapes and the attempt contract
//! - [`modules`]: the built-in catalog
//! - [`registry`]: filtering and ordering of modules
//! - [`engine`]: per-artifact fixpoint state machine
//! - [`suite`] / [`runner`]: running scripts with a timeout
//! - [`session`]: a whole run, including seed check and parallelism

pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod module;
pub mod modules;
pub mod oracle;
pub mod paths;
pub mod registry;
pub mod report;
pub mod runner;
pub mod session;
pub mod store;
pub mod suite;

pub use cache::ReductionCache;
pub use context::{Context, RestartPolicy, DEFAULT_OUT, DEFAULT_TEMP, DEFAULT_TIMEOUT_SECS};
pub use engine::{Reduction, ReductionOutcome, ReductionState};
pub use error::ConfigError;
pub use module::{
    Base, Cost, ForcibleReducer, Member, MemberKey, MemberKind, MemberReducer, ModuleEntry,
    Position, ReductionModule, ReductionResult, Soundness, WholeReducer,
};
pub use oracle::{Oracle, ScratchOracle};
pub use registry::{ModuleInfo, Registry};
pub use report::{ArtifactReport, ModuleStats, ReductionStats, SessionReport};
pub use runner::{ScriptRunner, Verdict};
pub use session::Session;
pub use store::{Artifact, ArtifactStore};
pub use suite::{SuiteOutcome, TestSuite};
