//! Configuration-time failures. These abort a run before any reduction
//! starts; everything that goes wrong inside a single reduction attempt is
//! handled locally by the engine instead.

use std::path::PathBuf;

use class_reducer_classfile::ClassFileError;
use thiserror::Error;

use crate::runner::Verdict;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate class '{name}' declared by {} and {}", first.display(), second.display())]
    DuplicateClass {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no class files found")]
    NoClassFiles,

    #[error("no valid interestingness tests found")]
    NoTests,

    #[error("no reduction modules selected")]
    NoModules,

    #[error("failed to parse class file {}: {source}", path.display())]
    InvalidClass {
        path: PathBuf,
        #[source]
        source: ClassFileError,
    },

    #[error("class file {} declares malformed class name '{name}'", path.display())]
    InvalidClassName { path: PathBuf, name: String },

    #[error("unmodified input is not interesting: test '{script}' {verdict}")]
    UninterestingSeed { script: String, verdict: Verdict },
}
