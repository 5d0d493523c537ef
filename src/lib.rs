//! Class Reducer
//!
//! Shrinks JVM class files while a user-supplied suite of test scripts keeps
//! succeeding. This crate holds the command-line front end:
//!
//! - [`args`]: command-line flags
//! - [`context`]: resolving and validating inputs into a run configuration
//! - [`logging`]: tracing subscriber setup
//! - [`utils`]: locating class files and scripts
//!
//! The reduction engine lives in `class-reducer-core`, the class-file model
//! in `class-reducer-classfile`.

pub mod args;
pub mod context;
pub mod logging;
pub mod utils;
