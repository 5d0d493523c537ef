//! Fixpoint reduction of a single artifact.
//!
//! The engine walks the module list, asking each module for a candidate
//! against the current bytecode. Candidates are tested through an
//! [`Oracle`]; accepted ones become the new base and clear the rejection
//! cache, rejected ones are remembered so the module moves on. The run ends
//! when every module reports [`ReductionResult::Minimal`].
//!
//! ```text
//! Searching --candidate--> Testing --pass--> Accepted --> Searching ...
//!     |                       \--fail--> Rejected --> Searching ...
//!     \--all modules minimal--> Exhausted
//! ```

use std::time::Instant;

use anyhow::{Context as _, Result};
use class_reducer_classfile::ClassFile;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::cache::ReductionCache;
use crate::context::RestartPolicy;
use crate::module::{Base, ModuleEntry, Position, ReductionResult};
use crate::oracle::Oracle;
use crate::report::ReductionStats;
use crate::runner::Verdict;
use crate::suite::SuiteOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionState {
    /// Looking for the next candidate.
    Searching,
    /// A candidate is waiting to be tested.
    Testing,
    /// The last candidate passed and became the new base.
    Accepted,
    /// The last candidate failed and its position was cached.
    Rejected,
    /// Every module is minimal for the current base.
    Exhausted,
}

#[derive(Debug)]
struct Pending {
    module: usize,
    bytecode: Vec<u8>,
    position: Position,
}

/// Result of running an artifact to its fixpoint.
#[derive(Debug, Clone)]
pub struct ReductionOutcome {
    pub bytecode: Vec<u8>,
    pub state: ReductionState,
    pub stats: ReductionStats,
    pub elapsed_ms: u64,
}

pub struct Reduction<'a> {
    artifact: String,
    modules: &'a [ModuleEntry],
    oracle: &'a dyn Oracle,
    restart: RestartPolicy,
    current: Vec<u8>,
    cache: ReductionCache,
    module_index: usize,
    accepted_in_pass: bool,
    pending: Option<Pending>,
    state: ReductionState,
    stats: ReductionStats,
}

impl<'a> Reduction<'a> {
    /// Fails if `bytecode` is not a valid class file.
    pub fn new(
        artifact: impl Into<String>,
        bytecode: Vec<u8>,
        modules: &'a [ModuleEntry],
        oracle: &'a dyn Oracle,
        restart: RestartPolicy,
    ) -> Result<Self> {
        let artifact = artifact.into();
        ClassFile::parse(&bytecode)
            .with_context(|| format!("initial bytecode of {} is not a valid class", artifact))?;
        Ok(Self {
            artifact,
            modules,
            oracle,
            restart,
            current: bytecode,
            cache: ReductionCache::new(),
            module_index: 0,
            accepted_in_pass: false,
            pending: None,
            state: ReductionState::Searching,
            stats: ReductionStats::default(),
        })
    }

    pub fn state(&self) -> ReductionState {
        self.state
    }

    pub fn current(&self) -> &[u8] {
        &self.current
    }

    pub fn stats(&self) -> &ReductionStats {
        &self.stats
    }

    pub fn cache(&self) -> &ReductionCache {
        &self.cache
    }

    /// Advance by one transition. From `Testing` this runs the test suite
    /// once; otherwise it searches (without testing) until a candidate is
    /// found or every module is exhausted.
    pub fn step(&mut self) -> Result<ReductionState> {
        self.state = match self.state {
            ReductionState::Exhausted => ReductionState::Exhausted,
            ReductionState::Testing => self.test_pending()?,
            _ => self.search(),
        };
        Ok(self.state)
    }

    /// Step until exhausted.
    pub fn run(mut self) -> Result<ReductionOutcome> {
        let start = Instant::now();
        while self.step()? != ReductionState::Exhausted {}
        info!(
            artifact = %self.artifact,
            tests = self.stats.tests_run,
            accepted = self.stats.accepted,
            size = self.current.len(),
            "Reduction finished"
        );
        Ok(ReductionOutcome {
            bytecode: self.current,
            state: self.state,
            stats: self.stats,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn search(&mut self) -> ReductionState {
        let modules = self.modules;
        loop {
            if self.module_index >= modules.len() {
                if self.restart == RestartPolicy::Continue && self.accepted_in_pass {
                    trace!(artifact = %self.artifact, "starting another pass");
                    self.module_index = 0;
                    self.accepted_in_pass = false;
                    continue;
                }
                return ReductionState::Exhausted;
            }

            let entry = &modules[self.module_index];
            let result = entry.attempt(&Base::new(
                &self.current,
                self.cache.rejected_for(entry.id),
            ));
            match result {
                ReductionResult::Minimal => {
                    trace!(artifact = %self.artifact, module = entry.id, "module is minimal");
                    self.module_index += 1;
                }
                ReductionResult::Invalid { position, error } => {
                    let position = position.unwrap_or(Position::Whole);
                    warn!(
                        "Module {} failed on {} at {}: {:#}",
                        entry.id, self.artifact, position, error
                    );
                    self.stats.invalid += 1;
                    self.stats.module(entry.id).invalid += 1;
                    self.cache.reject(entry.id, position);
                }
                ReductionResult::Candidate { bytecode, position } => {
                    if let Some(reason) = self.untestable(&bytecode) {
                        debug!(
                            "Skipping {} candidate at {} for {}: {}",
                            entry.id, position, self.artifact, reason
                        );
                        self.stats.skipped += 1;
                        self.stats.module(entry.id).skipped += 1;
                        self.cache.reject(entry.id, position);
                        continue;
                    }
                    self.pending = Some(Pending {
                        module: self.module_index,
                        bytecode,
                        position,
                    });
                    return ReductionState::Testing;
                }
            }
        }
    }

    /// Why a candidate should be rejected without running the tests.
    fn untestable(&self, candidate: &[u8]) -> Option<&'static str> {
        if candidate == self.current.as_slice() {
            return Some("no change");
        }
        if candidate.len() > self.current.len() {
            return Some("larger than current");
        }
        if ClassFile::parse(candidate).is_err() {
            return Some("does not parse");
        }
        None
    }

    fn test_pending(&mut self) -> Result<ReductionState> {
        let Some(pending) = self.pending.take() else {
            return Ok(ReductionState::Searching);
        };
        let modules = self.modules;
        let entry = &modules[pending.module];
        self.stats.tests_run += 1;

        let outcome = match self.oracle.test(&self.artifact, &pending.bytecode) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Could not test {} candidate: {:#}", self.artifact, e);
                SuiteOutcome::Rejected {
                    script: String::new(),
                    verdict: Verdict::Failure { code: None },
                }
            }
        };

        if outcome.is_interesting() {
            info!(
                "Accepted {} at {} for {}: {} -> {} bytes",
                entry.id,
                pending.position,
                self.artifact,
                self.current.len(),
                pending.bytecode.len()
            );
            self.current = pending.bytecode;
            self.cache.clear();
            // The accepted bytes stay the base even if they cannot be
            // written out; the session persists every artifact again at the
            // end.
            if let Err(e) = self.oracle.commit(&self.artifact, &self.current) {
                error!("Failed to record accepted {} candidate: {:#}", self.artifact, e);
            }
            self.stats.accepted += 1;
            self.stats.module(entry.id).accepted += 1;
            match self.restart {
                RestartPolicy::FromFirst => self.module_index = 0,
                RestartPolicy::Continue => self.accepted_in_pass = true,
            }
            Ok(ReductionState::Accepted)
        } else {
            debug!(
                "Rejected {} at {} for {}: {:?}",
                entry.id, pending.position, self.artifact, outcome
            );
            if outcome.is_timeout() {
                self.stats.timeouts += 1;
            }
            self.stats.rejected += 1;
            self.stats.module(entry.id).rejected += 1;
            self.cache.reject(entry.id, pending.position);
            Ok(ReductionState::Rejected)
        }
    }
}
