//! The boundary between the engine and the outside world: deciding whether a
//! candidate is still interesting, and recording accepted ones.

use anyhow::Result;
use tracing::debug;

use crate::context::Context;
use crate::paths::ScratchDir;
use crate::store::ArtifactStore;
use crate::suite::{SuiteOutcome, TestSuite};

pub trait Oracle: Send + Sync {
    /// Run the interestingness tests with `candidate` standing in for
    /// `artifact`.
    fn test(&self, artifact: &str, candidate: &[u8]) -> Result<SuiteOutcome>;

    /// Called once a candidate has been accepted as the artifact's new best.
    /// Failures are logged by the engine; the candidate stays accepted.
    fn commit(&self, _artifact: &str, _bytecode: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Tests candidates in a fresh scratch directory holding the candidate plus
/// the current best of every other artifact, and persists accepted
/// candidates to the output directory.
pub struct ScratchOracle<'a> {
    context: &'a Context,
    suite: &'a TestSuite,
    store: &'a ArtifactStore,
}

impl<'a> ScratchOracle<'a> {
    pub fn new(context: &'a Context, suite: &'a TestSuite, store: &'a ArtifactStore) -> Self {
        Self {
            context,
            suite,
            store,
        }
    }

    /// Run the tests against the current state of the store, unmodified.
    pub fn test_current(&self, label: &str) -> Result<SuiteOutcome> {
        let dir = ScratchDir::create(self.context.temp_dir(), label, self.context.keep_temp)?;
        self.store.materialize(dir.path(), None)?;
        Ok(self.suite.run(dir.path()))
    }
}

impl Oracle for ScratchOracle<'_> {
    fn test(&self, artifact: &str, candidate: &[u8]) -> Result<SuiteOutcome> {
        let dir = ScratchDir::create(self.context.temp_dir(), artifact, self.context.keep_temp)?;
        debug!("Testing {} in {}", artifact, dir.path().display());
        self.store
            .materialize(dir.path(), Some((artifact, candidate)))?;
        Ok(self.suite.run(dir.path()))
    }

    fn commit(&self, artifact: &str, bytecode: &[u8]) -> Result<()> {
        self.store.replace(artifact, bytecode)?;
        self.store.persist(self.context.out_dir(), artifact)?;
        Ok(())
    }
}
