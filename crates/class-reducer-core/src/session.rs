//! A complete reducer run over every loaded artifact.

use std::fs;
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::context::Context;
use crate::engine::Reduction;
use crate::error::ConfigError;
use crate::oracle::ScratchOracle;
use crate::paths::class_file_path;
use crate::report::{sha256_hex, ArtifactReport, SessionReport};
use crate::store::ArtifactStore;
use crate::suite::{SuiteOutcome, TestSuite};

pub struct Session<'a> {
    context: &'a Context,
    suite: &'a TestSuite,
    store: &'a ArtifactStore,
}

impl<'a> Session<'a> {
    pub fn new(context: &'a Context, suite: &'a TestSuite, store: &'a ArtifactStore) -> Self {
        Self {
            context,
            suite,
            store,
        }
    }

    /// Check that the unmodified artifacts are interesting at all.
    pub fn verify_seed(&self) -> Result<()> {
        let oracle = ScratchOracle::new(self.context, self.suite, self.store);
        match oracle.test_current("seed")? {
            SuiteOutcome::Interesting => Ok(()),
            SuiteOutcome::Rejected { script, verdict } => {
                Err(ConfigError::UninterestingSeed { script, verdict }.into())
            }
        }
    }

    /// Reduce every artifact to its fixpoint and write the results to the
    /// output directory.
    pub fn run(&self) -> Result<SessionReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        if self.context.modules.is_empty() {
            return Err(ConfigError::NoModules.into());
        }
        for dir in [self.context.out_dir(), self.context.temp_dir()] {
            fs::create_dir_all(dir)
                .map_err(|e| anyhow!("Failed to create directory {}: {}", dir.display(), e))?;
        }

        if self.context.verify_seed {
            self.verify_seed()?;
            info!("Unmodified input is interesting");
        }

        let oracle = ScratchOracle::new(self.context, self.suite, self.store);
        let names = self.store.names();
        let artifacts = if self.context.jobs > 1 && names.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.context.jobs)
                .build()
                .map_err(|e| anyhow!("Failed to build thread pool: {}", e))?;
            pool.install(|| {
                names
                    .par_iter()
                    .map(|name| self.reduce(name, &oracle))
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            names
                .iter()
                .map(|name| self.reduce(name, &oracle))
                .collect::<Result<Vec<_>>>()?
        };

        self.store.persist_all(self.context.out_dir())?;
        if !self.context.keep_temp {
            // Only succeeds once every scratch directory is gone.
            if fs::remove_dir(self.context.temp_dir()).is_ok() {
                debug!("Removed {}", self.context.temp_dir().display());
            }
        }

        Ok(SessionReport {
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            modules: self
                .context
                .module_ids()
                .into_iter()
                .map(String::from)
                .collect(),
            tests: self
                .suite
                .tests()
                .iter()
                .map(|t| t.display().to_string())
                .collect(),
            timeout_secs: self.suite.timeout().as_secs_f64(),
            seed_verified: self.context.verify_seed,
            artifacts,
        })
    }

    fn reduce(&self, name: &str, oracle: &ScratchOracle<'_>) -> Result<ArtifactReport> {
        let original = self
            .store
            .original(name)
            .ok_or_else(|| anyhow!("unknown artifact {}", name))?;
        let bytecode = self
            .store
            .current(name)
            .ok_or_else(|| anyhow!("unknown artifact {}", name))?;
        info!("Reducing {} ({} bytes)", name, bytecode.len());

        let outcome = Reduction::new(
            name,
            bytecode,
            &self.context.modules,
            oracle,
            self.context.restart,
        )?
        .run()?;

        Ok(ArtifactReport {
            name: name.to_string(),
            source: original.source.display().to_string(),
            output: class_file_path(self.context.out_dir(), name)
                .display()
                .to_string(),
            original_size: original.bytecode.len(),
            final_size: outcome.bytecode.len(),
            original_sha256: sha256_hex(&original.bytecode),
            final_sha256: sha256_hex(&outcome.bytecode),
            final_state: outcome.state,
            elapsed_ms: outcome.elapsed_ms,
            stats: outcome.stats,
        })
    }
}
