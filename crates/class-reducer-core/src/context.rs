//! Immutable run configuration shared by every component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::module::ModuleEntry;

pub const DEFAULT_OUT: &str = "out";
pub const DEFAULT_TEMP: &str = ".tmp";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the module scan resumes after an accepted candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Start over from the first module.
    #[default]
    FromFirst,
    /// Keep going with the current module; rescan from the top only if the
    /// last full pass accepted something.
    Continue,
}

#[derive(Debug)]
pub struct Context {
    pub out_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Selected modules in application order.
    pub modules: Vec<ModuleEntry>,
    pub keep_temp: bool,
    pub timeout: Duration,
    pub restart: RestartPolicy,
    pub verify_seed: bool,
    pub jobs: usize,
}

impl Context {
    pub fn new(out_dir: PathBuf, temp_dir: PathBuf, modules: Vec<ModuleEntry>) -> Self {
        Self {
            out_dir,
            temp_dir,
            modules,
            keep_temp: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            restart: RestartPolicy::default(),
            verify_seed: true,
            jobs: 1,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_keep_temp(mut self, keep_temp: bool) -> Self {
        self.keep_temp = keep_temp;
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_seed_check(mut self, verify_seed: bool) -> Self {
        self.verify_seed = verify_seed;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn module_ids(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.id).collect()
    }
}
