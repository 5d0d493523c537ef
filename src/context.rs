//! Turning command-line input into a validated [`Context`], test suite and
//! artifact store.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use class_reducer_core::{
    Artifact, ArtifactStore, ConfigError, Context, Registry, RestartPolicy, TestSuite,
    DEFAULT_OUT, DEFAULT_TEMP, DEFAULT_TIMEOUT_SECS,
};

use crate::args::Args;
use crate::utils::{has_extension, resolve, scan_files, CLASS_EXTENSION, TEST_EXTENSION};

/// Builder for everything a run needs. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone)]
pub struct ContextFactory {
    working_dir: PathBuf,
    classes: Vec<String>,
    tests: Vec<String>,
    modules: Vec<String>,
    out_dir: PathBuf,
    temp_dir: PathBuf,
    keep_temp: bool,
    timeout: Duration,
    restart: RestartPolicy,
    verify_seed: bool,
    jobs: usize,
}

impl ContextFactory {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            classes: Vec::new(),
            tests: Vec::new(),
            modules: Vec::new(),
            out_dir: PathBuf::from(DEFAULT_OUT),
            temp_dir: PathBuf::from(DEFAULT_TEMP),
            keep_temp: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            restart: RestartPolicy::default(),
            verify_seed: true,
            jobs: 1,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| anyhow!("Failed to determine current directory: {}", e))?;
        let working_dir = match &args.working_dir {
            Some(dir) => resolve(&cwd, dir),
            None => cwd,
        };
        if !working_dir.is_dir() {
            return Err(anyhow!(
                "Working directory {} does not exist",
                working_dir.display()
            ));
        }
        Ok(Self {
            working_dir,
            classes: args.classes.clone(),
            tests: args.tests.clone(),
            modules: args.modules.clone(),
            out_dir: args.out_dir.clone(),
            temp_dir: args.temp_dir.clone(),
            keep_temp: args.keep_temp,
            timeout: Duration::from_secs(args.timeout),
            restart: args.restart.into(),
            verify_seed: !args.no_seed_check,
            jobs: args.jobs.max(1),
        })
    }

    pub fn with_classes<S: Into<String>>(mut self, classes: impl IntoIterator<Item = S>) -> Self {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tests<S: Into<String>>(mut self, tests: impl IntoIterator<Item = S>) -> Self {
        self.tests = tests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modules<S: Into<String>>(mut self, modules: impl IntoIterator<Item = S>) -> Self {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_seed_check(mut self, verify_seed: bool) -> Self {
        self.verify_seed = verify_seed;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn out_dir(&self) -> PathBuf {
        resolve(&self.working_dir, &self.out_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        resolve(&self.working_dir, &self.temp_dir)
    }

    /// Select and order the modules. Fails if the filters match nothing.
    pub fn create_context(&self) -> Result<Context> {
        let modules = Registry::filtered(self.modules.as_slice());
        if modules.is_empty() {
            return Err(ConfigError::NoModules.into());
        }
        Ok(
            Context::new(self.out_dir(), self.temp_dir(), Registry::ordered(modules))
                .with_timeout(self.timeout)
                .with_keep_temp(self.keep_temp)
                .with_restart(self.restart)
                .with_seed_check(self.verify_seed)
                .with_jobs(self.jobs),
        )
    }

    /// Explicit class files, or every `*.class` below the working directory
    /// outside the output and temp directories.
    pub fn class_files(&self) -> Result<Vec<PathBuf>> {
        if !self.classes.is_empty() {
            return Ok(validate(&self.working_dir, &self.classes, CLASS_EXTENSION));
        }
        scan_files(
            &self.working_dir,
            CLASS_EXTENSION,
            true,
            &[self.out_dir(), self.temp_dir()],
        )
    }

    /// Explicit test scripts, or every script directly in the working
    /// directory.
    pub fn test_files(&self) -> Result<Vec<PathBuf>> {
        let candidates = if self.tests.is_empty() {
            scan_files(&self.working_dir, TEST_EXTENSION, false, &[])?
        } else {
            validate(&self.working_dir, &self.tests, TEST_EXTENSION)
        };
        // Scripts are copied side by side into each scratch directory.
        let mut names = HashSet::new();
        Ok(candidates
            .into_iter()
            .filter(|path| {
                let unique = names.insert(path.file_name().map(|n| n.to_os_string()));
                if !unique {
                    warn!(
                        "Test {} skipped: another test has the same file name",
                        path.display()
                    );
                }
                unique
            })
            .collect())
    }

    pub fn load_store(&self) -> Result<ArtifactStore> {
        let files = self.class_files()?;
        if files.is_empty() {
            return Err(ConfigError::NoClassFiles.into());
        }
        let artifacts = files
            .iter()
            .map(|path| Artifact::load(path))
            .collect::<Result<Vec<_>>>()?;
        for artifact in &artifacts {
            debug!("Loaded {} from {}", artifact.name, artifact.source.display());
        }
        ArtifactStore::new(artifacts)
    }

    pub fn test_suite(&self) -> Result<TestSuite> {
        TestSuite::new(self.test_files()?, self.timeout)
    }
}

/// Resolve user-supplied paths, dropping directories, missing files and
/// files with the wrong extension with a warning.
fn validate(base: &Path, paths: &[String], extension: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    for raw in paths {
        let path = resolve(base, Path::new(raw));
        if path.is_dir() {
            warn!("Skipping {}: is a directory", path.display());
        } else if !path.exists() {
            warn!("Skipping {}: does not exist", path.display());
        } else if !has_extension(&path, extension) {
            warn!("Skipping {}: expected a .{} file", path.display(), extension);
        } else if seen.insert(path.clone()) {
            valid.push(path);
        }
    }
    valid
}
