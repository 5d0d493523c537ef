//! The interestingness test suite: a conjunction of scripts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::runner::{ScriptRunner, Verdict};

/// Result of running the whole suite against one scratch directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SuiteOutcome {
    /// Every script succeeded.
    Interesting,
    /// The first script that did not succeed, and how it ended.
    Rejected { script: String, verdict: Verdict },
}

impl SuiteOutcome {
    pub fn is_interesting(&self) -> bool {
        matches!(self, SuiteOutcome::Interesting)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SuiteOutcome::Rejected {
                verdict: Verdict::Timeout,
                ..
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct TestSuite {
    tests: Vec<PathBuf>,
    runner: ScriptRunner,
}

impl TestSuite {
    /// `tests` must be non-empty; they run in the given order.
    pub fn new(tests: Vec<PathBuf>, timeout: Duration) -> Result<Self> {
        if tests.is_empty() {
            return Err(ConfigError::NoTests.into());
        }
        Ok(Self {
            tests,
            runner: ScriptRunner::new(timeout),
        })
    }

    pub fn tests(&self) -> &[PathBuf] {
        &self.tests
    }

    pub fn timeout(&self) -> Duration {
        self.runner.timeout()
    }

    /// `true` iff every test succeeds when run inside `dir`.
    pub fn run_all(&self, dir: &Path) -> bool {
        self.run(dir).is_interesting()
    }

    /// Copy every script into `dir`, then run them in order until one does
    /// not succeed.
    pub fn run(&self, dir: &Path) -> SuiteOutcome {
        let mut copies = Vec::with_capacity(self.tests.len());
        for test in &self.tests {
            let name = script_name(test);
            let target = dir.join(&name);
            if let Err(e) = fs::copy(test, &target) {
                error!("Failed to copy test '{}' into {}: {}", name, dir.display(), e);
                return SuiteOutcome::Rejected {
                    script: name,
                    verdict: Verdict::Failure { code: None },
                };
            }
            copies.push((name, target));
        }

        for (name, script) in copies {
            let verdict = match self.runner.exec_blocking(&script, dir) {
                Ok(verdict) => verdict,
                Err(e) => {
                    error!("Test '{}' could not be executed: {:#}", name, e);
                    Verdict::Failure { code: None }
                }
            };
            info!("Test '{}' {}", name, verdict);
            if !verdict.is_success() {
                return SuiteOutcome::Rejected {
                    script: name,
                    verdict,
                };
            }
        }
        SuiteOutcome::Interesting
    }
}

fn script_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_all_passing_is_interesting() -> Result<()> {
        let src = TempDir::new()?;
        let scratch = TempDir::new()?;
        let suite = TestSuite::new(
            vec![
                write(src.path(), "a.sh", "exit 0\n"),
                write(src.path(), "b.sh", "true\n"),
            ],
            Duration::from_secs(10),
        )?;
        assert!(suite.run_all(scratch.path()));
        assert!(scratch.path().join("a.sh").exists());
        assert!(scratch.path().join("b.sh").exists());
        Ok(())
    }

    #[test]
    fn test_first_failure_short_circuits() -> Result<()> {
        let src = TempDir::new()?;
        let scratch = TempDir::new()?;
        let suite = TestSuite::new(
            vec![
                write(src.path(), "a.sh", "exit 4\n"),
                write(src.path(), "b.sh", "touch ran\n"),
            ],
            Duration::from_secs(10),
        )?;
        assert_eq!(
            suite.run(scratch.path()),
            SuiteOutcome::Rejected {
                script: "a.sh".into(),
                verdict: Verdict::Failure { code: Some(4) },
            }
        );
        assert!(!scratch.path().join("ran").exists());
        Ok(())
    }

    #[test]
    fn test_timeout_is_reported() -> Result<()> {
        let src = TempDir::new()?;
        let scratch = TempDir::new()?;
        let suite = TestSuite::new(
            vec![write(src.path(), "hang.sh", "sleep 30\n")],
            Duration::from_millis(200),
        )?;
        assert!(suite.run(scratch.path()).is_timeout());
        Ok(())
    }

    #[test]
    fn test_empty_suite_is_a_config_error() {
        let err = TestSuite::new(Vec::new(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoTests)
        ));
    }
}
