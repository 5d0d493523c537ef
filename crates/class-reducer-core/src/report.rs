//! Report types for reduction results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::ReductionState;

/// Per-module attempt counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStats {
    /// Candidates that passed the test suite.
    pub accepted: u64,
    /// Candidates the test suite rejected.
    pub rejected: u64,
    /// Attempts that failed inside the module.
    pub invalid: u64,
    /// Candidates discarded without running the tests.
    pub skipped: u64,
}

/// Counters for the reduction of one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    /// Test-suite executions.
    pub tests_run: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Rejections caused by a script timing out.
    pub timeouts: u64,
    pub invalid: u64,
    /// Candidates that did not parse, did not change the bytecode or grew it.
    pub skipped: u64,
    /// Breakdown by module id.
    pub modules: BTreeMap<String, ModuleStats>,
}

impl ReductionStats {
    pub fn module(&mut self, id: &str) -> &mut ModuleStats {
        self.modules.entry(id.to_string()).or_default()
    }
}

/// Outcome of reducing one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Internal class name, e.g. `com/example/Foo`.
    pub name: String,
    /// Where the artifact was loaded from.
    pub source: String,
    /// Where the reduced class was written.
    pub output: String,
    pub original_size: usize,
    pub final_size: usize,
    /// SHA-256 of the original bytecode (hex).
    pub original_sha256: String,
    /// SHA-256 of the reduced bytecode (hex).
    pub final_sha256: String,
    pub final_state: ReductionState,
    pub elapsed_ms: u64,
    pub stats: ReductionStats,
}

impl ArtifactReport {
    /// Bytes removed, as a fraction of the original size.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.final_size as f64 / self.original_size as f64
    }

    pub fn is_reduced(&self) -> bool {
        self.original_sha256 != self.final_sha256
    }
}

/// Complete report from one reducer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Module ids in application order.
    pub modules: Vec<String>,
    pub tests: Vec<String>,
    pub timeout_secs: f64,
    /// Whether the unmodified input was checked against the tests first.
    pub seed_verified: bool,
    pub artifacts: Vec<ArtifactReport>,
}

impl SessionReport {
    pub fn total_tests_run(&self) -> u64 {
        self.artifacts.iter().map(|a| a.stats.tests_run).sum()
    }

    pub fn original_size(&self) -> usize {
        self.artifacts.iter().map(|a| a.original_size).sum()
    }

    pub fn final_size(&self) -> usize {
        self.artifacts.iter().map(|a| a.final_size).sum()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let reduced = self.artifacts.iter().filter(|a| a.is_reduced()).count();
        format!(
            "Reduced {}/{} classes: {} -> {} bytes in {} tests ({:.1}s)",
            reduced,
            self.artifacts.len(),
            self.original_size(),
            self.final_size(),
            self.total_tests_run(),
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
