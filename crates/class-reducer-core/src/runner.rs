//! Execution of a single interestingness script with a hard deadline.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How one script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Success,
    /// Non-zero exit; `code` is `None` when the process died from a signal.
    Failure { code: Option<i32> },
    Timeout,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => write!(f, "succeeded"),
            Verdict::Failure { code: Some(code) } => write!(f, "failed with exit code {}", code),
            Verdict::Failure { code: None } => write!(f, "was terminated by a signal"),
            Verdict::Timeout => write!(f, "timed out"),
        }
    }
}

impl From<ExitStatus> for Verdict {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Verdict::Success
        } else {
            Verdict::Failure {
                code: status.code(),
            }
        }
    }
}

/// Runs scripts through the platform shell and classifies the outcome.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    timeout: Duration,
    poll_interval: Duration,
}

impl ScriptRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `script` with `cwd` as working directory and wait for it, killing
    /// it once the timeout elapses. Output goes to `<script>.stdout.log` and
    /// `<script>.stderr.log` inside `cwd`.
    ///
    /// Errors only when the process cannot be started or polled.
    pub fn exec_blocking(&self, script: &Path, cwd: &Path) -> Result<Verdict> {
        let file_name = script
            .file_name()
            .ok_or_else(|| anyhow!("script path has no file name: {}", script.display()))?
            .to_string_lossy()
            .into_owned();
        let stdout = File::create(log_path(cwd, &file_name, "stdout"))
            .with_context(|| format!("Failed to create stdout log for {}", file_name))?;
        let stderr = File::create(log_path(cwd, &file_name, "stderr"))
            .with_context(|| format!("Failed to create stderr log for {}", file_name))?;

        let mut cmd = shell_command(script);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start test script {}", script.display()))?;
        let mut guard = ChildGuard::new(child);

        let start = Instant::now();
        loop {
            if let Some(status) = guard.try_wait().context("check test status")? {
                trace!(script = %file_name, ?status, elapsed_ms = start.elapsed().as_millis() as u64, "test exited");
                return Ok(status.into());
            }
            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                guard.terminate();
                return Ok(Verdict::Timeout);
            }
            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }
}

fn log_path(cwd: &Path, file_name: &str, stream: &str) -> PathBuf {
    cwd.join(format!("{}.{}.log", file_name, stream))
}

#[cfg(unix)]
fn shell_command(script: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg(script);
    cmd
}

#[cfg(windows)]
fn shell_command(script: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(script);
    cmd
}

/// Owns a spawned test process and makes sure it is killed and reaped on
/// every exit path, including unwinding.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        kill_tree(&mut self.child);
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Kill the script and everything it spawned. The child leads its own
/// process group, so signalling the negated pid reaches grandchildren too.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: plain syscall; the group is led by our unreaped child, so the
    // id cannot have been recycled.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_exit_zero_is_success() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "ok.sh", "echo hello\nexit 0\n");
        let runner = ScriptRunner::new(Duration::from_secs(10));
        assert_eq!(runner.exec_blocking(&path, dir.path()).unwrap(), Verdict::Success);

        let out = fs::read_to_string(dir.path().join("ok.sh.stdout.log")).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_nonzero_exit_is_failure_with_code() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "fail.sh", "echo oops >&2\nexit 3\n");
        let runner = ScriptRunner::new(Duration::from_secs(10));
        let verdict = runner.exec_blocking(&path, dir.path()).unwrap();
        assert_eq!(verdict, Verdict::Failure { code: Some(3) });
        assert_eq!(verdict.to_string(), "failed with exit code 3");
        let err = fs::read_to_string(dir.path().join("fail.sh.stderr.log")).unwrap();
        assert!(err.contains("oops"));
    }

    #[test]
    fn test_script_runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let path = script(&dir, "cwd.sh", "test -f marker.txt\n");
        let runner = ScriptRunner::new(Duration::from_secs(10));
        assert!(runner.exec_blocking(&path, dir.path()).unwrap().is_success());
    }

    #[test]
    fn test_overrunning_script_times_out() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "slow.sh", "sleep 30\n");
        let runner = ScriptRunner::new(Duration::from_millis(300));
        let start = Instant::now();
        assert_eq!(runner.exec_blocking(&path, dir.path()).unwrap(), Verdict::Timeout);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
