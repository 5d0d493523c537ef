//! Filesystem helpers for locating inputs.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CLASS_EXTENSION: &str = "class";

/// Extension of interestingness scripts on this platform.
#[cfg(windows)]
pub const TEST_EXTENSION: &str = "bat";
#[cfg(not(windows))]
pub const TEST_EXTENSION: &str = "sh";

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// `path` if absolute, otherwise `base/path`.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Regular files with `extension` under `root`, sorted. Directories listed in
/// `exclude` (and everything below them) are skipped.
pub fn scan_files(
    root: &Path,
    extension: &str,
    recursive: bool,
    exclude: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .map_err(|e| anyhow!("Failed to read directory {}: {}", dir.display(), e))?;
        for entry in entries {
            let path = entry
                .map_err(|e| anyhow!("Failed to read directory {}: {}", dir.display(), e))?
                .path();
            if path.is_dir() {
                if recursive && !exclude.iter().any(|x| x == &path) {
                    pending.push(path);
                }
            } else if path.is_file() && has_extension(&path, extension) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("a/B.class"), "class"));
        assert!(has_extension(Path::new("run.SH"), "sh"));
        assert!(!has_extension(Path::new("run.sh.bak"), "sh"));
        assert!(!has_extension(Path::new("Makefile"), "sh"));
    }

    #[test]
    fn test_scan_skips_excluded_dirs() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir_all(root.path().join("pkg/sub"))?;
        fs::create_dir_all(root.path().join("out/pkg"))?;
        fs::write(root.path().join("A.class"), b"")?;
        fs::write(root.path().join("pkg/sub/B.class"), b"")?;
        fs::write(root.path().join("out/pkg/C.class"), b"")?;
        fs::write(root.path().join("notes.txt"), b"")?;

        let found = scan_files(
            root.path(),
            CLASS_EXTENSION,
            true,
            &[root.path().join("out")],
        )?;
        assert_eq!(
            found,
            vec![root.path().join("A.class"), root.path().join("pkg/sub/B.class")]
        );

        let shallow = scan_files(root.path(), CLASS_EXTENSION, false, &[])?;
        assert_eq!(shallow, vec![root.path().join("A.class")]);
        Ok(())
    }
}
