//! Filesystem layout: output class paths, scratch directories and atomic
//! writes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Whether `name` is a well-formed internal class name: non-empty
/// `/`-separated segments, none containing `.`, `;`, `[`, a backslash or NUL.
/// Only such names are safe to map onto the filesystem.
pub fn is_valid_internal_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('/').all(|segment| {
            !segment.is_empty()
                && !segment
                    .chars()
                    .any(|c| matches!(c, '.' | ';' | '[' | '\\' | '\0'))
        })
}

/// `<root>/com/example/Foo.class` for internal name `com/example/Foo`.
/// Callers must pass a name accepted by [`is_valid_internal_name`].
pub fn class_file_path(root: &Path, internal_name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in internal_name.split('/') {
        path.push(segment);
    }
    path.set_extension("class");
    path
}

/// Unique directory name for one test of `artifact`.
pub fn scratch_dir_name(artifact: &str) -> String {
    format!("{}-{}", artifact.replace('/', "."), Uuid::new_v4())
}

/// Create the directories leading up to `path`.
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e)),
        _ => Ok(()),
    }
}

/// Write `contents` to `<path>.tmp` and rename it over `path`, so the output
/// directory never holds a partially written class.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut staged = path.as_os_str().to_os_string();
    staged.push(".tmp");
    let staged = PathBuf::from(staged);
    fs::write(&staged, contents)
        .map_err(|e| anyhow!("Failed to write {}: {}", staged.display(), e))?;
    fs::rename(&staged, path).map_err(|e| {
        let _ = fs::remove_file(&staged);
        anyhow!("Failed to move {} into place: {}", path.display(), e)
    })
}

/// Write pretty-printed JSON atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(value).map_err(|e| anyhow!("Failed to serialize JSON: {}", e))?;
    atomic_write(path, &json)
}

/// A per-test working directory under the temp root, removed on drop unless
/// `keep` is set.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    keep: bool,
}

impl ScratchDir {
    pub fn create(temp_root: &Path, artifact: &str, keep: bool) -> Result<Self> {
        let path = temp_root.join(scratch_dir_name(artifact));
        fs::create_dir_all(&path)
            .map_err(|e| anyhow!("Failed to create scratch dir {}: {}", path.display(), e))?;
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.keep {
            debug!("Keeping scratch dir {}", self.path.display());
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!("Failed to delete scratch dir {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_class_file_path_follows_packages() {
        let path = class_file_path(Path::new("out"), "com/example/Foo$Bar");
        assert_eq!(path, Path::new("out/com/example/Foo$Bar.class"));
        assert_eq!(
            class_file_path(Path::new("out"), "Main"),
            Path::new("out/Main.class")
        );
    }

    #[test]
    fn test_internal_name_validation() {
        assert!(is_valid_internal_name("com/example/Foo$Bar"));
        assert!(is_valid_internal_name("Main"));
        for bad in [
            "",
            "../../escaped",
            "/abs/Foo",
            "com//Foo",
            "com/./Foo",
            "com/example/",
            "com.example.Foo",
            "a\\b",
            "nul\0",
            "[LFoo;",
        ] {
            assert!(!is_valid_internal_name(bad), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_scratch_names_are_unique() {
        let a = scratch_dir_name("com/example/Foo");
        let b = scratch_dir_name("com/example/Foo");
        assert!(a.starts_with("com.example.Foo-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_scratch_dir_cleanup() -> Result<()> {
        let root = TempDir::new()?;
        let removed = {
            let dir = ScratchDir::create(root.path(), "A", false)?;
            fs::write(dir.path().join("x"), b"1")?;
            dir.path().to_path_buf()
        };
        assert!(!removed.exists());

        let kept = {
            let dir = ScratchDir::create(root.path(), "A", true)?;
            dir.path().to_path_buf()
        };
        assert!(kept.exists());
        Ok(())
    }

    #[test]
    fn test_atomic_write_creates_parents() -> Result<()> {
        let root = TempDir::new()?;
        let path = root.path().join("a/b/C.class");
        atomic_write(&path, b"\xca\xfe")?;
        assert_eq!(fs::read(&path)?, b"\xca\xfe");
        assert!(!root.path().join("a/b/C.class.tmp").exists());
        Ok(())
    }
}
