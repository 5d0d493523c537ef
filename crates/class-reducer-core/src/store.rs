//! In-memory set of artifacts being reduced and their current best
//! bytecode.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use class_reducer_classfile::ClassFile;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::ConfigError;
use crate::paths::{atomic_write, class_file_path, ensure_parent_dirs, is_valid_internal_name};

/// A class file loaded from disk, keyed by its declared internal name.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub source: PathBuf,
    pub bytecode: Vec<u8>,
}

impl Artifact {
    pub fn load(path: &Path) -> Result<Self> {
        let bytecode = fs::read(path)
            .map_err(|e| anyhow!("Failed to read class file {}: {}", path.display(), e))?;
        Self::from_bytes(path.to_path_buf(), bytecode)
    }

    /// Parse `bytecode` and key it by its declared name. The name later
    /// becomes a relative path, so anything outside the internal-name
    /// grammar is rejected.
    pub fn from_bytes(source: PathBuf, bytecode: Vec<u8>) -> Result<Self> {
        let class = ClassFile::parse(&bytecode).map_err(|e| ConfigError::InvalidClass {
            path: source.clone(),
            source: e,
        })?;
        let name = class.this_class_name().map_err(|e| ConfigError::InvalidClass {
            path: source.clone(),
            source: e,
        })?;
        if !is_valid_internal_name(&name) {
            return Err(ConfigError::InvalidClassName { path: source, name }.into());
        }
        Ok(Self {
            name,
            source,
            bytecode,
        })
    }
}

/// All artifacts of a run. Originals are immutable; the current best of each
/// artifact is replaced as reductions are accepted.
#[derive(Debug)]
pub struct ArtifactStore {
    originals: BTreeMap<String, Artifact>,
    current: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl ArtifactStore {
    /// Fails if two artifacts declare the same class.
    pub fn new(artifacts: Vec<Artifact>) -> Result<Self> {
        let mut originals: BTreeMap<String, Artifact> = BTreeMap::new();
        for artifact in artifacts {
            if let Some(existing) = originals.get(&artifact.name) {
                return Err(ConfigError::DuplicateClass {
                    name: artifact.name,
                    first: existing.source.clone(),
                    second: artifact.source,
                }
                .into());
            }
            originals.insert(artifact.name.clone(), artifact);
        }
        let current = originals
            .iter()
            .map(|(name, a)| (name.clone(), a.bytecode.clone()))
            .collect();
        Ok(Self {
            originals,
            current: RwLock::new(current),
        })
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Artifact names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.originals.keys().cloned().collect()
    }

    pub fn original(&self, name: &str) -> Option<&Artifact> {
        self.originals.get(name)
    }

    pub fn current(&self, name: &str) -> Option<Vec<u8>> {
        self.current.read().get(name).cloned()
    }

    pub fn replace(&self, name: &str, bytecode: &[u8]) -> Result<()> {
        let mut current = self.current.write();
        let slot = current
            .get_mut(name)
            .ok_or_else(|| anyhow!("unknown artifact {}", name))?;
        *slot = bytecode.to_vec();
        Ok(())
    }

    /// Write the current bytecode of every artifact under `dir`, using
    /// `overlay` instead of the current bytecode for the named artifact.
    pub fn materialize(&self, dir: &Path, overlay: Option<(&str, &[u8])>) -> Result<()> {
        let current = self.current.read();
        for (name, bytecode) in current.iter() {
            let bytes = match overlay {
                Some((target, candidate)) if target == name => candidate,
                _ => bytecode.as_slice(),
            };
            let path = class_file_path(dir, name);
            ensure_parent_dirs(&path)?;
            fs::write(&path, bytes)
                .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
        }
        Ok(())
    }

    /// Atomically write the current bytecode of `name` under `out_dir`.
    pub fn persist(&self, out_dir: &Path, name: &str) -> Result<PathBuf> {
        let bytecode = self
            .current(name)
            .ok_or_else(|| anyhow!("unknown artifact {}", name))?;
        let path = class_file_path(out_dir, name);
        atomic_write(&path, &bytecode)?;
        debug!("Wrote {} ({} bytes)", path.display(), bytecode.len());
        Ok(path)
    }

    pub fn persist_all(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.names()
            .iter()
            .map(|name| self.persist(out_dir, name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use class_reducer_classfile::ClassBuilder;
    use tempfile::TempDir;

    fn artifact(name: &str, source: &str) -> Artifact {
        Artifact::from_bytes(PathBuf::from(source), ClassBuilder::new(name).build()).unwrap()
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = ArtifactStore::new(vec![
            artifact("demo/A", "x/A.class"),
            artifact("demo/A", "y/A.class"),
        ])
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::DuplicateClass { .. })
        ));
    }

    #[test]
    fn test_materialize_with_overlay() -> Result<()> {
        let store = ArtifactStore::new(vec![
            artifact("demo/A", "A.class"),
            artifact("B", "B.class"),
        ])?;
        let dir = TempDir::new()?;
        store.materialize(dir.path(), Some(("demo/A", b"candidate")))?;
        assert_eq!(fs::read(dir.path().join("demo/A.class"))?, b"candidate");
        assert_eq!(
            fs::read(dir.path().join("B.class"))?,
            store.original("B").unwrap().bytecode
        );
        Ok(())
    }

    #[test]
    fn test_replace_and_persist() -> Result<()> {
        let store = ArtifactStore::new(vec![artifact("demo/A", "A.class")])?;
        store.replace("demo/A", b"smaller")?;
        assert_eq!(store.current("demo/A").unwrap(), b"smaller");
        assert!(store.replace("demo/Missing", b"").is_err());

        let out = TempDir::new()?;
        let written = store.persist_all(out.path())?;
        assert_eq!(written, vec![out.path().join("demo/A.class")]);
        assert_eq!(fs::read(&written[0])?, b"smaller");
        Ok(())
    }

    #[test]
    fn test_load_rejects_non_class_files() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("Bad.class");
        fs::write(&path, b"not a class")?;
        let err = Artifact::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidClass { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_escaping_class_names_are_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        for name in ["../../escaped", "/abs/Foo", "demo/./A"] {
            let path = dir.path().join("Escaped.class");
            fs::write(&path, ClassBuilder::new(name).build())?;
            let err = Artifact::load(&path).unwrap_err();
            match err.downcast_ref::<ConfigError>() {
                Some(ConfigError::InvalidClassName { name: declared, .. }) => {
                    assert_eq!(declared, name)
                }
                other => panic!("unexpected error for {name}: {other:?}"),
            }
        }
        assert!(!dir.path().join("../escaped.class").exists());
        Ok(())
    }
}
