//! Lookup and ordering of the built-in modules.

use serde::Serialize;
use tracing::warn;

use crate::module::{Cost, ModuleEntry, Soundness};
use crate::modules::{ModuleSpec, CATALOG};

/// Serializable summary of a module, as printed by `--list-modules`.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub id: &'static str,
    pub shape: &'static str,
    pub soundness: Soundness,
    pub cost: Cost,
    pub description: &'static str,
}

pub struct Registry;

impl Registry {
    pub fn specs() -> &'static [ModuleSpec] {
        CATALOG
    }

    /// Every known module, in registration order.
    pub fn all() -> Vec<ModuleEntry> {
        CATALOG.iter().map(ModuleSpec::instantiate).collect()
    }

    /// Modules whose simple name matches one of `filters`, ignoring case.
    /// Registration order is kept; filter order and duplicates do not matter.
    /// An empty filter list selects every module.
    pub fn filtered<S: AsRef<str>>(filters: &[S]) -> Vec<ModuleEntry> {
        if filters.is_empty() {
            return Self::all();
        }
        for filter in filters {
            let filter = filter.as_ref();
            if !CATALOG.iter().any(|m| m.id.eq_ignore_ascii_case(filter)) {
                warn!("Unknown module '{}' ignored", filter);
            }
        }
        CATALOG
            .iter()
            .filter(|m| filters.iter().any(|f| m.id.eq_ignore_ascii_case(f.as_ref())))
            .map(ModuleSpec::instantiate)
            .collect()
    }

    /// Stable sort putting sound modules before unsound ones and cheap ones
    /// before expensive ones.
    pub fn ordered(mut modules: Vec<ModuleEntry>) -> Vec<ModuleEntry> {
        modules.sort_by_key(|m| (m.soundness, m.cost));
        modules
    }

    pub fn describe() -> Vec<ModuleInfo> {
        Self::ordered(Self::all())
            .iter()
            .map(|m| ModuleInfo {
                id: m.id,
                shape: m.module.shape(),
                soundness: m.soundness,
                cost: m.cost,
                description: m.description,
            })
            .collect()
    }
}
