//! Per-artifact memory of positions whose candidates were rejected.
//!
//! Entries are keyed by module so that positions of different modules never
//! shadow each other. The whole cache is cleared whenever a candidate is
//! accepted, since positions are only meaningful relative to one base.

use std::collections::{HashMap, HashSet};

use crate::module::Position;

#[derive(Debug, Default)]
pub struct ReductionCache {
    rejected: HashMap<&'static str, HashSet<Position>>,
}

impl ReductionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejected positions of one module, creating an empty set on first use.
    pub fn rejected_for(&mut self, module: &'static str) -> &HashSet<Position> {
        self.rejected.entry(module).or_default()
    }

    /// Record a rejection. Returns `false` if it was already known.
    pub fn reject(&mut self, module: &'static str, position: Position) -> bool {
        self.rejected.entry(module).or_default().insert(position)
    }

    pub fn contains(&self, module: &str, position: &Position) -> bool {
        self.rejected
            .get(module)
            .is_some_and(|positions| positions.contains(position))
    }

    pub fn clear(&mut self) {
        self.rejected.clear();
    }

    pub fn len(&self) -> usize {
        self.rejected.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{MemberKey, MemberKind};

    fn field(name: &str) -> Position {
        Position::Member(MemberKey {
            kind: MemberKind::Field,
            name: name.to_string(),
            descriptor: "I".to_string(),
        })
    }

    #[test]
    fn test_positions_are_scoped_per_module() {
        let mut cache = ReductionCache::new();
        assert!(cache.reject("RemoveWriteOnlyFields", field("a")));
        assert!(!cache.reject("RemoveWriteOnlyFields", field("a")));

        assert!(cache.contains("RemoveWriteOnlyFields", &field("a")));
        assert!(!cache.contains("RemoveStaticAttributes", &field("a")));
        assert!(cache.rejected_for("RemoveStaticAttributes").is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut cache = ReductionCache::new();
        cache.reject("A", field("x"));
        cache.reject("B", Position::Whole);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("B", &Position::Whole));
    }
}
