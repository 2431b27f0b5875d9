//! Read-only contract with the external technique library.
//!
//! The editor resolves technique node labels and populates the
//! "add technique" picker through this trait. It never mutates the library.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

pub trait TechniqueLibrary {
    fn find_by_id(&self, id: &str) -> Option<Technique>;

    /// Case-insensitive exact name lookup.
    fn find_by_name(&self, name: &str) -> Option<Technique>;

    /// Techniques whose name contains `query` (case-insensitive), for pickers.
    fn search(&self, query: &str, limit: usize) -> Vec<Technique>;
}

/// An in-memory library, e.g. a cache the host preloaded.
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    by_id: HashMap<String, Technique>,
    order: Vec<String>,
}

impl StaticLibrary {
    pub fn new(techniques: impl IntoIterator<Item = Technique>) -> Self {
        let mut lib = Self::default();
        for t in techniques {
            if !lib.by_id.contains_key(&t.id) {
                lib.order.push(t.id.clone());
            }
            lib.by_id.insert(t.id.clone(), t);
        }
        lib
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl TechniqueLibrary for StaticLibrary {
    fn find_by_id(&self, id: &str) -> Option<Technique> {
        self.by_id.get(id).cloned()
    }

    fn find_by_name(&self, name: &str) -> Option<Technique> {
        let needle = name.trim();
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .find(|t| t.name.eq_ignore_ascii_case(needle))
            .cloned()
    }

    fn search(&self, query: &str, limit: usize) -> Vec<Technique> {
        let needle = query.trim().to_lowercase();
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|t| needle.is_empty() || t.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib() -> StaticLibrary {
        StaticLibrary::new([
            Technique {
                id: "t1".into(),
                name: "Armbar".into(),
                category: Some("submission".into()),
            },
            Technique {
                id: "t2".into(),
                name: "Arm drag".into(),
                category: None,
            },
            Technique {
                id: "t3".into(),
                name: "Hip bump sweep".into(),
                category: Some("sweep".into()),
            },
        ])
    }

    #[test]
    fn lookup_by_id_and_name() {
        let lib = lib();
        assert_eq!(lib.find_by_id("t3").unwrap().name, "Hip bump sweep");
        assert_eq!(lib.find_by_name("  armbar ").unwrap().id, "t1");
        assert!(lib.find_by_id("missing").is_none());
    }

    #[test]
    fn search_is_ordered_and_limited() {
        let lib = lib();
        let found: Vec<String> = lib.search("arm", 10).into_iter().map(|t| t.id).collect();
        assert_eq!(found, vec!["t1", "t2"]);
        assert_eq!(lib.search("", 2).len(), 2);
    }
}
