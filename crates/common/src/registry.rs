//! Category-keyed collection of loaded specs

use crate::ApiSpec;
use indexmap::IndexMap;
use std::path::PathBuf;

/// A loaded spec together with the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub path: PathBuf,
    pub item: ApiSpec,
}

/// Specs grouped by category, in discovery order
///
/// Built once per run by the loader and read by every generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecRegistry {
    categories: IndexMap<String, Vec<RegistryEntry>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a spec to its category bucket, creating the bucket if needed
    pub fn insert(&mut self, path: impl Into<PathBuf>, item: ApiSpec) {
        self.categories
            .entry(item.category.clone())
            .or_default()
            .push(RegistryEntry {
                path: path.into(),
                item,
            });
    }

    /// Entries of one category
    pub fn category(&self, name: &str) -> &[RegistryEntry] {
        self.categories
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate `(category, entries)` pairs
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[RegistryEntry])> {
        self.categories
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Iterate every entry across all categories
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.categories.values().flatten()
    }

    /// Total number of specs
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(category: &str, name: &str) -> ApiSpec {
        ApiSpec {
            category: category.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_groups_by_category() {
        let mut registry = SpecRegistry::new();
        registry.insert("/l/pet/post.yml", spec("Pet", "pet/post"));
        registry.insert("/l/user/get.yml", spec("User", "user/get"));
        registry.insert("/l/pet/get.yml", spec("Pet", "pet/get"));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.category_count(), 2);

        let pets: Vec<&str> = registry
            .category("Pet")
            .iter()
            .map(|e| e.item.name.as_str())
            .collect();
        assert_eq!(pets, vec!["pet/post", "pet/get"]);
        assert!(registry.category("Store").is_empty());
    }
}
