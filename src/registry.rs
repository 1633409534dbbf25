//! In-memory schema registry
//!
//! Holds the declared collections for the lifetime of the process. One
//! read/write lock guards the whole map; every write replaces a collection in
//! full, so readers only ever see a complete definition.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{CollectionError, Result};
use crate::sql::sanitize::is_valid_identifier;
use crate::types::Collection;

/// Concurrency-safe name → [`Collection`] map
///
/// Shared between the store, the validator and the consistency checker via
/// `Arc<SchemaRegistry>`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    collections: RwLock<HashMap<String, Collection>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer cannot leave a half-applied collection behind (the
    // map only sees whole-value inserts), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Collection>> {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Collection>> {
        self.collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a collection by name
    pub fn get(&self, name: &str) -> Option<Collection> {
        self.read().get(name).cloned()
    }

    /// Insert or fully replace a collection definition
    pub fn set(&self, collection: Collection) -> Result<()> {
        if collection.name.is_empty() {
            return Err(CollectionError::registry("collection name cannot be empty"));
        }
        if !is_valid_identifier(&collection.name) {
            return Err(CollectionError::registry(format!(
                "invalid collection name '{}'",
                collection.name
            )));
        }
        if let Some(column) = collection.columns.iter().find(|c| !is_valid_identifier(&c.name)) {
            return Err(CollectionError::registry(format!(
                "invalid column name '{}' in '{}'",
                column.name, collection.name
            )));
        }

        debug!(
            collection = %collection.name,
            columns = collection.columns.len(),
            "Registering collection"
        );
        self.write().insert(collection.name.clone(), collection);
        Ok(())
    }

    /// Remove a collection; removing an absent name is not an error
    pub fn delete(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(CollectionError::registry("collection name cannot be empty"));
        }

        if self.write().remove(name).is_some() {
            debug!(collection = %name, "Removed collection from registry");
        }
        Ok(())
    }

    /// Names of all registered collections, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered collections, sorted by name
    pub fn get_all(&self) -> Vec<Collection> {
        let mut all: Vec<Collection> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn exists(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, ColumnType};
    use std::sync::Arc;
    use std::thread;

    fn products() -> Collection {
        Collection::new(
            "products",
            vec![
                Column::new("title", ColumnType::String).not_null(),
                Column::new("price", ColumnType::Integer),
            ],
        )
    }

    // =========================================================================
    // Basic Operations
    // =========================================================================

    #[test]
    fn test_set_and_get() {
        let registry = SchemaRegistry::new();
        registry.set(products()).unwrap();

        let found = registry.get("products").unwrap();
        assert_eq!(found, products());
        assert!(registry.exists("products"));
        assert!(registry.get("missing").is_none());
        assert!(!registry.exists("missing"));
    }

    #[test]
    fn test_set_replaces_in_full() {
        let registry = SchemaRegistry::new();
        registry.set(products()).unwrap();
        registry
            .set(Collection::new(
                "products",
                vec![Column::new("sku", ColumnType::String)],
            ))
            .unwrap();

        let found = registry.get("products").unwrap();
        assert_eq!(found.column_names(), vec!["sku"]);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_set_rejects_empty_name() {
        let registry = SchemaRegistry::new();
        let err = registry.set(Collection::new("", vec![])).unwrap_err();
        assert!(matches!(err, CollectionError::Registry(_)));
    }

    #[test]
    fn test_set_rejects_invalid_identifiers() {
        let registry = SchemaRegistry::new();

        let err = registry.set(Collection::new("bad-name", vec![])).unwrap_err();
        assert!(matches!(err, CollectionError::Registry(_)));

        let err = registry
            .set(Collection::new(
                "legacy",
                vec![Column::new("odd name", ColumnType::String)],
            ))
            .unwrap_err();
        assert!(err.to_string().contains("odd name"));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let registry = SchemaRegistry::new();
        registry.set(products()).unwrap();

        registry.delete("products").unwrap();
        registry.delete("products").unwrap();
        assert!(!registry.exists("products"));
        assert!(registry.delete("").is_err());
    }

    #[test]
    fn test_list_and_get_all_are_sorted() {
        let registry = SchemaRegistry::new();
        for name in ["zebra", "apple", "mango"] {
            registry.set(Collection::new(name, vec![])).unwrap();
        }

        assert_eq!(registry.list(), vec!["apple", "mango", "zebra"]);
        let names: Vec<_> = registry.get_all().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_clear() {
        let registry = SchemaRegistry::new();
        registry.set(products()).unwrap();
        registry.clear();
        assert_eq!(registry.count(), 0);
        assert!(registry.list().is_empty());
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[test]
    fn test_readers_never_see_partial_collection() {
        let registry = Arc::new(SchemaRegistry::new());
        let small = Collection::new("t", vec![Column::new("a", ColumnType::String)]);
        let large = Collection::new(
            "t",
            (0..20)
                .map(|i| Column::new(format!("c{i}"), ColumnType::Integer))
                .collect(),
        );
        registry.set(small.clone()).unwrap();

        let writer = {
            let registry = Arc::clone(&registry);
            let (small, large) = (small.clone(), large.clone());
            thread::spawn(move || {
                for i in 0..500 {
                    let next = if i % 2 == 0 { large.clone() } else { small.clone() };
                    registry.set(next).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let (small, large) = (small.clone(), large.clone());
                thread::spawn(move || {
                    for _ in 0..500 {
                        let seen = registry.get("t").unwrap();
                        assert!(seen == small || seen == large);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_distinct_writers() {
        let registry = Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .set(Collection::new(format!("c{i}"), vec![]))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.count(), 8);
    }
}
