use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::errors::{BooksError, Result};
use crate::core::utils::canonical_name;
use crate::domain::Books;

use super::StorageBackend;

/// Keeps serialized snapshots in process; nothing touches the disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshots: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> BooksError {
    BooksError::Storage("memory storage lock poisoned".into())
}

impl StorageBackend for MemoryStorage {
    fn save(&self, books: &Books, name: &str) -> Result<()> {
        let json = serde_json::to_string(books)?;
        self.snapshots
            .write()
            .map_err(|_| poisoned())?
            .insert(canonical_name(name), json);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Books> {
        let key = canonical_name(name);
        let guard = self.snapshots.read().map_err(|_| poisoned())?;
        let json = guard
            .get(&key)
            .ok_or_else(|| BooksError::NotFound(format!("books `{key}`")))?;
        Ok(serde_json::from_str(json)?)
    }

    fn exists(&self, name: &str) -> bool {
        self.snapshots
            .read()
            .map(|guard| guard.contains_key(&canonical_name(name)))
            .unwrap_or(false)
    }

    fn list(&self) -> Result<Vec<String>> {
        let guard = self.snapshots.read().map_err(|_| poisoned())?;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_isolated_copies() {
        let storage = MemoryStorage::new();
        let mut books = Books::new("Demo");
        storage.save(&books, "Demo").unwrap();
        books.company = "Changed".into();

        let loaded = storage.load("demo").unwrap();
        assert_eq!(loaded.company, "Demo");
        assert!(storage.exists("DEMO"));
        assert_eq!(storage.list().unwrap(), vec!["demo".to_string()]);
        assert!(matches!(storage.load("other"), Err(BooksError::NotFound(_))));
    }
}
