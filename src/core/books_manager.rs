use crate::core::errors::{BooksError, Result};
use crate::domain::Books;
use crate::storage::{MemoryStorage, StorageBackend};

/// Facade owning the active company's books and their persistence.
///
/// Every mutation runs against a cloned draft; the draft replaces the live
/// dataset only after the operation and the save both succeed.
pub struct BooksManager {
    books: Books,
    name: String,
    storage: Box<dyn StorageBackend>,
}

impl BooksManager {
    /// Loads `name` from storage, or starts empty books for it when absent.
    pub fn open(storage: Box<dyn StorageBackend>, name: &str) -> Result<Self> {
        let books = if storage.exists(name) {
            let books = storage.load(name)?;
            tracing::info!(company = %books.company, "books loaded");
            books
        } else {
            let books = Books::new(name);
            storage.save(&books, name)?;
            tracing::info!(company = name, "books created");
            books
        };
        Ok(Self {
            books,
            name: name.to_string(),
            storage,
        })
    }

    /// Creates new books, refusing to overwrite an existing dataset.
    pub fn create(storage: Box<dyn StorageBackend>, name: &str) -> Result<Self> {
        if storage.exists(name) {
            return Err(BooksError::Conflict(format!("books `{name}` already exist")));
        }
        Self::open(storage, name)
    }

    /// Ephemeral books backed by [`MemoryStorage`].
    pub fn in_memory(name: &str) -> Self {
        Self {
            books: Books::new(name),
            name: name.to_string(),
            storage: Box::new(MemoryStorage::new()),
        }
    }

    pub fn books(&self) -> &Books {
        &self.books
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    /// Applies `op` atomically: on any error the live books stay untouched.
    pub fn transact<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Books) -> Result<T>,
    {
        let mut draft = self.books.clone();
        let value = op(&mut draft)?;
        self.storage.save(&draft, &self.name)?;
        self.books = draft;
        Ok(value)
    }

    /// Discards in-memory state and reloads from storage.
    pub fn reload(&mut self) -> Result<()> {
        self.books = self.storage.load(&self.name)?;
        Ok(())
    }
}
