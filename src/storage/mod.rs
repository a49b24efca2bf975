pub mod json_backend;
pub mod memory;

use crate::core::errors::Result;
use crate::domain::Books;

/// Abstraction over persistence backends capable of storing company books.
pub trait StorageBackend: Send + Sync {
    fn save(&self, books: &Books, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<Books>;
    fn exists(&self, name: &str) -> bool;
    /// Canonical names of every stored dataset, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

pub use json_backend::JsonStorage;
pub use memory::MemoryStorage;
