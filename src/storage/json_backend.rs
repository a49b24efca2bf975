use chrono::{DateTime, NaiveDateTime, Utc};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        errors::BooksError,
        utils::{canonical_name, ensure_dir, write_atomic, PathResolver},
    },
    domain::{books::CURRENT_SCHEMA_VERSION, Books},
};

use super::StorageBackend;
use crate::core::errors::Result;

const EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DEFAULT_RETENTION: usize = 5;

/// Stores each company as `<root>/books/<name>.json`, keeping timestamped
/// copies of the previous file under `<root>/backups/<name>/`.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    books_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let books_dir = PathResolver::books_dir_in(&app_root);
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&books_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root: app_root,
            books_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn books_path(&self, name: &str) -> PathBuf {
        self.books_dir
            .join(format!("{}.{}", canonical_name(name), EXTENSION))
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    /// Backup file names for `name`, newest first.
    pub fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|stem| stem.to_str()) {
                entries.push(file_name.to_string());
            }
        }
        entries.sort_by(|a, b| {
            parse_backup_timestamp(b)
                .cmp(&parse_backup_timestamp(a))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    /// Copies a backup over the live file and loads it.
    pub fn restore(&self, name: &str, backup_name: &str) -> Result<Books> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(BooksError::Storage(format!(
                "backup `{backup_name}` not found"
            )));
        }
        let books = load_books_from_path(&backup_path)?;
        self.save(&books, name)?;
        tracing::info!(name, backup = backup_name, "books restored from backup");
        Ok(books)
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let backup_name = format!("{}_{}.{}", canonical_name(name), timestamp, EXTENSION);
        fs::copy(path, dir.join(backup_name))?;
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(self.backup_path(name, entry)) {
                tracing::warn!(backup = %entry, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, books: &Books, name: &str) -> Result<()> {
        let path = self.books_path(name);
        self.backup_existing_file(name, &path)?;
        save_books_to_path(books, &path)?;
        tracing::debug!(path = %path.display(), "books saved");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Books> {
        let path = self.books_path(name);
        if !path.exists() {
            return Err(BooksError::NotFound(format!("books `{}`", canonical_name(name))));
        }
        load_books_from_path(&path)
    }

    fn exists(&self, name: &str) -> bool {
        self.books_path(name).exists()
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.books_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

pub fn save_books_to_path(books: &Books, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(books)?;
    write_atomic(path, &json)
}

/// Reads a dataset, refusing files written by a newer schema.
pub fn load_books_from_path(path: &Path) -> Result<Books> {
    let data = fs::read_to_string(path)?;
    let books: Books = serde_json::from_str(&data)?;
    if books.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(BooksError::Storage(format!(
            "books schema v{} is newer than supported v{}",
            books.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(books)
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(".json")?;
    let mut parts = stem.rsplitn(3, '_');
    let time_part = parts.next()?;
    let date_part = parts.next()?;
    if !is_digits(date_part, 8) || !is_digits(time_part, 6) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date_part}{time_part}"), "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage_with_temp_dir(retention: usize) -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(retention))
            .expect("json storage");
        (storage, temp)
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir(3);
        let books = Books::new("Acme S.L.");
        storage.save(&books, "Acme S.L.").expect("save books");
        assert!(storage.exists("acme s.l."));
        let loaded = storage.load("Acme S.L.").expect("load books");
        assert_eq!(loaded.id, books.id);
        assert_eq!(storage.list().unwrap(), vec!["acme-s-l".to_string()]);
    }

    #[test]
    fn missing_books_is_not_found() {
        let (storage, _guard) = storage_with_temp_dir(3);
        assert!(!storage.exists("ghost"));
        assert!(matches!(storage.load("ghost"), Err(BooksError::NotFound(_))));
    }

    #[test]
    fn overwriting_keeps_a_backup() {
        let (storage, _guard) = storage_with_temp_dir(3);
        let mut books = Books::new("Acme");
        storage.save(&books, "acme").unwrap();
        books.company = "Acme Renamed".into();
        storage.save(&books, "acme").unwrap();

        let backups = storage.list_backups("acme").unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("acme_"));
        let restored = storage.restore("acme", &backups[0]).unwrap();
        assert_eq!(restored.company, "Acme");
        assert_eq!(storage.load("acme").unwrap().company, "Acme");
    }

    #[test]
    fn rejects_future_schema_versions() {
        let (storage, guard) = storage_with_temp_dir(3);
        let mut books = Books::new("Future");
        books.schema_version = CURRENT_SCHEMA_VERSION + 1;
        let path = guard.path().join("future.json");
        fs::write(&path, serde_json::to_string(&books).unwrap()).unwrap();
        let err = load_books_from_path(&path).expect_err("future schema should fail");
        assert!(matches!(err, BooksError::Storage(ref m) if m.contains("newer")));
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn backup_timestamps_parse() {
        assert!(parse_backup_timestamp("acme_20240131_235959.json").is_some());
        assert!(parse_backup_timestamp("acme.json").is_none());
        assert!(parse_backup_timestamp("my_co_2024_1.json").is_none());
    }
}
