#![allow(dead_code)]

use std::sync::Mutex;

use books_core::{
    config::ConfigManager,
    core::{books_manager::BooksManager, services::ChartService},
    domain::{Books, TaxKind, TaxRate},
    storage::JsonStorage,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates an isolated manager and config manager backed by a unique directory.
pub fn setup_test_env(company: &str) -> (BooksManager, ConfigManager, JsonStorage) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let storage = JsonStorage::new(Some(base.clone()), Some(3)).expect("create json storage backend");
    let manager = BooksManager::open(Box::new(storage.clone()), company).expect("open books");
    let config_manager = ConfigManager::with_base_dir(base).expect("create config manager for temp dir");
    (manager, config_manager, storage)
}

/// Books with the standard chart and an open 2024 period.
pub fn seeded_books() -> Books {
    let mut books = Books::new("Integration");
    ChartService::seed_standard_chart(&mut books);
    books_core::core::services::PeriodService::get_or_create(&mut books, 2024);
    books
}

pub fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

pub fn account(books: &Books, code: &str) -> Uuid {
    books
        .account_by_code(code)
        .unwrap_or_else(|| panic!("account {code} seeded"))
        .id
}

pub struct Rates {
    pub vat21: TaxRate,
    pub vat10: TaxRate,
    pub irpf15: TaxRate,
}

pub fn rates() -> Rates {
    Rates {
        vat21: TaxRate::new("IVA 21%", 21.0, TaxKind::Vat).as_default(),
        vat10: TaxRate::new("IVA 10%", 10.0, TaxKind::Vat),
        irpf15: TaxRate::new("IRPF 15%", 15.0, TaxKind::Withholding),
    }
}
