use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    account::Account,
    common::{find_by_id, find_by_id_mut},
    entry::{EntrySource, JournalEntry},
    period::FiscalPeriod,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// The bookkeeping dataset of one company: chart, fiscal periods and journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Books {
    pub id: Uuid,
    pub company: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub periods: Vec<FiscalPeriod>,
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Books::schema_version_default")]
    pub schema_version: u8,
}

impl Books {
    pub fn new(company: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company: company.into(),
            accounts: Vec::new(),
            periods: Vec::new(),
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        find_by_id(&self.accounts, id)
    }

    pub fn account_mut(&mut self, id: Uuid) -> Option<&mut Account> {
        find_by_id_mut(&mut self.accounts, id)
    }

    pub fn account_by_code(&self, code: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.code == code)
    }

    pub fn period(&self, id: Uuid) -> Option<&FiscalPeriod> {
        find_by_id(&self.periods, id)
    }

    pub fn period_mut(&mut self, id: Uuid) -> Option<&mut FiscalPeriod> {
        find_by_id_mut(&mut self.periods, id)
    }

    pub fn period_for_year(&self, year: i32) -> Option<&FiscalPeriod> {
        self.periods.iter().find(|period| period.year == year)
    }

    pub fn entry(&self, id: Uuid) -> Option<&JournalEntry> {
        find_by_id(&self.entries, id)
    }

    pub fn entry_mut(&mut self, id: Uuid) -> Option<&mut JournalEntry> {
        find_by_id_mut(&mut self.entries, id)
    }

    pub fn entry_for_source(&self, source: EntrySource) -> Option<&JournalEntry> {
        self.entries
            .iter()
            .find(|entry| entry.kind.source() == Some(source))
    }

    pub fn entries_in_period(&self, period_id: Uuid) -> impl Iterator<Item = &JournalEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.period_id == period_id)
    }

    /// Whether any journal line posts to the account.
    pub fn is_account_referenced(&self, account_id: Uuid) -> bool {
        self.entries.iter().any(|entry| entry.touches(account_id))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
