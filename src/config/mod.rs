//! Company-level settings: currency, balance tolerance and the account codes
//! used when deriving journal entries from invoices and expenses.

use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{
    errors::{BooksError, Result},
    utils::{ensure_dir, write_atomic, PathResolver},
};
use crate::utils::money::BALANCE_TOLERANCE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BooksConfig {
    pub company_name: String,
    pub currency: String,
    #[serde(default = "BooksConfig::default_tolerance")]
    pub balance_tolerance: f64,
    #[serde(default)]
    pub accounts: AccountMapping,
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            company_name: "default".into(),
            currency: "EUR".into(),
            balance_tolerance: BALANCE_TOLERANCE,
            accounts: AccountMapping::default(),
        }
    }
}

impl BooksConfig {
    fn default_tolerance() -> f64 {
        BALANCE_TOLERANCE
    }

    pub fn validate(&self) -> Result<()> {
        if !self.balance_tolerance.is_finite() || self.balance_tolerance < 0.0 {
            return Err(BooksError::Config(format!(
                "balance tolerance must be a non-negative amount, got {}",
                self.balance_tolerance
            )));
        }
        for (role, code) in self.accounts.entries() {
            if code.trim().is_empty() {
                return Err(BooksError::Config(format!(
                    "account mapping `{role}` is empty"
                )));
            }
        }
        Ok(())
    }
}

/// Account codes the derivation rules post to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountMapping {
    pub receivables: String,
    pub revenue: String,
    pub vat_output: String,
    pub withholding_receivable: String,
    pub vat_input: String,
    pub suppliers: String,
    pub cash: String,
    pub bank: String,
    pub generic_expense: String,
}

impl Default for AccountMapping {
    fn default() -> Self {
        Self {
            receivables: "430".into(),
            revenue: "705".into(),
            vat_output: "477".into(),
            withholding_receivable: "473".into(),
            vat_input: "472".into(),
            suppliers: "400".into(),
            cash: "570".into(),
            bank: "572".into(),
            generic_expense: "629".into(),
        }
    }
}

impl AccountMapping {
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("receivables", &self.receivables),
            ("revenue", &self.revenue),
            ("vat_output", &self.vat_output),
            ("withholding_receivable", &self.withholding_receivable),
            ("vat_input", &self.vat_input),
            ("suppliers", &self.suppliers),
            ("cash", &self.cash),
            ("bank", &self.bank),
            ("generic_expense", &self.generic_expense),
        ]
    }
}

/// Loads and stores [`BooksConfig`] as JSON under the data directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the stored configuration, or defaults when none was saved yet.
    pub fn load(&self) -> Result<BooksConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(BooksConfig::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: BooksConfig = serde_json::from_str(&data)
            .map_err(|err| BooksError::Config(format!("{}: {err}", self.path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &BooksConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        tracing::info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}
