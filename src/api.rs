//! Request/response surface for frontends.
//!
//! Every call returns an [`ApiResponse`]; amounts are rounded half-up to cents
//! here and nowhere earlier.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BooksConfig;
use crate::core::books_manager::BooksManager;
use crate::core::documents::DocumentSource;
use crate::core::errors::{BooksError, Result};
use crate::core::services::{
    ChartService, DiaryRow, EntryFilter, EntryPatch, JournalService, LedgerService, LedgerView,
    NewEntry, PeriodService, TaxService, TrialBalance, VatAnnual, VatQuarterly,
    WithholdingQuarterly,
};
use crate::domain::{
    Account, AccountDraft, AccountPatch, Books, EntrySource, FiscalPeriod, JournalEntry, TaxBucket,
};
use crate::utils::build_info::BuildMetadata;
use crate::utils::money::round2;

/// Uniform envelope returned by every operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: &BooksError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.data, self.error) {
            (Some(data), None) if self.success => Ok(data),
            (_, error) => Err(error.unwrap_or_else(|| "missing response data".into())),
        }
    }
}

impl<T> From<Result<T>> for ApiResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "request failed");
                Self::err(&err)
            }
        }
    }
}

/// Rounds every amount to two decimals for presentation.
pub trait Rounded {
    fn rounded(self) -> Self;
}

impl<T: Rounded> Rounded for Vec<T> {
    fn rounded(self) -> Self {
        self.into_iter().map(Rounded::rounded).collect()
    }
}

impl Rounded for JournalEntry {
    fn rounded(mut self) -> Self {
        for line in &mut self.lines {
            line.debit = round2(line.debit);
            line.credit = round2(line.credit);
        }
        self
    }
}

impl Rounded for DiaryRow {
    fn rounded(mut self) -> Self {
        self.debit = round2(self.debit);
        self.credit = round2(self.credit);
        self
    }
}

impl Rounded for LedgerView {
    fn rounded(mut self) -> Self {
        for movement in &mut self.movements {
            movement.debit = round2(movement.debit);
            movement.credit = round2(movement.credit);
            movement.balance = round2(movement.balance);
        }
        self.total_debit = round2(self.total_debit);
        self.total_credit = round2(self.total_credit);
        self.closing_balance = round2(self.closing_balance);
        self
    }
}

impl Rounded for TrialBalance {
    fn rounded(mut self) -> Self {
        for row in &mut self.rows {
            row.total_debit = round2(row.total_debit);
            row.total_credit = round2(row.total_credit);
            row.balance = round2(row.balance);
        }
        self.total_debit = round2(self.total_debit);
        self.total_credit = round2(self.total_credit);
        self
    }
}

impl Rounded for TaxBucket {
    fn rounded(mut self) -> Self {
        self.base = round2(self.base);
        self.amount = round2(self.amount);
        self
    }
}

impl Rounded for VatQuarterly {
    fn rounded(mut self) -> Self {
        self.charged = self.charged.rounded();
        self.paid = self.paid.rounded();
        self.vat_charged = round2(self.vat_charged);
        self.vat_paid = round2(self.vat_paid);
        self.result = round2(self.result);
        self
    }
}

impl Rounded for WithholdingQuarterly {
    fn rounded(mut self) -> Self {
        self.total_base = round2(self.total_base);
        self.total_withheld = round2(self.total_withheld);
        self
    }
}

impl Rounded for VatAnnual {
    fn rounded(mut self) -> Self {
        self.quarters = self.quarters.rounded();
        self.charged = self.charged.rounded();
        self.paid = self.paid.rounded();
        self.vat_charged = round2(self.vat_charged);
        self.vat_paid = round2(self.vat_paid);
        self.result = round2(self.result);
        self
    }
}

fn respond<T>(result: Result<T>) -> ApiResponse<T> {
    result.into()
}

fn respond_rounded<T: Rounded>(result: Result<T>) -> ApiResponse<T> {
    result.map(Rounded::rounded).into()
}

fn account_snapshot(books: &Books, id: Uuid) -> Result<Account> {
    books
        .account(id)
        .cloned()
        .ok_or_else(|| BooksError::NotFound(format!("account {id}")))
}

fn entry_snapshot(books: &Books, id: Uuid) -> Result<JournalEntry> {
    JournalService::find(books, id).cloned()
}

/// Operations over one company's books, backed by an external document source.
pub struct BooksApi<D> {
    manager: BooksManager,
    documents: D,
    config: BooksConfig,
    journal: JournalService,
}

impl<D: DocumentSource> BooksApi<D> {
    pub fn new(manager: BooksManager, documents: D, config: BooksConfig) -> Result<Self> {
        config.validate()?;
        let journal = JournalService::with_tolerance(config.balance_tolerance);
        Ok(Self {
            manager,
            documents,
            config,
            journal,
        })
    }

    /// Ephemeral books with default configuration.
    pub fn in_memory(company: &str, documents: D) -> Self {
        Self {
            manager: BooksManager::in_memory(company),
            documents,
            config: BooksConfig::default(),
            journal: JournalService::default(),
        }
    }

    pub fn manager(&self) -> &BooksManager {
        &self.manager
    }

    pub fn books(&self) -> &Books {
        self.manager.books()
    }

    pub fn config(&self) -> &BooksConfig {
        &self.config
    }

    pub fn about(&self) -> ApiResponse<BuildMetadata> {
        ApiResponse::ok(BuildMetadata::current())
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut D {
        &mut self.documents
    }

    // Accounts

    pub fn accounts_create(&mut self, draft: AccountDraft) -> ApiResponse<Account> {
        respond(self.manager.transact(|books| {
            let id = ChartService::create(books, draft)?;
            account_snapshot(books, id)
        }))
    }

    /// Allowed keys on a system account persist even when structural keys in
    /// the same patch are reported as an error.
    pub fn accounts_update(&mut self, id: Uuid, patch: AccountPatch) -> ApiResponse<Account> {
        let outcome = self.manager.transact(|books| {
            let is_system = books.account(id).map_or(false, |account| account.is_system);
            match ChartService::update(books, id, patch) {
                Ok(()) => Ok(account_snapshot(books, id)),
                Err(err) if is_system => Ok(Err(err)),
                Err(err) => Err(err),
            }
        });
        respond(outcome.and_then(|inner| inner))
    }

    pub fn accounts_delete(&mut self, id: Uuid) -> ApiResponse<()> {
        respond(self.manager.transact(|books| ChartService::delete(books, id)))
    }

    pub fn accounts_list(&self) -> ApiResponse<Vec<Account>> {
        let accounts = ChartService::list(self.books()).into_iter().cloned().collect();
        ApiResponse::ok(accounts)
    }

    pub fn accounts_seed_standard(&mut self) -> ApiResponse<usize> {
        respond(
            self.manager
                .transact(|books| Ok(ChartService::seed_standard_chart(books))),
        )
    }

    // Fiscal periods

    pub fn periods_get_or_create_current(&mut self) -> ApiResponse<FiscalPeriod> {
        self.periods_get_or_create_at(Local::now().date_naive())
    }

    pub fn periods_get_or_create_at(&mut self, today: NaiveDate) -> ApiResponse<FiscalPeriod> {
        if let Some(period) = self.books().period_for_year(today.year()) {
            return ApiResponse::ok(period.clone());
        }
        respond(
            self.manager
                .transact(|books| Ok(PeriodService::get_or_create_current(books, today))),
        )
    }

    pub fn periods_list(&self) -> ApiResponse<Vec<FiscalPeriod>> {
        ApiResponse::ok(PeriodService::list(self.books()).into_iter().cloned().collect())
    }

    pub fn periods_close(&mut self, id: Uuid) -> ApiResponse<FiscalPeriod> {
        respond(self.manager.transact(|books| PeriodService::close(books, id)))
    }

    pub fn periods_reopen(&mut self, id: Uuid) -> ApiResponse<FiscalPeriod> {
        respond(self.manager.transact(|books| PeriodService::reopen(books, id)))
    }

    // Journal entries

    pub fn entries_create(&mut self, entry: NewEntry) -> ApiResponse<JournalEntry> {
        let journal = self.journal;
        respond_rounded(self.manager.transact(|books| {
            let id = journal.create_manual(books, entry)?;
            entry_snapshot(books, id)
        }))
    }

    pub fn entries_update(&mut self, id: Uuid, patch: EntryPatch) -> ApiResponse<JournalEntry> {
        let journal = self.journal;
        respond_rounded(self.manager.transact(|books| {
            journal.update_manual(books, id, patch)?;
            entry_snapshot(books, id)
        }))
    }

    pub fn entries_delete(&mut self, id: Uuid) -> ApiResponse<()> {
        let journal = self.journal;
        respond(
            self.manager
                .transact(|books| journal.delete_manual(books, id).map(|_| ())),
        )
    }

    pub fn entries_list(&self, filter: EntryFilter) -> ApiResponse<Vec<JournalEntry>> {
        let entries: Vec<JournalEntry> = JournalService::list(self.books(), &filter)
            .into_iter()
            .cloned()
            .collect();
        ApiResponse::ok(entries.rounded())
    }

    pub fn entries_derive_from_invoice(&mut self, invoice_id: Uuid) -> ApiResponse<JournalEntry> {
        let journal = self.journal;
        let documents = &self.documents;
        let mapping = &self.config.accounts;
        respond_rounded(self.manager.transact(|books| {
            let id = journal.derive_from_invoice(books, documents, mapping, invoice_id)?;
            entry_snapshot(books, id)
        }))
    }

    pub fn entries_derive_from_expense(&mut self, expense_id: Uuid) -> ApiResponse<JournalEntry> {
        let journal = self.journal;
        let documents = &self.documents;
        let mapping = &self.config.accounts;
        respond_rounded(self.manager.transact(|books| {
            let id = journal.derive_from_expense(books, documents, mapping, expense_id)?;
            entry_snapshot(books, id)
        }))
    }

    pub fn entries_reverse(&mut self, id: Uuid, date: NaiveDate) -> ApiResponse<JournalEntry> {
        let journal = self.journal;
        respond_rounded(self.manager.transact(|books| {
            let reversal = journal.reverse(books, id, date)?;
            entry_snapshot(books, reversal)
        }))
    }

    /// Removes the derived entry of a deleted source document.
    pub fn release_derived(&mut self, source: EntrySource) -> Result<JournalEntry> {
        let journal = self.journal;
        self.manager
            .transact(|books| journal.release_derived(books, source))
    }

    // Ledger projections

    pub fn ledger_diary(&self, filter: EntryFilter) -> ApiResponse<Vec<DiaryRow>> {
        ApiResponse::ok(LedgerService::journal(self.books(), &filter).rounded())
    }

    pub fn ledger_mayor(&self, account_id: Uuid, filter: EntryFilter) -> ApiResponse<LedgerView> {
        respond_rounded(LedgerService::ledger(
            self.books(),
            account_id,
            filter.period_id,
            filter.date_from,
            filter.date_to,
        ))
    }

    pub fn ledger_trial_balance(&self, period_id: Uuid) -> ApiResponse<TrialBalance> {
        ApiResponse::ok(LedgerService::trial_balance(self.books(), period_id).rounded())
    }

    // Tax models

    pub fn tax_models_vat303(&self, period_id: Uuid, quarter: u8) -> ApiResponse<VatQuarterly> {
        respond_rounded(TaxService::vat_quarterly(
            self.books(),
            &self.documents,
            period_id,
            quarter,
        ))
    }

    pub fn tax_models_withholding111(
        &self,
        period_id: Uuid,
        quarter: u8,
    ) -> ApiResponse<WithholdingQuarterly> {
        respond_rounded(TaxService::withholding_quarterly(
            self.books(),
            &self.documents,
            period_id,
            quarter,
        ))
    }

    pub fn tax_models_vat_annual390(&self, period_id: Uuid) -> ApiResponse<VatAnnual> {
        respond_rounded(TaxService::vat_annual(self.books(), &self.documents, period_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::documents::DocumentStore;
    use crate::domain::{AccountType, JournalLine};

    fn api() -> BooksApi<DocumentStore> {
        let mut api = BooksApi::in_memory("Acme", DocumentStore::new());
        assert!(api.accounts_seed_standard().success);
        api
    }

    #[test]
    fn response_envelope_serializes_without_empty_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(3)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": 3}));
        let err: ApiResponse<u8> = ApiResponse::err(&BooksError::NotFound("entry".into()));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Not found: entry");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn system_account_update_keeps_allowed_keys() {
        let mut api = api();
        let id = api.books().account_by_code("572").unwrap().id;
        let patch = AccountPatch {
            code: Some("5720".into()),
            name: Some("Banco principal".into()),
            ..AccountPatch::default()
        };
        let response = api.accounts_update(id, patch);
        assert!(!response.success);
        let account = api.books().account(id).unwrap();
        assert_eq!(account.code, "572");
        assert_eq!(account.name, "Banco principal");
        assert!(api.manager().storage().exists("Acme"));
    }

    #[test]
    fn user_account_errors_do_not_persist() {
        let mut api = api();
        let created = api
            .accounts_create(AccountDraft::new("4300001", "Cliente Uno", AccountType::Asset, 4))
            .into_result()
            .unwrap();
        let duplicate = AccountPatch {
            code: Some("430".into()),
            name: Some("Renamed".into()),
            ..AccountPatch::default()
        };
        assert!(!api.accounts_update(created.id, duplicate).success);
        assert_eq!(api.books().account(created.id).unwrap().name, "Cliente Uno");
    }

    #[test]
    fn entries_are_rounded_at_the_boundary() {
        let mut api = api();
        api.periods_get_or_create_at(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let bank = api.books().account_by_code("572").unwrap().id;
        let capital = api.books().account_by_code("100").unwrap().id;
        let entry = NewEntry::new(
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            "Aportación",
            vec![
                JournalLine::debit(bank, 10.005),
                JournalLine::credit(capital, 10.005),
            ],
        );
        let created = api.entries_create(entry).into_result().unwrap();
        assert_eq!(created.lines[0].debit, 10.01);
        assert_eq!(api.books().entries[0].lines[0].debit, 10.005);
    }

    #[test]
    fn failed_write_reports_error_text() {
        let mut api = api();
        let response = api.entries_delete(Uuid::new_v4());
        assert!(!response.success);
        assert!(response.error.unwrap().starts_with("Not found"));
    }
}
