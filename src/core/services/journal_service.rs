//! Journal engine: validation, numbering and persistence of entries.
//!
//! Every write is fully validated before the dataset is touched; a rejected
//! entry leaves no partial state behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AccountMapping;
use crate::core::documents::DocumentSource;
use crate::core::errors::{BooksError, Result};
use crate::core::services::derivation::{self, DerivedEntry};
use crate::core::services::period_service::PeriodService;
use crate::domain::common::Displayable;
use crate::domain::entry::{EntryKind, EntrySource, JournalEntry, JournalLine};
use crate::domain::Books;
use crate::utils::money::{within, BALANCE_TOLERANCE};

/// Input for a manual entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub document_ref: Option<String>,
    pub lines: Vec<JournalLine>,
}

impl NewEntry {
    pub fn new(date: NaiveDate, description: impl Into<String>, lines: Vec<JournalLine>) -> Self {
        Self {
            date,
            description: description.into(),
            document_ref: None,
            lines,
        }
    }

    pub fn with_document_ref(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = Some(document_ref.into());
        self
    }
}

/// Partial update of a manual entry; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryPatch {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub document_ref: Option<Option<String>>,
    #[serde(default)]
    pub lines: Option<Vec<JournalLine>>,
}

/// Scope of an entry listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryFilter {
    pub period_id: Uuid,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

impl EntryFilter {
    pub fn period(period_id: Uuid) -> Self {
        Self {
            period_id,
            date_from: None,
            date_to: None,
        }
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        entry.period_id == self.period_id
            && self.date_from.map_or(true, |from| entry.date >= from)
            && self.date_to.map_or(true, |to| entry.date <= to)
    }
}

/// Validated writes against the journal.
#[derive(Debug, Clone, Copy)]
pub struct JournalService {
    tolerance: f64,
}

impl Default for JournalService {
    fn default() -> Self {
        Self {
            tolerance: BALANCE_TOLERANCE,
        }
    }
}

impl JournalService {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Validates and posts a manual entry, returning its id.
    pub fn create_manual(&self, books: &mut Books, entry: NewEntry) -> Result<Uuid> {
        self.post(
            books,
            EntryKind::Manual,
            entry.date,
            entry.description,
            entry.document_ref,
            entry.lines,
        )
    }

    /// Re-validates and replaces a manual entry.
    pub fn update_manual(&self, books: &mut Books, id: Uuid, patch: EntryPatch) -> Result<()> {
        let current = Self::find(books, id)?.clone();
        Self::ensure_manual(&current, "edited")?;
        if current.reversed_by.is_some() {
            return Err(BooksError::Conflict(format!(
                "Entry #{} has been reversed and cannot be edited",
                current.number
            )));
        }
        if current.reverses.is_some() {
            return Err(BooksError::Conflict(format!(
                "Entry #{} is a reversal and must mirror its original",
                current.number
            )));
        }
        Self::ensure_period_open(books, current.period_id)?;

        let date = patch.date.unwrap_or(current.date);
        let description = patch.description.unwrap_or_else(|| current.description.clone());
        let document_ref = patch
            .document_ref
            .unwrap_or_else(|| current.document_ref.clone());
        let lines = patch.lines.unwrap_or_else(|| current.lines.clone());

        let period = PeriodService::ensure_writable(books, date)?;
        let (period_id, year) = (period.id, period.year);
        let description = Self::validate_description(description)?;
        self.validate_lines(books, &lines)?;

        let number = if period_id == current.period_id {
            current.number
        } else {
            Self::next_number(books, period_id)
        };

        if let Some(entry) = books.entry_mut(id) {
            entry.date = date;
            entry.description = description;
            entry.document_ref = normalize_ref(document_ref);
            entry.lines = lines;
            entry.period_id = period_id;
            entry.number = number;
        }
        Self::record_number(books, period_id, number);
        books.touch();
        tracing::info!(entry = %id, number, year, "manual entry updated");
        Ok(())
    }

    /// Deletes a manual entry. Remaining entries keep their numbers.
    pub fn delete_manual(&self, books: &mut Books, id: Uuid) -> Result<JournalEntry> {
        let current = Self::find(books, id)?.clone();
        Self::ensure_manual(&current, "deleted")?;
        Self::ensure_period_open(books, current.period_id)?;
        Ok(Self::remove(books, current))
    }

    /// Posts the entry derived from an invoice; at most one per invoice.
    pub fn derive_from_invoice(
        &self,
        books: &mut Books,
        documents: &dyn DocumentSource,
        mapping: &AccountMapping,
        invoice_id: Uuid,
    ) -> Result<Uuid> {
        let invoice = documents
            .invoice(invoice_id)
            .ok_or_else(|| BooksError::NotFound(format!("invoice {invoice_id}")))?;
        let source = EntrySource::Invoice(invoice_id);
        Self::ensure_not_derived(books, source)?;
        if !invoice.state.is_postable() {
            return Err(BooksError::Validation(format!(
                "Invoice {} is {:?} and cannot be posted",
                invoice.number, invoice.state
            )));
        }
        let derived = derivation::invoice_entry(books, documents, mapping, &invoice)?;
        self.post_derived(books, source, derived)
    }

    /// Posts the entry derived from an expense; at most one per expense.
    pub fn derive_from_expense(
        &self,
        books: &mut Books,
        documents: &dyn DocumentSource,
        mapping: &AccountMapping,
        expense_id: Uuid,
    ) -> Result<Uuid> {
        let expense = documents
            .expense(expense_id)
            .ok_or_else(|| BooksError::NotFound(format!("expense {expense_id}")))?;
        let source = EntrySource::Expense(expense_id);
        Self::ensure_not_derived(books, source)?;
        let derived = derivation::expense_entry(books, documents, mapping, &expense)?;
        self.post_derived(books, source, derived)
    }

    /// Posts a counter-entry that cancels `id` and links both entries.
    pub fn reverse(&self, books: &mut Books, id: Uuid, date: NaiveDate) -> Result<Uuid> {
        let original = Self::find(books, id)?.clone();
        if original.reversed_by.is_some() {
            return Err(BooksError::Conflict(format!(
                "Entry #{} is already reversed",
                original.number
            )));
        }
        if original.reverses.is_some() {
            return Err(BooksError::Conflict(format!(
                "Entry #{} is itself a reversal",
                original.number
            )));
        }
        let lines = original
            .lines
            .iter()
            .map(|line| JournalLine {
                account_id: line.account_id,
                debit: line.credit,
                credit: line.debit,
                concept: line.concept.clone(),
            })
            .collect();
        let description = format!(
            "Anulación del asiento {}: {}",
            original.number, original.description
        );
        let reversal = self.post(
            books,
            EntryKind::Manual,
            date,
            description,
            original.document_ref.clone(),
            lines,
        )?;
        if let Some(entry) = books.entry_mut(reversal) {
            entry.reverses = Some(id);
        }
        if let Some(entry) = books.entry_mut(id) {
            entry.reversed_by = Some(reversal);
        }
        tracing::info!(entry = %id, reversal = %reversal, "entry reversed");
        Ok(reversal)
    }

    /// Removes the entry derived from a source document that is being deleted.
    ///
    /// Used by the invoice and expense stores. A reversal of the derived entry
    /// goes with it; both periods must be open.
    pub fn release_derived(&self, books: &mut Books, source: EntrySource) -> Result<JournalEntry> {
        let entry = books
            .entry_for_source(source)
            .cloned()
            .ok_or_else(|| BooksError::NotFound(format!("derived entry for {source:?}")))?;
        Self::ensure_period_open(books, entry.period_id)?;
        let reversal = match entry.reversed_by {
            Some(id) => Some(Self::find(books, id)?.clone()),
            None => None,
        };
        if let Some(reversal) = &reversal {
            Self::ensure_period_open(books, reversal.period_id)?;
        }
        if let Some(reversal) = reversal {
            Self::remove(books, reversal);
        }
        Ok(Self::remove(books, entry))
    }

    /// Entries in scope ordered by `(date, number)`.
    pub fn list<'a>(books: &'a Books, filter: &EntryFilter) -> Vec<&'a JournalEntry> {
        let mut entries: Vec<&JournalEntry> = books
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .collect();
        entries.sort_by(|a, b| (a.date, a.number).cmp(&(b.date, b.number)));
        entries
    }

    pub fn find(books: &Books, id: Uuid) -> Result<&JournalEntry> {
        books
            .entry(id)
            .ok_or_else(|| BooksError::NotFound(format!("journal entry {id}")))
    }

    fn post_derived(&self, books: &mut Books, source: EntrySource, derived: DerivedEntry) -> Result<Uuid> {
        tracing::debug!(
            source = ?source,
            debit = derived.total_debit(),
            credit = derived.total_credit(),
            "derived entry built"
        );
        self.post(
            books,
            source.kind(),
            derived.date,
            derived.description,
            derived.document_ref,
            derived.lines,
        )
    }

    fn post(
        &self,
        books: &mut Books,
        kind: EntryKind,
        date: NaiveDate,
        description: String,
        document_ref: Option<String>,
        lines: Vec<JournalLine>,
    ) -> Result<Uuid> {
        let period = PeriodService::ensure_writable(books, date)?;
        let (period_id, year) = (period.id, period.year);
        let description = Self::validate_description(description)?;
        self.validate_lines(books, &lines)?;

        let number = Self::next_number(books, period_id);
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            number,
            date,
            description,
            kind,
            document_ref: normalize_ref(document_ref),
            period_id,
            lines,
            reverses: None,
            reversed_by: None,
        };
        let id = entry.id;
        books.entries.push(entry);
        Self::record_number(books, period_id, number);
        books.touch();
        tracing::info!(entry = %id, number, year, kind = kind.label(), "journal entry posted");
        Ok(id)
    }

    fn validate_description(description: String) -> Result<String> {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            Err(BooksError::Validation(
                "Entry description cannot be empty".into(),
            ))
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// Rejects empty entries, bad amounts, unknown or inactive accounts and
    /// debit/credit totals further apart than the tolerance.
    fn validate_lines(&self, books: &Books, lines: &[JournalLine]) -> Result<()> {
        if lines.is_empty() {
            return Err(BooksError::Validation(
                "Entry must have at least one line".into(),
            ));
        }
        let mut debit = 0.0;
        let mut credit = 0.0;
        for (index, line) in lines.iter().enumerate() {
            let position = index + 1;
            let account = books.account(line.account_id).ok_or_else(|| {
                BooksError::Validation(format!("Line {position}: account does not exist"))
            })?;
            if !account.is_active {
                return Err(BooksError::Validation(format!(
                    "Line {position}: account `{}` is inactive",
                    account.code
                )));
            }
            if !line.debit.is_finite() || !line.credit.is_finite() {
                return Err(BooksError::Validation(format!(
                    "Line {position}: amounts must be finite"
                )));
            }
            if line.debit < 0.0 || line.credit < 0.0 {
                return Err(BooksError::Validation(format!(
                    "Line {position}: amounts cannot be negative"
                )));
            }
            if line.debit == 0.0 && line.credit == 0.0 {
                return Err(BooksError::Validation(format!(
                    "Line {position}: debit or credit is required"
                )));
            }
            debit += line.debit;
            credit += line.credit;
        }
        if !within(debit, credit, self.tolerance) {
            tracing::warn!(debit, credit, "unbalanced entry rejected");
            return Err(BooksError::Unbalanced { debit, credit });
        }
        Ok(())
    }

    /// Next correlative number; numbers freed by deletion are never reused.
    fn next_number(books: &Books, period_id: Uuid) -> u32 {
        let high_water = books.period(period_id).map_or(0, |p| p.last_entry_number);
        let max_existing = books
            .entries_in_period(period_id)
            .map(|entry| entry.number)
            .max()
            .unwrap_or(0);
        high_water.max(max_existing) + 1
    }

    fn record_number(books: &mut Books, period_id: Uuid, number: u32) {
        if let Some(period) = books.period_mut(period_id) {
            period.last_entry_number = period.last_entry_number.max(number);
        }
    }

    fn ensure_manual(entry: &JournalEntry, action: &str) -> Result<()> {
        match entry.kind {
            EntryKind::Manual => Ok(()),
            EntryKind::InvoiceDerived(invoice) => Err(BooksError::Conflict(format!(
                "Entry #{} was derived from invoice {invoice} and cannot be {action} directly",
                entry.number
            ))),
            EntryKind::ExpenseDerived(expense) => Err(BooksError::Conflict(format!(
                "Entry #{} was derived from expense {expense} and cannot be {action} directly",
                entry.number
            ))),
        }
    }

    fn ensure_not_derived(books: &Books, source: EntrySource) -> Result<()> {
        match books.entry_for_source(source) {
            Some(existing) => Err(BooksError::Conflict(format!(
                "Source document already posted as entry #{}",
                existing.number
            ))),
            None => Ok(()),
        }
    }

    fn ensure_period_open(books: &Books, period_id: Uuid) -> Result<()> {
        let period = PeriodService::find(books, period_id)?;
        if period.is_open() {
            Ok(())
        } else {
            Err(BooksError::PeriodClosed { year: period.year })
        }
    }

    fn remove(books: &mut Books, entry: JournalEntry) -> JournalEntry {
        books.entries.retain(|candidate| candidate.id != entry.id);
        for other in books.entries.iter_mut() {
            if other.reversed_by == Some(entry.id) {
                other.reversed_by = None;
            }
            if other.reverses == Some(entry.id) {
                other.reverses = None;
            }
        }
        books.touch();
        tracing::info!(entry = %entry.display_label(), kind = entry.kind.label(), "journal entry removed");
        entry
    }
}

fn normalize_ref(document_ref: Option<String>) -> Option<String> {
    document_ref
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
