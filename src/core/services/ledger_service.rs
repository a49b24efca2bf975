//! Read-side projections of the journal: Libro Diario, Libro Mayor and the
//! trial balance. Nothing here mutates the books.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::{BooksError, Result};
use crate::core::services::journal_service::{EntryFilter, JournalService};
use crate::domain::account::Account;
use crate::domain::{Books, DateRange, FiscalPeriod};

/// One journal line flattened for the diary listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiaryRow {
    pub entry_id: Uuid,
    pub entry_number: u32,
    pub date: NaiveDate,
    pub entry_description: String,
    pub document_ref: Option<String>,
    pub kind: String,
    pub line_index: usize,
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub debit: f64,
    pub credit: f64,
    /// Line concept, or the entry description when the line has none.
    pub concept: String,
    /// Set on the first line of each entry; rendering aid only.
    pub is_first_of_group: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerMovement {
    pub entry_id: Uuid,
    pub entry_number: u32,
    pub date: NaiveDate,
    pub concept: String,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

/// Libro Mayor of one account over a window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerView {
    pub account: Account,
    /// Dates covered; `None` when the period does not exist.
    pub window: Option<DateRange>,
    pub movements: Vec<LedgerMovement>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub closing_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialBalanceRow {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub total_debit: f64,
    pub total_credit: f64,
    pub balance: f64,
}

/// Balance de sumas y saldos for a fiscal period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialBalance {
    pub period_id: Uuid,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: f64,
    pub total_credit: f64,
}

impl TrialBalance {
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        (self.total_debit - self.total_credit).abs() <= tolerance
    }
}

pub struct LedgerService;

impl LedgerService {
    /// Libro Diario: every line in scope ordered by `(date, number, line_index)`.
    pub fn journal(books: &Books, filter: &EntryFilter) -> Vec<DiaryRow> {
        let entries = JournalService::list(books, filter);
        let mut rows = Vec::new();
        for entry in entries {
            for (line_index, line) in entry.lines.iter().enumerate() {
                let (account_code, account_name) = books
                    .account(line.account_id)
                    .map(|account| (account.code.clone(), account.name.clone()))
                    .unwrap_or_default();
                rows.push(DiaryRow {
                    entry_id: entry.id,
                    entry_number: entry.number,
                    date: entry.date,
                    entry_description: entry.description.clone(),
                    document_ref: entry.document_ref.clone(),
                    kind: entry.kind.label().to_string(),
                    line_index,
                    account_id: line.account_id,
                    account_code,
                    account_name,
                    debit: line.debit,
                    credit: line.credit,
                    concept: entry.concept_of(line).to_string(),
                    is_first_of_group: line_index == 0,
                });
            }
        }
        tracing::debug!(period = %filter.period_id, rows = rows.len(), "diary projected");
        rows
    }

    /// Libro Mayor for one account. The running balance starts at zero at the
    /// beginning of the window; no opening balance is carried in.
    pub fn ledger(
        books: &Books,
        account_id: Uuid,
        period_id: Uuid,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<LedgerView> {
        let account = books
            .account(account_id)
            .cloned()
            .ok_or_else(|| BooksError::NotFound(format!("account {account_id}")))?;
        let window = books
            .period(period_id)
            .and_then(FiscalPeriod::range)
            .map(|year| year.clamp(date_from, date_to));
        let in_window = |date: NaiveDate| window.map_or(false, |range| range.contains(date));

        let mut movements = Vec::new();
        let mut balance = 0.0;
        let mut total_debit = 0.0;
        let mut total_credit = 0.0;
        let entries = JournalService::list(books, &EntryFilter::period(period_id));
        for entry in entries.into_iter().filter(|entry| in_window(entry.date)) {
            for line in entry.lines.iter().filter(|line| line.account_id == account_id) {
                balance += line.debit - line.credit;
                total_debit += line.debit;
                total_credit += line.credit;
                movements.push(LedgerMovement {
                    entry_id: entry.id,
                    entry_number: entry.number,
                    date: entry.date,
                    concept: entry.concept_of(line).to_string(),
                    debit: line.debit,
                    credit: line.credit,
                    balance,
                });
            }
        }
        tracing::debug!(account = %account.code, movements = movements.len(), "ledger projected");
        Ok(LedgerView {
            account,
            window,
            movements,
            total_debit,
            total_credit,
            closing_balance: balance,
        })
    }

    /// Debit and credit sums per account with movements in the period, by code.
    pub fn trial_balance(books: &Books, period_id: Uuid) -> TrialBalance {
        let mut rows: Vec<TrialBalanceRow> = Vec::new();
        for entry in books.entries_in_period(period_id) {
            for line in &entry.lines {
                let position = rows.iter().position(|row| row.account_id == line.account_id);
                let row = match position {
                    Some(index) => &mut rows[index],
                    None => {
                        let (code, name) = books
                            .account(line.account_id)
                            .map(|account| (account.code.clone(), account.name.clone()))
                            .unwrap_or_default();
                        rows.push(TrialBalanceRow {
                            account_id: line.account_id,
                            code,
                            name,
                            total_debit: 0.0,
                            total_credit: 0.0,
                            balance: 0.0,
                        });
                        let last = rows.len() - 1;
                        &mut rows[last]
                    }
                };
                row.total_debit += line.debit;
                row.total_credit += line.credit;
                row.balance = row.total_debit - row.total_credit;
            }
        }
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        let total_debit = rows.iter().map(|row| row.total_debit).sum();
        let total_credit = rows.iter().map(|row| row.total_credit).sum();
        tracing::debug!(period = %period_id, accounts = rows.len(), "trial balance projected");
        TrialBalance {
            period_id,
            rows,
            total_debit,
            total_credit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::chart_service::ChartService;
    use crate::core::services::journal_service::NewEntry;
    use crate::core::services::period_service::PeriodService;
    use crate::domain::entry::JournalLine;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn setup() -> (Books, Uuid) {
        let mut books = Books::new("Ledger");
        ChartService::seed_standard_chart(&mut books);
        let period = PeriodService::get_or_create(&mut books, 2024);
        (books, period.id)
    }

    fn code(books: &Books, code: &str) -> Uuid {
        books.account_by_code(code).unwrap().id
    }

    fn post(books: &mut Books, day: NaiveDate, lines: Vec<JournalLine>) -> Uuid {
        JournalService::default()
            .create_manual(books, NewEntry::new(day, "Movimiento", lines))
            .unwrap()
    }

    #[test]
    fn ledger_replays_running_balance() {
        let (mut books, period) = setup();
        let bank = code(&books, "572");
        let capital = code(&books, "100");
        let supplies = code(&books, "628");
        post(&mut books, date(1, 10), vec![JournalLine::debit(bank, 100.0), JournalLine::credit(capital, 100.0)]);
        post(&mut books, date(2, 10), vec![JournalLine::debit(supplies, 30.0), JournalLine::credit(bank, 30.0)]);
        post(&mut books, date(3, 10), vec![JournalLine::debit(bank, 50.0), JournalLine::credit(capital, 50.0)]);

        let view = LedgerService::ledger(&books, bank, period, None, None).unwrap();
        let balances: Vec<f64> = view.movements.iter().map(|m| m.balance).collect();
        assert_eq!(balances, vec![100.0, 70.0, 120.0]);
        assert_eq!(view.total_debit, 150.0);
        assert_eq!(view.total_credit, 30.0);
        assert_eq!(view.closing_balance, 120.0);
    }

    #[test]
    fn windowed_ledger_starts_from_zero() {
        let (mut books, period) = setup();
        let bank = code(&books, "572");
        let capital = code(&books, "100");
        let supplies = code(&books, "628");
        post(&mut books, date(1, 10), vec![JournalLine::debit(bank, 100.0), JournalLine::credit(capital, 100.0)]);
        post(&mut books, date(2, 10), vec![JournalLine::debit(supplies, 30.0), JournalLine::credit(bank, 30.0)]);

        let view = LedgerService::ledger(&books, bank, period, Some(date(2, 1)), None).unwrap();
        assert_eq!(view.movements.len(), 1);
        assert_eq!(view.closing_balance, -30.0);
        let window = view.window.unwrap();
        assert_eq!((window.start, window.end), (date(2, 1), date(12, 31)));
    }

    #[test]
    fn ledger_for_unknown_account_is_not_found() {
        let (books, period) = setup();
        assert!(matches!(
            LedgerService::ledger(&books, Uuid::new_v4(), period, None, None),
            Err(BooksError::NotFound(_))
        ));
    }

    #[test]
    fn empty_period_projects_empty_views() {
        let (books, period) = setup();
        assert!(LedgerService::journal(&books, &EntryFilter::period(period)).is_empty());
        let view = LedgerService::ledger(&books, code(&books, "572"), period, None, None).unwrap();
        assert!(view.movements.is_empty());
        assert_eq!(view.closing_balance, 0.0);
        let trial = LedgerService::trial_balance(&books, period);
        assert!(trial.rows.is_empty());
        assert!(trial.is_balanced(0.01));
    }

    #[test]
    fn diary_flattens_lines_in_order_and_marks_groups() {
        let (mut books, period) = setup();
        let bank = code(&books, "572");
        let capital = code(&books, "100");
        let supplies = code(&books, "628");
        let vat = code(&books, "472");
        post(
            &mut books,
            date(3, 1),
            vec![
                JournalLine::debit(supplies, 100.0).with_concept("Luz marzo"),
                JournalLine::debit(vat, 21.0),
                JournalLine::credit(bank, 121.0),
            ],
        );
        post(&mut books, date(1, 5), vec![JournalLine::debit(bank, 500.0), JournalLine::credit(capital, 500.0)]);

        let rows = LedgerService::journal(&books, &EntryFilter::period(period));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].date, date(1, 5));
        assert!(rows[0].is_first_of_group);
        assert!(!rows[1].is_first_of_group);
        assert!(rows[2].is_first_of_group);
        assert_eq!(rows[2].concept, "Luz marzo");
        assert_eq!(rows[3].concept, "Movimiento");
        assert_eq!(rows[3].account_code, "472");
        let indexes: Vec<usize> = rows[2..].iter().map(|row| row.line_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn trial_balance_sums_per_account() {
        let (mut books, period) = setup();
        let bank = code(&books, "572");
        let capital = code(&books, "100");
        let supplies = code(&books, "628");
        post(&mut books, date(1, 10), vec![JournalLine::debit(bank, 1000.0), JournalLine::credit(capital, 1000.0)]);
        post(&mut books, date(1, 20), vec![JournalLine::debit(supplies, 80.0), JournalLine::credit(bank, 80.0)]);

        let trial = LedgerService::trial_balance(&books, period);
        let codes: Vec<&str> = trial.rows.iter().map(|row| row.code.as_str()).collect();
        assert_eq!(codes, vec!["100", "572", "628"]);
        let bank_row = &trial.rows[1];
        assert_eq!(bank_row.total_debit, 1000.0);
        assert_eq!(bank_row.total_credit, 80.0);
        assert_eq!(bank_row.balance, 920.0);
        assert_eq!(trial.total_debit, 1080.0);
        assert!(trial.is_balanced(0.01));
    }
}
