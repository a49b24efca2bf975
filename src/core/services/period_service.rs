use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::core::errors::{BooksError, Result};
use crate::domain::period::{FiscalPeriod, PeriodState};
use crate::domain::Books;

/// Resolves and transitions fiscal periods.
pub struct PeriodService;

impl PeriodService {
    /// Returns the period for the calendar year of `today`, creating it if absent.
    pub fn get_or_create_current(books: &mut Books, today: NaiveDate) -> FiscalPeriod {
        Self::get_or_create(books, today.year())
    }

    /// Returns the period for `year`, creating it if absent. Never duplicates a year.
    pub fn get_or_create(books: &mut Books, year: i32) -> FiscalPeriod {
        if let Some(period) = books.period_for_year(year) {
            return period.clone();
        }
        let period = FiscalPeriod::new(year);
        tracing::info!(year, "fiscal period created");
        books.periods.push(period.clone());
        books.touch();
        period
    }

    /// Periods ordered by year.
    pub fn list(books: &Books) -> Vec<&FiscalPeriod> {
        let mut periods: Vec<&FiscalPeriod> = books.periods.iter().collect();
        periods.sort_by_key(|period| period.year);
        periods
    }

    pub fn close(books: &mut Books, id: Uuid) -> Result<FiscalPeriod> {
        Self::transition(books, id, PeriodState::Closed)
    }

    pub fn reopen(books: &mut Books, id: Uuid) -> Result<FiscalPeriod> {
        Self::transition(books, id, PeriodState::Open)
    }

    /// The period whose year matches `date`; callers create it first.
    pub fn resolve_for_date(books: &Books, date: NaiveDate) -> Result<&FiscalPeriod> {
        books
            .period_for_year(date.year())
            .ok_or_else(|| BooksError::NotFound(format!("fiscal period {}", date.year())))
    }

    /// Resolves the period for `date` and fails if it is closed.
    pub fn ensure_writable(books: &Books, date: NaiveDate) -> Result<&FiscalPeriod> {
        let period = Self::resolve_for_date(books, date)?;
        if !period.is_open() {
            tracing::warn!(year = period.year, "write rejected on closed period");
            return Err(BooksError::PeriodClosed { year: period.year });
        }
        Ok(period)
    }

    pub fn find(books: &Books, id: Uuid) -> Result<&FiscalPeriod> {
        books
            .period(id)
            .ok_or_else(|| BooksError::NotFound(format!("fiscal period {id}")))
    }

    fn transition(books: &mut Books, id: Uuid, state: PeriodState) -> Result<FiscalPeriod> {
        let period = books
            .period_mut(id)
            .ok_or_else(|| BooksError::NotFound(format!("fiscal period {id}")))?;
        if period.state != state {
            period.state = state;
            tracing::info!(year = period.year, state = ?state, "fiscal period transitioned");
        }
        let snapshot = period.clone();
        books.touch();
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut books = Books::new("Periods");
        let first = PeriodService::get_or_create_current(&mut books, date(2024, 5, 3));
        let second = PeriodService::get_or_create_current(&mut books, date(2024, 11, 30));
        assert_eq!(first.id, second.id);
        assert_eq!(books.periods.len(), 1);
        assert_eq!(first.year, 2024);
        assert!(first.is_open());
    }

    #[test]
    fn close_and_reopen_round_trip() {
        let mut books = Books::new("Periods");
        let period = PeriodService::get_or_create(&mut books, 2023);
        let closed = PeriodService::close(&mut books, period.id).expect("close");
        assert_eq!(closed.state, PeriodState::Closed);
        assert!(matches!(
            PeriodService::ensure_writable(&books, date(2023, 6, 1)),
            Err(BooksError::PeriodClosed { year: 2023 })
        ));

        let reopened = PeriodService::reopen(&mut books, period.id).expect("reopen");
        assert_eq!(reopened.state, PeriodState::Open);
        assert!(PeriodService::ensure_writable(&books, date(2023, 6, 1)).is_ok());
    }

    #[test]
    fn resolve_for_missing_year_is_not_found() {
        let mut books = Books::new("Periods");
        PeriodService::get_or_create(&mut books, 2024);
        assert!(matches!(
            PeriodService::resolve_for_date(&books, date(2025, 1, 1)),
            Err(BooksError::NotFound(_))
        ));
    }

    #[test]
    fn list_orders_by_year() {
        let mut books = Books::new("Periods");
        PeriodService::get_or_create(&mut books, 2025);
        PeriodService::get_or_create(&mut books, 2023);
        PeriodService::get_or_create(&mut books, 2024);
        let years: Vec<i32> = PeriodService::list(&books).iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2023, 2024, 2025]);
    }

    #[test]
    fn unknown_period_transition_fails() {
        let mut books = Books::new("Periods");
        assert!(matches!(
            PeriodService::close(&mut books, Uuid::new_v4()),
            Err(BooksError::NotFound(_))
        ));
    }
}
