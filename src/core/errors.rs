use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for the bookkeeping engine, storage and configuration.
#[derive(Error, Debug)]
pub enum BooksError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unbalanced entry: debit {debit:.2} != credit {credit:.2}")]
    Unbalanced { debit: f64, credit: f64 },
    #[error("Operation not allowed: {0}")]
    Conflict(String),
    #[error("Fiscal period {year} is closed")]
    PeriodClosed { year: i32 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = StdResult<T, BooksError>;

impl BooksError {
    /// Short machine-friendly tag for the error family.
    pub fn kind(&self) -> &'static str {
        match self {
            BooksError::Validation(_) => "validation",
            BooksError::Unbalanced { .. } => "unbalanced",
            BooksError::Conflict(_) => "conflict",
            BooksError::PeriodClosed { .. } => "period_closed",
            BooksError::NotFound(_) => "not_found",
            BooksError::Storage(_) => "storage",
            BooksError::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for BooksError {
    fn from(err: std::io::Error) -> Self {
        BooksError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BooksError {
    fn from(err: serde_json::Error) -> Self {
        BooksError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_message_shows_both_totals() {
        let err = BooksError::Unbalanced {
            debit: 100.0,
            credit: 90.0,
        };
        assert_eq!(
            err.to_string(),
            "Unbalanced entry: debit 100.00 != credit 90.00"
        );
        assert_eq!(err.kind(), "unbalanced");
    }

    #[test]
    fn io_errors_map_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(BooksError::from(io), BooksError::Storage(_)));
    }
}
