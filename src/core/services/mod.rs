pub mod chart_service;
pub mod derivation;
pub mod journal_service;
pub mod ledger_service;
pub mod period_service;
pub mod tax_service;

pub use chart_service::ChartService;
pub use derivation::DerivedEntry;
pub use journal_service::{EntryFilter, EntryPatch, JournalService, NewEntry};
pub use ledger_service::{DiaryRow, LedgerMovement, LedgerService, LedgerView, TrialBalance, TrialBalanceRow};
pub use period_service::PeriodService;
pub use tax_service::{TaxService, VatAnnual, VatQuarterly, WithholdingQuarterly};
