pub mod account;
pub mod books;
pub mod common;
pub mod documents;
pub mod entry;
pub mod period;

pub use account::{Account, AccountDraft, AccountPatch, AccountType};
pub use books::Books;
pub use common::{find_by_id, DateRange, Displayable, Identifiable};
pub use documents::{
    Expense, ExpenseBreakdown, Invoice, InvoiceLine, InvoiceState, InvoiceTotals, PaymentMethod,
    TaxBucket, TaxKind, TaxRate,
};
pub use entry::{EntryKind, EntrySource, JournalEntry, JournalLine};
pub use period::{FiscalPeriod, PeriodState};
