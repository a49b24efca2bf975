//! Read-only contract towards the invoice store, the expense store and the tax
//! rate registry.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    documents::{Expense, ExpenseBreakdown, Invoice, InvoiceTotals, TaxKind, TaxRate},
    find_by_id, DateRange,
};

/// Abstraction over the collaborators that own invoices, expenses and tax rates.
pub trait DocumentSource {
    fn invoice(&self, id: Uuid) -> Option<Invoice>;
    fn invoices_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Invoice>;
    fn expense(&self, id: Uuid) -> Option<Expense>;
    fn expenses_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Expense>;
    fn tax_rate(&self, id: Uuid) -> Option<TaxRate>;
    fn tax_rates(&self) -> Vec<TaxRate>;

    /// The default active rate of a kind; at most one is expected.
    fn default_rate(&self, kind: TaxKind) -> Option<TaxRate> {
        self.tax_rates()
            .into_iter()
            .find(|rate| rate.kind == kind && rate.is_default && rate.is_active)
    }

    fn percentage(&self, id: Uuid) -> Option<f64> {
        self.tax_rate(id).map(|rate| rate.percentage)
    }
}

/// Computes invoice totals against the registry; unknown rates count as 0 %.
pub fn invoice_totals(source: &dyn DocumentSource, invoice: &Invoice) -> InvoiceTotals {
    invoice.totals(|id| {
        let pct = source.percentage(id);
        if pct.is_none() {
            tracing::warn!(invoice = %invoice.number, rate = %id, "unknown tax rate, using 0%");
        }
        pct
    })
}

/// Resolves the VAT percentage of an expense.
///
/// An explicit rate id wins; without one the default VAT rate applies; an
/// unresolvable rate falls back to 0 % so expense posting is never blocked.
pub fn expense_breakdown(source: &dyn DocumentSource, expense: &Expense) -> ExpenseBreakdown {
    let percentage = match expense.tax_rate_id {
        Some(id) => source.percentage(id).unwrap_or_else(|| {
            tracing::warn!(expense = %expense.id, rate = %id, "unknown tax rate, using 0%");
            0.0
        }),
        None => source
            .default_rate(TaxKind::Vat)
            .map_or(0.0, |rate| rate.percentage),
    };
    expense.breakdown(percentage)
}

/// In-memory collaborator used by tests and embedded sessions.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    pub invoices: Vec<Invoice>,
    pub expenses: Vec<Expense>,
    pub tax_rates: Vec<TaxRate>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_invoice(&mut self, invoice: Invoice) -> Uuid {
        let id = invoice.id;
        self.invoices.push(invoice);
        id
    }

    pub fn add_expense(&mut self, expense: Expense) -> Uuid {
        let id = expense.id;
        self.expenses.push(expense);
        id
    }

    pub fn add_tax_rate(&mut self, rate: TaxRate) -> Uuid {
        let id = rate.id;
        self.tax_rates.push(rate);
        id
    }
}

impl DocumentSource for DocumentStore {
    fn invoice(&self, id: Uuid) -> Option<Invoice> {
        find_by_id(&self.invoices, id).cloned()
    }

    fn invoices_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Invoice> {
        let range = DateRange { start, end };
        self.invoices
            .iter()
            .filter(|invoice| range.contains(invoice.date))
            .cloned()
            .collect()
    }

    fn expense(&self, id: Uuid) -> Option<Expense> {
        find_by_id(&self.expenses, id).cloned()
    }

    fn expenses_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Expense> {
        let range = DateRange { start, end };
        self.expenses
            .iter()
            .filter(|expense| range.contains(expense.date))
            .cloned()
            .collect()
    }

    fn tax_rate(&self, id: Uuid) -> Option<TaxRate> {
        find_by_id(&self.tax_rates, id).cloned()
    }

    fn tax_rates(&self) -> Vec<TaxRate> {
        self.tax_rates.clone()
    }
}
