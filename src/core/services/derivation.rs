//! Maps invoices and expenses onto balanced journal entries.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::AccountMapping;
use crate::core::documents::{expense_breakdown, invoice_totals, DocumentSource};
use crate::core::errors::{BooksError, Result};
use crate::core::standard_chart::expense_code_for_category;
use crate::domain::documents::{Expense, Invoice, PaymentMethod};
use crate::domain::entry::JournalLine;
use crate::domain::Books;
use crate::utils::money::{is_zero, round2};

/// Lines and header of an entry built from a source document, not yet posted.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedEntry {
    pub date: NaiveDate,
    pub description: String,
    pub document_ref: Option<String>,
    pub lines: Vec<JournalLine>,
}

impl DerivedEntry {
    pub fn total_debit(&self) -> f64 {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn total_credit(&self) -> f64 {
        self.lines.iter().map(|line| line.credit).sum()
    }
}

/// Receivable against revenue, VAT charged and withholding suffered.
///
/// Components are rounded to cents first and the receivable is computed from
/// the rounded parts, so the entry balances exactly.
pub fn invoice_entry(
    books: &Books,
    documents: &dyn DocumentSource,
    mapping: &AccountMapping,
    invoice: &Invoice,
) -> Result<DerivedEntry> {
    let totals = invoice_totals(documents, invoice);
    let subtotal = round2(totals.subtotal);
    let taxes = round2(totals.total_taxes);
    let withholdings = round2(totals.total_withholdings);
    let receivable = round2(subtotal + taxes - withholdings);

    let concept = format!("Factura {} {}", invoice.number, invoice.client_name);
    let mut lines = Vec::with_capacity(4);
    push_debit(&mut lines, resolve(books, "receivables", &mapping.receivables)?, receivable, &concept);
    push_debit(
        &mut lines,
        resolve(books, "withholding_receivable", &mapping.withholding_receivable)?,
        withholdings,
        &concept,
    );
    push_credit(&mut lines, resolve(books, "revenue", &mapping.revenue)?, subtotal, &concept);
    push_credit(&mut lines, resolve(books, "vat_output", &mapping.vat_output)?, taxes, &concept);
    ensure_postable(&lines, &invoice.number)?;

    Ok(DerivedEntry {
        date: invoice.date,
        description: concept,
        document_ref: Some(invoice.number.clone()),
        lines,
    })
}

/// Expense account and VAT paid against suppliers, cash or bank.
pub fn expense_entry(
    books: &Books,
    documents: &dyn DocumentSource,
    mapping: &AccountMapping,
    expense: &Expense,
) -> Result<DerivedEntry> {
    let split = expense_breakdown(documents, expense);
    let tax = round2(split.tax);
    let (base, gross) = if expense.tax_included {
        let gross = round2(split.gross);
        (round2(gross - tax), gross)
    } else {
        let base = round2(split.base);
        (base, round2(base + tax))
    };

    let expense_account = expense_account(books, mapping, expense.category.as_deref())?;
    let counterpart = match expense.payment {
        PaymentMethod::Supplier => resolve(books, "suppliers", &mapping.suppliers)?,
        PaymentMethod::Cash => resolve(books, "cash", &mapping.cash)?,
        PaymentMethod::Bank => resolve(books, "bank", &mapping.bank)?,
    };

    let concept = match expense.supplier.as_deref() {
        Some(supplier) if !supplier.trim().is_empty() => {
            format!("{} ({})", expense.description, supplier.trim())
        }
        _ => expense.description.clone(),
    };
    let mut lines = Vec::with_capacity(3);
    push_debit(&mut lines, expense_account, base, &concept);
    push_debit(&mut lines, resolve(books, "vat_input", &mapping.vat_input)?, tax, &concept);
    push_credit(&mut lines, counterpart, gross, &concept);
    ensure_postable(&lines, &expense.description)?;

    Ok(DerivedEntry {
        date: expense.date,
        description: format!("Gasto: {concept}"),
        document_ref: None,
        lines,
    })
}

/// Account matching the expense category, falling back to the generic expense account.
fn expense_account(books: &Books, mapping: &AccountMapping, category: Option<&str>) -> Result<Uuid> {
    let by_category = category
        .and_then(expense_code_for_category)
        .and_then(|code| books.account_by_code(code))
        .filter(|account| account.is_active);
    match by_category {
        Some(account) => Ok(account.id),
        None => resolve(books, "generic_expense", &mapping.generic_expense),
    }
}

fn resolve(books: &Books, role: &str, code: &str) -> Result<Uuid> {
    books
        .account_by_code(code)
        .map(|account| account.id)
        .ok_or_else(|| {
            BooksError::Validation(format!(
                "Account `{code}` configured as {role} is missing from the chart"
            ))
        })
}

fn push_debit(lines: &mut Vec<JournalLine>, account_id: Uuid, amount: f64, concept: &str) {
    if !is_zero(amount) {
        lines.push(JournalLine::debit(account_id, amount).with_concept(concept));
    }
}

fn push_credit(lines: &mut Vec<JournalLine>, account_id: Uuid, amount: f64, concept: &str) {
    if !is_zero(amount) {
        lines.push(JournalLine::credit(account_id, amount).with_concept(concept));
    }
}

fn ensure_postable(lines: &[JournalLine], document: &str) -> Result<()> {
    if lines.is_empty() {
        Err(BooksError::Validation(format!(
            "Document {document} has no amounts to post"
        )))
    } else {
        Ok(())
    }
}
