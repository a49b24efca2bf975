//! Declaration aggregates: quarterly VAT (303), quarterly withholding (111)
//! and the annual VAT summary (390).
//!
//! Everything is recomputed from the source documents on each call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::documents::{expense_breakdown, invoice_totals, DocumentSource};
use crate::core::errors::{BooksError, Result};
use crate::core::services::period_service::PeriodService;
use crate::domain::common::DateRange;
use crate::domain::documents::{add_to_bucket, Invoice, TaxBucket};
use crate::domain::Books;
use crate::utils::money::is_zero;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VatQuarterly {
    pub year: i32,
    pub quarter: u8,
    /// VAT charged on invoices, grouped by percentage.
    pub charged: Vec<TaxBucket>,
    /// VAT paid on expenses, grouped by percentage.
    pub paid: Vec<TaxBucket>,
    pub vat_charged: f64,
    pub vat_paid: f64,
    /// Positive is payable; negative is refundable or carried forward.
    pub result: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithholdingQuarterly {
    pub year: i32,
    pub quarter: u8,
    /// Distinct counterparties with withheld amounts.
    pub recipients: usize,
    pub invoices: usize,
    pub total_base: f64,
    pub total_withheld: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VatAnnual {
    pub year: i32,
    pub quarters: Vec<VatQuarterly>,
    pub charged: Vec<TaxBucket>,
    pub paid: Vec<TaxBucket>,
    pub vat_charged: f64,
    pub vat_paid: f64,
    pub result: f64,
}

pub struct TaxService;

impl TaxService {
    pub fn vat_quarterly(
        books: &Books,
        documents: &dyn DocumentSource,
        period_id: Uuid,
        quarter: u8,
    ) -> Result<VatQuarterly> {
        let (year, window) = Self::window(books, period_id, quarter)?;

        let mut charged = Vec::new();
        for invoice in Self::declarable_invoices(documents, window) {
            for bucket in invoice_totals(documents, &invoice).vat {
                add_to_bucket(&mut charged, bucket.percentage, bucket.base, bucket.amount);
            }
        }

        let mut paid = Vec::new();
        for expense in documents.expenses_between(window.start, window.end) {
            let split = expense_breakdown(documents, &expense);
            if !is_zero(split.tax) {
                add_to_bucket(&mut paid, split.percentage, split.base, split.tax);
            }
        }

        sort_buckets(&mut charged);
        sort_buckets(&mut paid);
        let vat_charged = charged.iter().map(|bucket| bucket.amount).sum::<f64>();
        let vat_paid = paid.iter().map(|bucket| bucket.amount).sum::<f64>();
        tracing::debug!(year, quarter, vat_charged, vat_paid, "vat quarterly computed");
        Ok(VatQuarterly {
            year,
            quarter,
            charged,
            paid,
            vat_charged,
            vat_paid,
            result: vat_charged - vat_paid,
        })
    }

    pub fn withholding_quarterly(
        books: &Books,
        documents: &dyn DocumentSource,
        period_id: Uuid,
        quarter: u8,
    ) -> Result<WithholdingQuarterly> {
        let (year, window) = Self::window(books, period_id, quarter)?;

        let mut recipients = HashSet::new();
        let mut invoices = 0;
        let mut total_base = 0.0;
        let mut total_withheld = 0.0;
        for invoice in Self::declarable_invoices(documents, window) {
            let totals = invoice_totals(documents, &invoice);
            if is_zero(totals.total_withholdings) {
                continue;
            }
            recipients.insert(invoice.client_id);
            invoices += 1;
            total_base += totals.withholding_base;
            total_withheld += totals.total_withholdings;
        }
        tracing::debug!(year, quarter, total_withheld, "withholding quarterly computed");
        Ok(WithholdingQuarterly {
            year,
            quarter,
            recipients: recipients.len(),
            invoices,
            total_base,
            total_withheld,
        })
    }

    /// Sums the four quarterly VAT runs of the period.
    pub fn vat_annual(
        books: &Books,
        documents: &dyn DocumentSource,
        period_id: Uuid,
    ) -> Result<VatAnnual> {
        let year = PeriodService::find(books, period_id)?.year;
        let quarters = (1..=4)
            .map(|quarter| Self::vat_quarterly(books, documents, period_id, quarter))
            .collect::<Result<Vec<_>>>()?;

        let mut charged = Vec::new();
        let mut paid = Vec::new();
        for quarterly in &quarters {
            for bucket in &quarterly.charged {
                add_to_bucket(&mut charged, bucket.percentage, bucket.base, bucket.amount);
            }
            for bucket in &quarterly.paid {
                add_to_bucket(&mut paid, bucket.percentage, bucket.base, bucket.amount);
            }
        }
        sort_buckets(&mut charged);
        sort_buckets(&mut paid);
        let vat_charged = quarters.iter().map(|q| q.vat_charged).sum::<f64>();
        let vat_paid = quarters.iter().map(|q| q.vat_paid).sum::<f64>();
        Ok(VatAnnual {
            year,
            quarters,
            charged,
            paid,
            vat_charged,
            vat_paid,
            result: vat_charged - vat_paid,
        })
    }

    fn window(books: &Books, period_id: Uuid, quarter: u8) -> Result<(i32, DateRange)> {
        if !(1..=4).contains(&quarter) {
            return Err(BooksError::Validation(format!(
                "Quarter must be between 1 and 4, got {quarter}"
            )));
        }
        let year = PeriodService::find(books, period_id)?.year;
        let window = DateRange::quarter(year, quarter)
            .ok_or_else(|| BooksError::Validation(format!("Year {year} is out of range")))?;
        Ok((year, window))
    }

    fn declarable_invoices(documents: &dyn DocumentSource, window: DateRange) -> Vec<Invoice> {
        documents
            .invoices_between(window.start, window.end)
            .into_iter()
            .filter(|invoice| invoice.state.is_declarable())
            .collect()
    }
}

fn sort_buckets(buckets: &mut [TaxBucket]) {
    buckets.sort_by(|a, b| a.percentage.total_cmp(&b.percentage));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::core::documents::DocumentStore;
    use crate::domain::documents::{Expense, InvoiceLine, InvoiceState, TaxKind, TaxRate};

    struct Fixture {
        books: Books,
        docs: DocumentStore,
        period: Uuid,
        vat21: Uuid,
        vat10: Uuid,
        irpf15: Uuid,
    }

    fn fixture() -> Fixture {
        let mut books = Books::new("Taxes");
        let period = PeriodService::get_or_create(&mut books, 2024).id;
        let mut docs = DocumentStore::new();
        let vat21 = docs.add_tax_rate(TaxRate::new("IVA 21%", 21.0, TaxKind::Vat).as_default());
        let vat10 = docs.add_tax_rate(TaxRate::new("IVA 10%", 10.0, TaxKind::Vat));
        let irpf15 = docs.add_tax_rate(TaxRate::new("IRPF 15%", 15.0, TaxKind::Withholding));
        Fixture {
            books,
            docs,
            period,
            vat21,
            vat10,
            irpf15,
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn invoice(number: &str, client: Uuid, day: NaiveDate, state: InvoiceState, line: InvoiceLine) -> Invoice {
        Invoice::new(number, client, "Cliente", day)
            .with_state(state)
            .with_line(line)
    }

    #[test]
    fn quarterly_vat_matches_reference_example() {
        let mut f = fixture();
        let client = Uuid::new_v4();
        f.docs.add_invoice(invoice(
            "F-1",
            client,
            date(1, 15),
            InvoiceState::Emitted,
            InvoiceLine::new("Servicios", 1.0, 6000.0).with_vat(f.vat21),
        ));
        f.docs.add_invoice(invoice(
            "F-2",
            client,
            date(3, 20),
            InvoiceState::Paid,
            InvoiceLine::new("Servicios", 2.0, 2000.0).with_vat(f.vat21),
        ));
        f.docs.add_expense(Expense::new(date(2, 1), "Alquiler", 4000.0).with_tax(f.vat21, false));

        let model = TaxService::vat_quarterly(&f.books, &f.docs, f.period, 1).unwrap();
        assert!((model.vat_charged - 2100.0).abs() < 1e-6);
        assert!((model.vat_paid - 840.0).abs() < 1e-6);
        assert!((model.result - 1260.0).abs() < 1e-6);
        assert_eq!(model.charged.len(), 1);
        assert!((model.charged[0].base - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn quarterly_vat_ignores_drafts_void_and_other_quarters() {
        let mut f = fixture();
        let client = Uuid::new_v4();
        let line = || InvoiceLine::new("Item", 1.0, 100.0).with_vat(f.vat21);
        f.docs.add_invoice(invoice("D-1", client, date(1, 5), InvoiceState::Draft, line()));
        f.docs.add_invoice(invoice("V-1", client, date(1, 6), InvoiceState::Void, line()));
        f.docs.add_invoice(invoice("O-1", client, date(1, 7), InvoiceState::Overdue, line()));
        f.docs.add_invoice(invoice("F-9", client, date(4, 1), InvoiceState::Emitted, line()));

        let model = TaxService::vat_quarterly(&f.books, &f.docs, f.period, 1).unwrap();
        assert_eq!(model.vat_charged, 0.0);
        assert!(model.charged.is_empty());
        let q2 = TaxService::vat_quarterly(&f.books, &f.docs, f.period, 2).unwrap();
        assert!((q2.vat_charged - 21.0).abs() < 1e-9);
    }

    #[test]
    fn vat_is_grouped_by_rate_and_can_be_refundable() {
        let mut f = fixture();
        let client = Uuid::new_v4();
        f.docs.add_invoice(
            Invoice::new("F-1", client, "Cliente", date(5, 2))
                .with_state(InvoiceState::Emitted)
                .with_line(InvoiceLine::new("A", 1.0, 100.0).with_vat(f.vat21))
                .with_line(InvoiceLine::new("B", 1.0, 100.0).with_vat(f.vat10)),
        );
        f.docs.add_expense(Expense::new(date(6, 1), "Equipo", 1000.0).with_tax(f.vat21, false));

        let model = TaxService::vat_quarterly(&f.books, &f.docs, f.period, 2).unwrap();
        let rates: Vec<f64> = model.charged.iter().map(|b| b.percentage).collect();
        assert_eq!(rates, vec![10.0, 21.0]);
        assert!((model.vat_charged - 31.0).abs() < 1e-9);
        assert!((model.result - (31.0 - 210.0)).abs() < 1e-9);
    }

    #[test]
    fn invalid_quarter_is_rejected() {
        let f = fixture();
        for quarter in [0, 5] {
            assert!(matches!(
                TaxService::vat_quarterly(&f.books, &f.docs, f.period, quarter),
                Err(BooksError::Validation(_))
            ));
            assert!(matches!(
                TaxService::withholding_quarterly(&f.books, &f.docs, f.period, quarter),
                Err(BooksError::Validation(_))
            ));
        }
    }

    #[test]
    fn unknown_period_is_not_found() {
        let f = fixture();
        assert!(matches!(
            TaxService::vat_annual(&f.books, &f.docs, Uuid::new_v4()),
            Err(BooksError::NotFound(_))
        ));
    }

    #[test]
    fn withholding_counts_distinct_recipients() {
        let mut f = fixture();
        let acme = Uuid::new_v4();
        let globex = Uuid::new_v4();
        let line = |amount: f64| {
            InvoiceLine::new("Consultoría", 1.0, amount)
                .with_vat(f.vat21)
                .with_withholding(f.irpf15)
        };
        f.docs.add_invoice(invoice("F-1", acme, date(7, 1), InvoiceState::Emitted, line(1000.0)));
        f.docs.add_invoice(invoice("F-2", acme, date(8, 1), InvoiceState::Paid, line(2000.0)));
        f.docs.add_invoice(invoice("F-3", globex, date(9, 1), InvoiceState::Emitted, line(500.0)));
        f.docs.add_invoice(invoice(
            "F-4",
            globex,
            date(9, 2),
            InvoiceState::Emitted,
            InvoiceLine::new("Sin retención", 1.0, 300.0).with_vat(f.vat21),
        ));

        let model = TaxService::withholding_quarterly(&f.books, &f.docs, f.period, 3).unwrap();
        assert_eq!(model.recipients, 2);
        assert_eq!(model.invoices, 3);
        assert!((model.total_base - 3500.0).abs() < 1e-9);
        assert!((model.total_withheld - 525.0).abs() < 1e-9);
    }

    #[test]
    fn annual_sums_quarters() {
        let mut f = fixture();
        let client = Uuid::new_v4();
        for (month, amount) in [(2, 100.0), (5, 200.0), (11, 300.0)] {
            f.docs.add_invoice(invoice(
                "F",
                client,
                date(month, 10),
                InvoiceState::Emitted,
                InvoiceLine::new("Item", 1.0, amount).with_vat(f.vat21),
            ));
        }
        f.docs.add_expense(Expense::new(date(8, 1), "Material", 100.0));

        let annual = TaxService::vat_annual(&f.books, &f.docs, f.period).unwrap();
        assert_eq!(annual.quarters.len(), 4);
        assert_eq!(annual.quarters[2].vat_charged, 0.0);
        assert!((annual.vat_charged - 126.0).abs() < 1e-9);
        assert!((annual.vat_paid - 21.0).abs() < 1e-9);
        assert!((annual.result - 105.0).abs() < 1e-9);
        assert_eq!(annual.charged.len(), 1);
        assert!((annual.charged[0].base - 600.0).abs() < 1e-9);
    }

    #[test]
    fn empty_period_yields_zeroed_models() {
        let f = fixture();
        let annual = TaxService::vat_annual(&f.books, &f.docs, f.period).unwrap();
        assert_eq!(annual.result, 0.0);
        assert!(annual.quarters.iter().all(|q| q.charged.is_empty() && q.paid.is_empty()));
        let withholding = TaxService::withholding_quarterly(&f.books, &f.docs, f.period, 4).unwrap();
        assert_eq!(withholding.recipients, 0);
        assert_eq!(withholding.total_withheld, 0.0);
    }
}
