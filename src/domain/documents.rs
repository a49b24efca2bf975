//! Documents owned by the invoicing and expense stores.
//!
//! The engine only reads them: invoices and expenses feed the derivation rules
//! and the tax models, tax rates resolve the percentages both rely on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaxKind {
    Vat,
    Withholding,
    Other,
}

/// A configured tax rate (impuesto).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxRate {
    pub id: Uuid,
    pub name: String,
    pub percentage: f64,
    pub kind: TaxKind,
    #[serde(default = "TaxRate::active_default")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl TaxRate {
    pub fn new(name: impl Into<String>, percentage: f64, kind: TaxKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            percentage,
            kind,
            is_active: true,
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    fn active_default() -> bool {
        true
    }
}

impl Identifiable for TaxRate {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Draft,
    Emitted,
    Paid,
    Overdue,
    Void,
}

impl InvoiceState {
    /// States that can be posted to the journal.
    pub fn is_postable(self) -> bool {
        !matches!(self, InvoiceState::Draft | InvoiceState::Void)
    }

    /// States counted by the quarterly and annual tax models.
    pub fn is_declarable(self) -> bool {
        matches!(self, InvoiceState::Emitted | InvoiceState::Paid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withholding_rate_id: Option<Uuid>,
}

impl InvoiceLine {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            vat_rate_id: None,
            withholding_rate_id: None,
        }
    }

    pub fn with_vat(mut self, rate_id: Uuid) -> Self {
        self.vat_rate_id = Some(rate_id);
        self
    }

    pub fn with_withholding(mut self, rate_id: Uuid) -> Self {
        self.withholding_rate_id = Some(rate_id);
        self
    }

    pub fn base(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub date: NaiveDate,
    pub state: InvoiceState,
    pub lines: Vec<InvoiceLine>,
}

impl Invoice {
    pub fn new(
        number: impl Into<String>,
        client_id: Uuid,
        client_name: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            client_id,
            client_name: client_name.into(),
            date,
            state: InvoiceState::Draft,
            lines: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: InvoiceState) -> Self {
        self.state = state;
        self
    }

    pub fn with_line(mut self, line: InvoiceLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Computes invoice totals; `percentage` resolves a rate id, unknown ids count as 0 %.
    pub fn totals<F>(&self, percentage: F) -> InvoiceTotals
    where
        F: Fn(Uuid) -> Option<f64>,
    {
        let mut totals = InvoiceTotals::default();
        for line in &self.lines {
            let base = line.base();
            totals.subtotal += base;
            if let Some(rate) = line.vat_rate_id {
                let pct = percentage(rate).unwrap_or(0.0);
                let tax = base * pct / 100.0;
                totals.total_taxes += tax;
                add_to_bucket(&mut totals.vat, pct, base, tax);
            }
            if let Some(rate) = line.withholding_rate_id {
                let pct = percentage(rate).unwrap_or(0.0);
                let withheld = base * pct / 100.0;
                if withheld != 0.0 {
                    totals.withholding_base += base;
                }
                totals.total_withholdings += withheld;
            }
        }
        totals.total = totals.subtotal + totals.total_taxes - totals.total_withholdings;
        totals
    }
}

impl Identifiable for Invoice {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Tax base and amount accumulated for one percentage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxBucket {
    pub percentage: f64,
    pub base: f64,
    pub amount: f64,
}

pub(crate) fn add_to_bucket(buckets: &mut Vec<TaxBucket>, percentage: f64, base: f64, amount: f64) {
    match buckets
        .iter_mut()
        .find(|bucket| (bucket.percentage - percentage).abs() < 1e-9)
    {
        Some(bucket) => {
            bucket.base += base;
            bucket.amount += amount;
        }
        None => buckets.push(TaxBucket {
            percentage,
            base,
            amount,
        }),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub total_taxes: f64,
    pub total_withholdings: f64,
    /// Sum of the line bases that carried a withholding.
    pub withholding_base: f64,
    pub total: f64,
    /// VAT grouped by percentage.
    pub vat: Vec<TaxBucket>,
}

/// How an expense was settled, selecting the credited account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Supplier,
    Cash,
    Bank,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub tax_included: bool,
    #[serde(default)]
    pub tax_rate_id: Option<Uuid>,
    #[serde(default)]
    pub payment: PaymentMethod,
}

impl Expense {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            description: description.into(),
            supplier: None,
            category: None,
            amount,
            tax_included: false,
            tax_rate_id: None,
            payment: PaymentMethod::Supplier,
        }
    }

    pub fn with_tax(mut self, rate_id: Uuid, included: bool) -> Self {
        self.tax_rate_id = Some(rate_id);
        self.tax_included = included;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    pub fn paid_with(mut self, payment: PaymentMethod) -> Self {
        self.payment = payment;
        self
    }

    /// Splits the amount into base, tax and gross for the given percentage.
    pub fn breakdown(&self, percentage: f64) -> ExpenseBreakdown {
        if self.tax_included {
            let base = self.amount / (1.0 + percentage / 100.0);
            ExpenseBreakdown {
                percentage,
                base,
                tax: self.amount - base,
                gross: self.amount,
            }
        } else {
            let tax = self.amount * percentage / 100.0;
            ExpenseBreakdown {
                percentage,
                base: self.amount,
                tax,
                gross: self.amount + tax,
            }
        }
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExpenseBreakdown {
    pub percentage: f64,
    pub base: f64,
    pub tax: f64,
    pub gross: f64,
}
