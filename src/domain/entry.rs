//! Journal entries (asientos) and their lines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

/// Origin of a journal entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "source_id", rename_all = "snake_case")]
pub enum EntryKind {
    Manual,
    InvoiceDerived(Uuid),
    ExpenseDerived(Uuid),
}

impl EntryKind {
    /// Source document the entry was derived from, if any.
    pub fn source(&self) -> Option<EntrySource> {
        match *self {
            EntryKind::Manual => None,
            EntryKind::InvoiceDerived(id) => Some(EntrySource::Invoice(id)),
            EntryKind::ExpenseDerived(id) => Some(EntrySource::Expense(id)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Manual => "manual",
            EntryKind::InvoiceDerived(_) => "invoice",
            EntryKind::ExpenseDerived(_) => "expense",
        }
    }
}

/// A source document that can own at most one derived entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Invoice(Uuid),
    Expense(Uuid),
}

impl EntrySource {
    pub fn kind(self) -> EntryKind {
        match self {
            EntrySource::Invoice(id) => EntryKind::InvoiceDerived(id),
            EntrySource::Expense(id) => EntryKind::ExpenseDerived(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalLine {
    pub account_id: Uuid,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
}

impl JournalLine {
    pub fn debit(account_id: Uuid, amount: f64) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: 0.0,
            concept: None,
        }
    }

    pub fn credit(account_id: Uuid, amount: f64) -> Self {
        Self {
            account_id,
            debit: 0.0,
            credit: amount,
            concept: None,
        }
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }

    /// Net signed effect on the account: debit minus credit.
    pub fn net(&self) -> f64 {
        self.debit - self.credit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: Uuid,
    pub number: u32,
    pub date: NaiveDate,
    pub description: String,
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    pub period_id: Uuid,
    pub lines: Vec<JournalLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverses: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversed_by: Option<Uuid>,
}

impl JournalEntry {
    pub fn total_debit(&self) -> f64 {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn total_credit(&self) -> f64 {
        self.lines.iter().map(|line| line.credit).sum()
    }

    /// Concept of a line, falling back to the entry description.
    pub fn concept_of<'a>(&'a self, line: &'a JournalLine) -> &'a str {
        line.concept.as_deref().unwrap_or(&self.description)
    }

    pub fn touches(&self, account_id: Uuid) -> bool {
        self.lines.iter().any(|line| line.account_id == account_id)
    }
}

impl Identifiable for JournalEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for JournalEntry {
    fn display_label(&self) -> String {
        format!("#{} {} {}", self.number, self.date, self.description)
    }
}
