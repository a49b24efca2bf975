use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// An account of the chart (cuenta contable).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub group: u8,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default = "Account::active_default")]
    pub is_active: bool,
}

impl Account {
    /// Creates an active, top-level user account.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        group: u8,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            account_type,
            group,
            level: 1,
            parent_id: None,
            is_system: false,
            is_active: true,
        }
    }

    fn active_default() -> bool {
        true
    }
}

impl Identifiable for Account {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Account {
    fn display_label(&self) -> String {
        format!("{} {}", self.code, self.name)
    }
}

/// Nature of an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
        };
        f.write_str(label)
    }
}

/// Input for creating a user account. The level is derived from the parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountDraft {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub group: u8,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl AccountDraft {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        group: u8,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            group,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update of an account; `None` leaves a field untouched.
///
/// `parent_id: Some(None)` detaches the account from its parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountPatch {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub group: Option<u8>,
    #[serde(default)]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl AccountPatch {
    /// Names of the structural keys present in the patch.
    pub fn structural_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.code.is_some() {
            keys.push("code");
        }
        if self.account_type.is_some() {
            keys.push("account_type");
        }
        if self.group.is_some() {
            keys.push("group");
        }
        if self.parent_id.is_some() {
            keys.push("parent_id");
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_keys_ignore_name_and_active() {
        let patch = AccountPatch {
            name: Some("Renamed".into()),
            is_active: Some(false),
            ..AccountPatch::default()
        };
        assert!(patch.structural_keys().is_empty());

        let patch = AccountPatch {
            code: Some("4301".into()),
            parent_id: Some(None),
            ..AccountPatch::default()
        };
        assert_eq!(patch.structural_keys(), vec!["code", "parent_id"]);
    }

    #[test]
    fn account_defaults_to_active_when_field_missing() {
        let json = r#"{
            "id": "8f0c2c1e-6a2b-4f3a-9d2e-1c2b3a4d5e6f",
            "code": "430",
            "name": "Clientes",
            "account_type": "asset",
            "group": 4,
            "level": 1
        }"#;
        let account: Account = serde_json::from_str(json).expect("deserialize account");
        assert!(account.is_active);
        assert!(!account.is_system);
        assert_eq!(account.display_label(), "430 Clientes");
    }
}
