//! Validated mutations for the chart of accounts.

use uuid::Uuid;

use crate::core::errors::{BooksError, Result};
use crate::core::standard_chart::standard_accounts;
use crate::domain::account::{Account, AccountDraft, AccountPatch};
use crate::domain::common::Displayable;
use crate::domain::Books;

/// Upper bound on ancestor walks; deeper chains are treated as corrupt.
const MAX_HIERARCHY_DEPTH: usize = 16;

/// Provides validated mutations for [`Account`] entities.
///
/// System accounts seeded from the standard chart keep their structure frozen;
/// only their name and active flag may change.
pub struct ChartService;

impl ChartService {
    /// Creates a user account after validating code, group and parent.
    pub fn create(books: &mut Books, draft: AccountDraft) -> Result<Uuid> {
        let code = draft.code.trim().to_string();
        Self::validate_code(books, None, &code)?;
        Self::validate_name(&draft.name)?;
        Self::validate_group(draft.group)?;

        let mut account = Account::new(code, draft.name.trim(), draft.account_type, draft.group);
        if let Some(parent_id) = draft.parent_id {
            let parent = books
                .account(parent_id)
                .ok_or_else(|| BooksError::Validation("Parent account does not exist".into()))?;
            account.level = parent.level.saturating_add(1);
            account.parent_id = Some(parent_id);
        }
        let id = account.id;
        tracing::info!(code = %account.code, name = %account.name, "account created");
        books.accounts.push(account);
        books.touch();
        Ok(id)
    }

    /// Applies `patch` to the account identified by `id`.
    ///
    /// For system accounts the allowed keys (`name`, `is_active`) are applied and
    /// any structural key is reported back as a validation error.
    pub fn update(books: &mut Books, id: Uuid, patch: AccountPatch) -> Result<()> {
        let current = books
            .account(id)
            .cloned()
            .ok_or_else(|| BooksError::NotFound(format!("account {id}")))?;

        if let Some(name) = patch.name.as_deref() {
            Self::validate_name(name)?;
        }

        if current.is_system {
            let rejected = patch.structural_keys();
            Self::apply_allowed(books, id, &patch);
            if rejected.is_empty() {
                return Ok(());
            }
            tracing::warn!(code = %current.code, keys = ?rejected, "structural change on system account rejected");
            return Err(BooksError::Validation(format!(
                "System account `{}` only allows changing name and active flag (rejected: {})",
                current.code,
                rejected.join(", ")
            )));
        }

        let mut updated = current.clone();
        if let Some(code) = patch.code.as_deref() {
            let code = code.trim();
            Self::validate_code(books, Some(id), code)?;
            updated.code = code.to_string();
        }
        if let Some(group) = patch.group {
            Self::validate_group(group)?;
            updated.group = group;
        }
        if let Some(account_type) = patch.account_type {
            updated.account_type = account_type;
        }
        if let Some(parent) = patch.parent_id {
            match parent {
                Some(parent_id) => {
                    Self::ensure_no_cycle(books, id, parent_id)?;
                    let parent = books.account(parent_id).ok_or_else(|| {
                        BooksError::Validation("Parent account does not exist".into())
                    })?;
                    updated.level = parent.level.saturating_add(1);
                    updated.parent_id = Some(parent_id);
                }
                None => {
                    updated.level = 1;
                    updated.parent_id = None;
                }
            }
        }
        if let Some(name) = patch.name {
            updated.name = name.trim().to_string();
        }
        if let Some(active) = patch.is_active {
            updated.is_active = active;
        }

        let level_changed = updated.level != current.level;
        if let Some(slot) = books.account_mut(id) {
            *slot = updated;
        }
        if level_changed {
            Self::relevel_descendants(books, id);
        }
        books.touch();
        tracing::info!(account = %id, "account updated");
        Ok(())
    }

    /// Deletes a user account that no journal line references.
    pub fn delete(books: &mut Books, id: Uuid) -> Result<()> {
        let account = books
            .account(id)
            .ok_or_else(|| BooksError::NotFound(format!("account {id}")))?;
        if account.is_system {
            return Err(BooksError::Conflict(format!(
                "System account `{}` cannot be deleted",
                account.code
            )));
        }
        if books.is_account_referenced(id) {
            return Err(BooksError::Conflict(format!(
                "Account `{}` has journal lines",
                account.code
            )));
        }
        let label = account.display_label();
        // Children keep existing as top-level accounts; the reference is weak.
        for child in books.accounts.iter_mut().filter(|a| a.parent_id == Some(id)) {
            child.parent_id = None;
        }
        books.accounts.retain(|account| account.id != id);
        Self::relevel_all(books);
        books.touch();
        tracing::info!(account = %label, "account deleted");
        Ok(())
    }

    /// Accounts ordered by code.
    pub fn list(books: &Books) -> Vec<&Account> {
        let mut accounts: Vec<&Account> = books.accounts.iter().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts
    }

    /// Direct children of an account, ordered by code.
    pub fn children(books: &Books, id: Uuid) -> Vec<&Account> {
        let mut children: Vec<&Account> = books
            .accounts
            .iter()
            .filter(|account| account.parent_id == Some(id))
            .collect();
        children.sort_by(|a, b| a.code.cmp(&b.code));
        children
    }

    /// Inserts the standard chart when the store is empty; returns the number inserted.
    pub fn seed_standard_chart(books: &mut Books) -> usize {
        if !books.accounts.is_empty() {
            tracing::debug!("chart already populated, skipping seed");
            return 0;
        }
        let accounts = standard_accounts();
        let inserted = accounts.len();
        books.accounts.extend(accounts);
        books.touch();
        tracing::info!(inserted, "standard chart seeded");
        inserted
    }

    fn apply_allowed(books: &mut Books, id: Uuid, patch: &AccountPatch) {
        if patch.name.is_none() && patch.is_active.is_none() {
            return;
        }
        if let Some(account) = books.account_mut(id) {
            if let Some(name) = patch.name.as_deref() {
                account.name = name.trim().to_string();
            }
            if let Some(active) = patch.is_active {
                account.is_active = active;
            }
        }
        books.touch();
    }

    fn validate_code(books: &Books, exclude: Option<Uuid>, code: &str) -> Result<()> {
        if code.is_empty() || !code.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(BooksError::Validation(format!(
                "Account code `{code}` must be a non-empty string of digits"
            )));
        }
        let duplicate = books
            .accounts
            .iter()
            .any(|account| account.code == code && exclude != Some(account.id));
        if duplicate {
            return Err(BooksError::Validation(format!(
                "Account code `{code}` already exists"
            )));
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            Err(BooksError::Validation("Account name cannot be empty".into()))
        } else {
            Ok(())
        }
    }

    fn validate_group(group: u8) -> Result<()> {
        if (1..=7).contains(&group) {
            Ok(())
        } else {
            Err(BooksError::Validation(format!(
                "Account group must be between 1 and 7, got {group}"
            )))
        }
    }

    /// Rejects `parent_id` when it is the account itself or one of its descendants.
    fn ensure_no_cycle(books: &Books, id: Uuid, parent_id: Uuid) -> Result<()> {
        let mut cursor = Some(parent_id);
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match cursor {
                None => return Ok(()),
                Some(current) if current == id => {
                    return Err(BooksError::Validation(
                        "Parent assignment would create a cycle".into(),
                    ))
                }
                Some(current) => cursor = books.account(current).and_then(|a| a.parent_id),
            }
        }
        Err(BooksError::Validation(format!(
            "Account hierarchy deeper than {MAX_HIERARCHY_DEPTH} levels"
        )))
    }

    fn relevel_descendants(books: &mut Books, root: Uuid) {
        let mut frontier = vec![root];
        let mut depth = 0;
        while let Some(parent_id) = frontier.pop() {
            depth += 1;
            if depth > books.accounts.len() {
                break;
            }
            let parent_level = match books.account(parent_id) {
                Some(parent) => parent.level,
                None => continue,
            };
            for child in books
                .accounts
                .iter_mut()
                .filter(|a| a.parent_id == Some(parent_id))
            {
                child.level = parent_level.saturating_add(1);
                frontier.push(child.id);
            }
        }
    }

    fn relevel_all(books: &mut Books) {
        let roots: Vec<Uuid> = books
            .accounts
            .iter()
            .filter(|a| a.parent_id.is_none())
            .map(|a| a.id)
            .collect();
        for root in roots {
            if let Some(account) = books.account_mut(root) {
                account.level = 1;
            }
            Self::relevel_descendants(books, root);
        }
    }
}
