//! Bank account management.
//!
//! Accounts are keyed by holder name. Deposits and withdrawals are composed
//! get + validate + update sequences; a withdrawal beyond the balance fails
//! with [`DomainError::InsufficientFunds`] and leaves the balance unchanged.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CardResult, DomainError, ValidationError};
use crate::record::{require_non_empty, require_non_negative, require_positive, Record};
use crate::store::{
    open_store, EntityStore, JournalBackend, MemoryBackend, StorageBackend, StorageError,
    StoreOptions,
};

/// One bank account: holder name (the key) and current balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account holder name; unique within a bank.
    pub holder: String,
    /// Current balance. Never negative.
    pub balance: f64,
}

impl Account {
    /// Creates an account with an opening balance.
    #[must_use]
    pub fn new(holder: impl Into<String>, balance: f64) -> Self {
        Self {
            holder: holder.into(),
            balance,
        }
    }
}

/// Field-level update for an [`Account`].
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    /// New balance, if changing.
    pub balance: Option<f64>,
}

impl Record for Account {
    type Patch = AccountPatch;

    fn key(&self) -> &str {
        &self.holder
    }

    fn search_text(&self) -> Vec<&str> {
        vec![&self.holder]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("holder", &self.holder)?;
        require_non_negative("balance", self.balance)
    }

    fn apply(&mut self, patch: AccountPatch) {
        if let Some(balance) = patch.balance {
            self.balance = balance;
        }
    }
}

/// A bank: one [`EntityStore`] of accounts plus the money operations.
pub struct Bank<B: StorageBackend<Account>> {
    accounts: EntityStore<Account, B>,
}

impl Bank<JournalBackend<Account>> {
    /// Opens or creates a durable bank at the given directory.
    ///
    /// # Errors
    /// Any storage error from opening the journal backend.
    pub fn open(dir: impl AsRef<Path>) -> CardResult<Self> {
        Ok(Self {
            accounts: open_store(dir.as_ref(), None, StoreOptions::default())?,
        })
    }
}

impl Bank<MemoryBackend<Account>> {
    /// Creates an ephemeral in-memory bank.
    ///
    /// # Errors
    /// Never fails in practice; kept fallible for uniformity with
    /// [`Bank::open`].
    pub fn in_memory() -> CardResult<Self> {
        Ok(Self {
            accounts: EntityStore::open(MemoryBackend::new(), StoreOptions::default())?,
        })
    }
}

impl<B: StorageBackend<Account>> Bank<B> {
    /// Opens a new account.
    ///
    /// # Errors
    /// - [`StorageError::DuplicateKey`] if the holder already has an account
    /// - [`ValidationError`] for an empty holder or negative opening balance
    pub fn open_account(
        &mut self,
        holder: impl Into<String>,
        opening_balance: f64,
    ) -> CardResult<()> {
        self.accounts.add(Account::new(holder, opening_balance))
    }

    /// Deposits into an account, returning the new balance.
    ///
    /// # Errors
    /// - [`DomainError::NonPositiveAmount`] for a zero or negative amount
    /// - [`StorageError::NotFound`] if the holder has no account
    pub fn deposit(&mut self, holder: &str, amount: f64) -> CardResult<f64> {
        require_positive(amount)?;
        let account = self
            .accounts
            .get(holder)
            .ok_or_else(|| StorageError::NotFound(holder.to_string()))?;

        let new_balance = account.balance + amount;
        self.accounts.update(
            holder,
            AccountPatch {
                balance: Some(new_balance),
            },
        )?;
        Ok(new_balance)
    }

    /// Withdraws from an account, returning the new balance.
    ///
    /// # Errors
    /// - [`DomainError::NonPositiveAmount`] for a zero or negative amount
    /// - [`DomainError::InsufficientFunds`] if the amount exceeds the
    ///   balance; the balance is unchanged
    /// - [`StorageError::NotFound`] if the holder has no account
    pub fn withdraw(&mut self, holder: &str, amount: f64) -> CardResult<f64> {
        require_positive(amount)?;
        let account = self
            .accounts
            .get(holder)
            .ok_or_else(|| StorageError::NotFound(holder.to_string()))?;

        if amount > account.balance {
            return Err(DomainError::InsufficientFunds {
                requested: amount,
                available: account.balance,
            }
            .into());
        }

        let new_balance = account.balance - amount;
        self.accounts.update(
            holder,
            AccountPatch {
                balance: Some(new_balance),
            },
        )?;
        Ok(new_balance)
    }

    /// Current balance, if the holder has an account.
    #[must_use]
    pub fn balance(&self, holder: &str) -> Option<f64> {
        self.accounts.get(holder).map(|a| a.balance)
    }

    /// The full account record, if present.
    #[must_use]
    pub fn account(&self, holder: &str) -> Option<Account> {
        self.accounts.get(holder)
    }

    /// Closes an account.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if the holder has no account.
    pub fn close_account(&mut self, holder: &str) -> CardResult<()> {
        self.accounts.remove(holder)
    }

    /// Snapshot of all accounts in holder order.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.list()
    }
}
