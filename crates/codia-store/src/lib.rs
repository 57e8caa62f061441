//! Storage layer for Codia credits.
//!
//! This crate persists accounts, the append-only credit transaction log and
//! the latest generation artifact per user and category.
//!
//! # Backends
//!
//! - [`MemoryStore`]: a mutex-guarded map, used for development and tests
//! - [`PgStore`]: PostgreSQL through `sqlx`, row-locked transactions
//! - `RocksStore`: `RocksDB` column families (feature `rocksdb-backend`)
//!
//! # Atomicity
//!
//! Every balance mutation goes through [`Store::apply`]. A backend loads the
//! account inside its critical section (mutex, row lock or write lock), runs
//! the [`LedgerOp`] against a copy, and writes the copy plus the transaction
//! in one step only if the rule succeeded. Two concurrent consumptions for the
//! same account therefore cannot both observe the same balance.
//!
//! # Example
//!
//! ```no_run
//! use codia_core::{Account, UserId};
//! use codia_store::{MemoryStore, Store};
//!
//! # async fn example() -> codia_store::Result<()> {
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//! store.create_account(&Account::new(user_id, None)).await?;
//!
//! let balance = store.add_credits(&user_id, 50, Some("welcome"), chrono::Utc::now()).await?;
//! assert_eq!(balance, 50);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use codia_core::{
    Account, Artifact, Charge, Consumption, CreditTransaction, GenerationCategory, LedgerError,
    UserId, Verification,
};

/// A balance mutation, applied atomically by a backend.
#[derive(Debug, Clone)]
pub enum LedgerOp {
    /// Charge one generation.
    Consume(Charge),
    /// Add purchased credits.
    Add {
        /// Credits to add.
        amount: i64,
        /// Ledger description.
        description: Option<String>,
    },
    /// Operator bonus.
    Grant {
        /// Credits to grant.
        amount: i64,
        /// Reason recorded on the ledger.
        reason: String,
    },
    /// Give back a failed generation.
    Refund {
        /// The charge being reversed.
        consumption: Consumption,
        /// Reason recorded on the ledger.
        reason: String,
    },
    /// One-time e-mail verification bonus.
    VerifyEmail,
    /// Soft delete.
    Delete,
}

/// Result of a [`LedgerOp`].
#[derive(Debug, Clone)]
pub enum LedgerOutcome {
    /// Receipt of a consumption.
    Consumed(Consumption),
    /// Purchased pool after an add, grant or refund.
    Balance(i64),
    /// Outcome of an e-mail verification.
    Verified(Verification),
    /// The account after a soft delete.
    Deleted(Box<Account>),
}

impl LedgerOp {
    /// Run the rule against `account`.
    ///
    /// # Errors
    ///
    /// Returns the ledger rule's error. The caller must then discard
    /// `account`.
    pub fn apply(
        &self,
        account: &mut Account,
        now: DateTime<Utc>,
    ) -> std::result::Result<(LedgerOutcome, Option<CreditTransaction>), LedgerError> {
        match self {
            Self::Consume(charge) => {
                let (consumption, tx) = account.consume(charge, now)?;
                Ok((LedgerOutcome::Consumed(consumption), Some(tx)))
            }
            Self::Add {
                amount,
                description,
            } => {
                let tx = account.add_credits(*amount, description.as_deref(), now)?;
                Ok((LedgerOutcome::Balance(account.total_credits), Some(tx)))
            }
            Self::Grant { amount, reason } => {
                let tx = account.grant_bonus(*amount, reason, now)?;
                Ok((LedgerOutcome::Balance(account.total_credits), Some(tx)))
            }
            Self::Refund {
                consumption,
                reason,
            } => {
                let tx = account.refund(
                    &consumption.breakdown,
                    consumption.charged_on,
                    reason,
                    now,
                )?;
                Ok((LedgerOutcome::Balance(account.total_credits), Some(tx)))
            }
            Self::VerifyEmail => {
                let (verification, tx) = account.verify_email(now)?;
                Ok((LedgerOutcome::Verified(verification), tx))
            }
            Self::Delete => {
                account.mark_deleted(now);
                Ok((LedgerOutcome::Deleted(Box::new(account.clone())), None))
            }
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Consume(_) => "consume",
            Self::Add { .. } => "add",
            Self::Grant { .. } => "grant",
            Self::Refund { .. } => "refund",
            Self::VerifyEmail => "verify_email",
            Self::Delete => "delete",
        }
    }
}

fn unexpected(op: &str) -> StoreError {
    StoreError::Database(format!("unexpected outcome for ledger op {op}"))
}

/// The storage trait defining all database operations.
///
/// Backends implement the primitives; the typed ledger operations are
/// provided on top of [`Store::apply`].
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the user already has one.
    async fn create_account(&self, account: &Account) -> Result<()>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Apply a ledger operation atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::Ledger` if the rule rejects it; nothing is written.
    async fn apply(
        &self,
        user_id: &UserId,
        op: LedgerOp,
        now: DateTime<Utc>,
    ) -> Result<LedgerOutcome>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// List transactions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    // =========================================================================
    // Artifact Operations
    // =========================================================================

    /// Insert or replace the latest artifact for its user and category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_artifact(&self, artifact: &Artifact) -> Result<()>;

    /// Get the latest artifact for a user and category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_artifact(
        &self,
        user_id: &UserId,
        category: GenerationCategory,
    ) -> Result<Option<Artifact>>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Charge one generation.
    ///
    /// # Errors
    ///
    /// See [`Store::apply`]; `LedgerError::InsufficientCredits` when short.
    async fn consume(
        &self,
        user_id: &UserId,
        charge: Charge,
        now: DateTime<Utc>,
    ) -> Result<Consumption> {
        match self.apply(user_id, LedgerOp::Consume(charge), now).await? {
            LedgerOutcome::Consumed(consumption) => Ok(consumption),
            _ => Err(unexpected("consume")),
        }
    }

    /// Add purchased credits. Returns the new purchased pool.
    ///
    /// # Errors
    ///
    /// See [`Store::apply`]; `LedgerError::InvalidAmount` for `amount <= 0`.
    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let op = LedgerOp::Add {
            amount,
            description: description.map(str::to_string),
        };
        match self.apply(user_id, op, now).await? {
            LedgerOutcome::Balance(balance) => Ok(balance),
            _ => Err(unexpected("add")),
        }
    }

    /// Grant bonus credits. Returns the new purchased pool.
    ///
    /// # Errors
    ///
    /// See [`Store::apply`].
    async fn grant_bonus(
        &self,
        user_id: &UserId,
        amount: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let op = LedgerOp::Grant {
            amount,
            reason: reason.to_string(),
        };
        match self.apply(user_id, op, now).await? {
            LedgerOutcome::Balance(balance) => Ok(balance),
            _ => Err(unexpected("grant")),
        }
    }

    /// Reverse a consumption. Returns the new purchased pool.
    ///
    /// # Errors
    ///
    /// See [`Store::apply`].
    async fn refund(
        &self,
        user_id: &UserId,
        consumption: &Consumption,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let op = LedgerOp::Refund {
            consumption: consumption.clone(),
            reason: reason.to_string(),
        };
        match self.apply(user_id, op, now).await? {
            LedgerOutcome::Balance(balance) => Ok(balance),
            _ => Err(unexpected("refund")),
        }
    }

    /// Verify the e-mail address and grant the one-time bonus.
    ///
    /// # Errors
    ///
    /// See [`Store::apply`].
    async fn verify_email(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<Verification> {
        match self.apply(user_id, LedgerOp::VerifyEmail, now).await? {
            LedgerOutcome::Verified(verification) => Ok(verification),
            _ => Err(unexpected("verify_email")),
        }
    }

    /// Soft-delete an account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    async fn delete_account(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<Account> {
        match self.apply(user_id, LedgerOp::Delete, now).await? {
            LedgerOutcome::Deleted(account) => Ok(*account),
            _ => Err(unexpected("delete")),
        }
    }
}
