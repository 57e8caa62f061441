//! Error types for ledger rules.

use crate::account::AccountStatus;
use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised by the ledger rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Neither pool (nor both together) covers the cost.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Daily remaining plus purchased pool.
        available: i64,
        /// Cost of the operation.
        required: i64,
    },

    /// Credit amounts must be strictly positive.
    #[error("invalid amount: {0} (must be greater than zero)")]
    InvalidAmount(i64),

    /// Generation category not present in the price table.
    #[error("unknown generation category: {0}")]
    UnknownCategory(String),

    /// The account is suspended or deleted.
    #[error("account is {}", .status.as_str())]
    AccountInactive {
        /// Current status.
        status: AccountStatus,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
