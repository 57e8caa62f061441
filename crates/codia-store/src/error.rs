//! Error types for storage.

use codia_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Lookup key.
        id: String,
    },

    /// Record already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Entity kind.
        entity: &'static str,
        /// Conflicting key.
        id: String,
    },

    /// A ledger rule rejected the operation. Nothing was written.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl StoreError {
    pub(crate) fn account_not_found(user_id: &codia_core::UserId) -> Self {
        Self::NotFound {
            entity: "account",
            id: user_id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}
