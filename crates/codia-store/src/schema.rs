//! Storage layout shared by the persistent backends.
//!
//! `RocksDB` keeps one column family per record kind. PostgreSQL uses tables
//! with the same names, created by `migrations/0001_init.sql`.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Credit transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Latest artifact per user and category, keyed by `user_id || category`.
    pub const ARTIFACTS: &str = "artifacts";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::ARTIFACTS,
    ]
}
