//! Key encoding for the `RocksDB` column families.

use codia_core::{GenerationCategory, TransactionId, UserId};

/// Account key: the 16 UUID bytes.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Transaction key: the 16 ULID bytes.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// User-transaction index key.
///
/// Format: `user_id (16 bytes) || transaction_id (16 bytes)`
///
/// ULIDs sort by creation time, so a prefix scan yields a user's ledger in
/// chronological order.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Prefix for iterating all transactions of a user.
#[must_use]
pub fn user_transactions_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Transaction id stored in a user-transaction index key.
///
/// Returns `None` if the key is shorter than 32 bytes.
#[must_use]
pub fn transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

/// Artifact key: `user_id (16 bytes) || category name`.
#[must_use]
pub fn artifact_key(user_id: &UserId, category: GenerationCategory) -> Vec<u8> {
    let name = category.as_str().as_bytes();
    let mut key = Vec::with_capacity(16 + name.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(name);
    key
}
