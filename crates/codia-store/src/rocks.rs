//! `RocksDB` storage implementation.
//!
//! Records are CBOR-encoded. Ledger operations serialize on a write lock so
//! that the read-modify-write of an account and its transaction land in one
//! `WriteBatch` without interleaving.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use codia_core::{Account, Artifact, CreditTransaction, GenerationCategory, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{LedgerOp, LedgerOutcome, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read<T: serde::de::DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.cf(family)?;
        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        self.read(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn create_account(&self, account: &Account) -> Result<()> {
        let _guard = self.lock()?;
        let key = keys::account_key(&account.user_id);

        if self.read::<Account>(cf::ACCOUNTS, &key)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: account.user_id.to_string(),
            });
        }

        let handle = self.cf(cf::ACCOUNTS)?;
        self.db
            .put_cf(&handle, key, Self::serialize(account)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.read(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    async fn apply(
        &self,
        user_id: &UserId,
        op: LedgerOp,
        now: DateTime<Utc>,
    ) -> Result<LedgerOutcome> {
        let _guard = self.lock()?;
        let account_key = keys::account_key(user_id);

        let mut account: Account = self
            .read(cf::ACCOUNTS, &account_key)?
            .ok_or_else(|| StoreError::account_not_found(user_id))?;

        let (outcome, transaction) = op.apply(&mut account, now)?;

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &account_key, Self::serialize(&account)?);

        if let Some(tx) = &transaction {
            let cf_tx = self.cf(cf::TRANSACTIONS)?;
            let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
            batch.put_cf(&cf_tx, keys::transaction_key(&tx.id), Self::serialize(tx)?);
            batch.put_cf(&cf_tx_by_user, keys::user_transaction_key(user_id, &tx.id), []);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(%user_id, op = op.name(), "ledger op applied");
        Ok(outcome)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            if let Some(id) = keys::transaction_id_from_user_key(&key) {
                ids.push(id);
            }
        }

        // Newest first.
        let mut transactions = Vec::new();
        for id in ids.iter().rev().skip(offset).take(limit) {
            if let Some(tx) = self.get_transaction(id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Artifact Operations
    // =========================================================================

    async fn put_artifact(&self, artifact: &Artifact) -> Result<()> {
        let handle = self.cf(cf::ARTIFACTS)?;
        let key = keys::artifact_key(&artifact.user_id, artifact.category);
        self.db
            .put_cf(&handle, key, Self::serialize(artifact)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn get_artifact(
        &self,
        user_id: &UserId,
        category: GenerationCategory,
    ) -> Result<Option<Artifact>> {
        self.read(cf::ARTIFACTS, &keys::artifact_key(user_id, category))
    }
}
