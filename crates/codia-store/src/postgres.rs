//! PostgreSQL storage implementation.
//!
//! Ledger operations lock the account row with `SELECT ... FOR UPDATE` inside
//! a database transaction. The updated row and the new ledger entry are
//! written before commit; a rejected rule drops the transaction, which rolls
//! it back.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Postgres, Row};

use codia_core::{
    Account, AccountStatus, Artifact, CreditTransaction, GenerationCategory, SubscriptionTier,
    TransactionCategory, TransactionId, UserId,
};

use crate::error::{Result, StoreError};
use crate::{LedgerOp, LedgerOutcome, Store};

const ACCOUNT_COLUMNS: &str = "user_id, email, subscription_tier, total_credits, \
     daily_credits_used, daily_window, level, experience_points, current_streak, \
     longest_streak, last_consumed_on, email_verified, account_status, \
     lifetime_used_credits, lifetime_saved_cents, created_at, updated_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn write_account<'e, E>(executor: E, account: &Account) -> Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE accounts SET email = $2, subscription_tier = $3, total_credits = $4, \
             daily_credits_used = $5, daily_window = $6, level = $7, experience_points = $8, \
             current_streak = $9, longest_streak = $10, last_consumed_on = $11, \
             email_verified = $12, account_status = $13, lifetime_used_credits = $14, \
             lifetime_saved_cents = $15, updated_at = $16 \
             WHERE user_id = $1",
        )
        .bind(account.user_id.as_uuid())
        .bind(&account.email)
        .bind(account.subscription_tier.as_str())
        .bind(account.total_credits)
        .bind(account.daily_credits_used)
        .bind(account.daily_window)
        .bind(to_i32(account.level)?)
        .bind(account.experience_points)
        .bind(to_i32(account.current_streak)?)
        .bind(to_i32(account.longest_streak)?)
        .bind(account.last_consumed_on)
        .bind(account.email_verified)
        .bind(account.account_status.as_str())
        .bind(account.lifetime_used_credits)
        .bind(account.lifetime_saved_cents)
        .bind(account.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn insert_transaction<'e, E>(executor: E, tx: &CreditTransaction) -> Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO credit_transactions \
             (id, user_id, amount, category, kind, description, balance_after, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(tx.id.to_string())
        .bind(tx.user_id.as_uuid())
        .bind(tx.amount)
        .bind(tx.category.as_str())
        .bind(&tx.kind)
        .bind(&tx.description)
        .bind(tx.balance_after)
        .bind(&tx.metadata)
        .bind(tx.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn create_account(&self, account: &Account) -> Result<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(account.user_id.as_uuid())
        .bind(&account.email)
        .bind(account.subscription_tier.as_str())
        .bind(account.total_credits)
        .bind(account.daily_credits_used)
        .bind(account.daily_window)
        .bind(to_i32(account.level)?)
        .bind(account.experience_points)
        .bind(to_i32(account.current_streak)?)
        .bind(to_i32(account.longest_streak)?)
        .bind(account.last_consumed_on)
        .bind(account.email_verified)
        .bind(account.account_status.as_str())
        .bind(account.lifetime_used_credits)
        .bind(account.lifetime_saved_cents)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::AlreadyExists {
                    entity: "account",
                    id: account.user_id.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn apply(
        &self,
        user_id: &UserId,
        op: LedgerOp,
        now: DateTime<Utc>,
    ) -> Result<LedgerOutcome> {
        let mut db_tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *db_tx)
        .await?
        .ok_or_else(|| StoreError::account_not_found(user_id))?;

        let mut account = account_from_row(&row)?;
        let (outcome, transaction) = op.apply(&mut account, now)?;

        Self::write_account(&mut *db_tx, &account).await?;
        if let Some(tx) = &transaction {
            Self::insert_transaction(&mut *db_tx, tx).await?;
        }

        db_tx.commit().await?;

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
        let rows = sqlx::query(
            "SELECT id, user_id, amount, category, kind, description, balance_after, metadata, created_at \
             FROM credit_transactions WHERE user_id = $1 \
             ORDER BY id DESC OFFSET $2 LIMIT $3",
        )
        .bind(user_id.as_uuid())
        .bind(to_i64(offset))
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    // =========================================================================
    // Artifact Operations
    // =========================================================================

    async fn put_artifact(&self, artifact: &Artifact) -> Result<()> {
        sqlx::query(
            "INSERT INTO artifacts (user_id, category, content, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, category) \
             DO UPDATE SET content = EXCLUDED.content, created_at = EXCLUDED.created_at",
        )
        .bind(artifact.user_id.as_uuid())
        .bind(artifact.category.as_str())
        .bind(&artifact.content)
        .bind(artifact.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_artifact(
        &self,
        user_id: &UserId,
        category: GenerationCategory,
    ) -> Result<Option<Artifact>> {
        let row = sqlx::query(
            "SELECT content, created_at FROM artifacts WHERE user_id = $1 AND category = $2",
        )
        .bind(user_id.as_uuid())
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Artifact> {
            Ok(Artifact {
                user_id: *user_id,
                category,
                content: row.try_get("content")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn account_from_row(row: &PgRow) -> Result<Account> {
    let tier: String = row.try_get("subscription_tier")?;
    let status: String = row.try_get("account_status")?;

    Ok(Account {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        email: row.try_get("email")?,
        subscription_tier: SubscriptionTier::parse(&tier)
            .ok_or_else(|| StoreError::Serialization(format!("unknown tier: {tier}")))?,
        total_credits: row.try_get("total_credits")?,
        daily_credits_used: row.try_get("daily_credits_used")?,
        daily_window: row.try_get::<NaiveDate, _>("daily_window")?,
        level: from_i32(row.try_get("level")?)?,
        experience_points: row.try_get("experience_points")?,
        current_streak: from_i32(row.try_get("current_streak")?)?,
        longest_streak: from_i32(row.try_get("longest_streak")?)?,
        last_consumed_on: row.try_get("last_consumed_on")?,
        email_verified: row.try_get("email_verified")?,
        account_status: AccountStatus::parse(&status)
            .ok_or_else(|| StoreError::Serialization(format!("unknown status: {status}")))?,
        lifetime_used_credits: row.try_get("lifetime_used_credits")?,
        lifetime_saved_cents: row.try_get("lifetime_saved_cents")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<CreditTransaction> {
    let id: String = row.try_get("id")?;
    let category: String = row.try_get("category")?;

    Ok(CreditTransaction {
        id: TransactionId::from_str(&id)
            .map_err(|e| StoreError::Serialization(format!("{e}: {id}")))?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        amount: row.try_get("amount")?,
        category: TransactionCategory::parse(&category)
            .ok_or_else(|| StoreError::Serialization(format!("unknown category: {category}")))?,
        kind: row.try_get("kind")?,
        description: row.try_get("description")?,
        balance_after: row.try_get("balance_after")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Serialization(format!("{value} exceeds INTEGER")))
}

fn from_i32(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Serialization(format!("negative counter: {value}")))
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codia_core::{Charge, LedgerError, PriceTable};

    async fn test_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url, 4).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn logo_charge() -> Charge {
        let price = PriceTable::default()
            .price(GenerationCategory::Logo)
            .unwrap();
        Charge::new(GenerationCategory::Logo, price, serde_json::Value::Null)
    }

    #[test]
    fn counters_convert_within_range() {
        assert_eq!(to_i32(7).unwrap(), 7);
        assert!(to_i32(u32::MAX).is_err());
        assert_eq!(from_i32(3).unwrap(), 3);
        assert!(from_i32(-1).is_err());
        assert_eq!(to_i64(usize::MAX), i64::MAX);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn account_roundtrip_and_duplicate() {
        let store = test_store().await;
        let account = Account::new(UserId::generate(), Some("pg@codia.test".into()));
        store.create_account(&account).await.unwrap();

        let loaded = store.get_account(&account.user_id).await.unwrap().unwrap();
        assert_eq!(loaded.email, account.email);
        assert_eq!(loaded.subscription_tier, SubscriptionTier::Free);

        let again = store.create_account(&account).await;
        assert!(matches!(again, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn consume_and_refund_are_logged() {
        let store = test_store().await;
        let user_id = UserId::generate();
        store
            .create_account(&Account::new(user_id, None))
            .await
            .unwrap();

        let consumption = store
            .consume(&user_id, logo_charge(), Utc::now())
            .await
            .unwrap();
        store
            .refund(&user_id, &consumption, "upstream failed", Utc::now())
            .await
            .unwrap();

        let ledger = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].kind, "refund");
        assert_eq!(ledger[1].id, consumption.transaction_id);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_consumes_serialize_on_the_row() {
        let store = test_store().await;
        let user_id = UserId::generate();
        store
            .create_account(&Account::new(user_id, None))
            .await
            .unwrap();

        let attempts = (0..3).map(|_| store.consume(&user_id, logo_charge(), Utc::now()));
        let results = futures::future::join_all(attempts).await;

        let rejected = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(StoreError::Ledger(LedgerError::InsufficientCredits { .. }))
                )
            })
            .count();
        assert_eq!(rejected, 1);
    }
}
