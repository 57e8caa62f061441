//! In-memory storage implementation.
//!
//! All state sits behind one mutex, so every ledger operation is serialized.
//! Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use codia_core::{Account, Artifact, CreditTransaction, GenerationCategory, UserId};

use crate::error::{Result, StoreError};
use crate::{LedgerOp, LedgerOutcome, Store};

#[derive(Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    /// Per-user ledger in insertion order.
    transactions: HashMap<UserId, Vec<CreditTransaction>>,
    artifacts: HashMap<(UserId, GenerationCategory), Artifact>,
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(&self, account: &Account) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&account.user_id) {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: account.user_id.to_string(),
            });
        }
        state.accounts.insert(account.user_id, account.clone());
        Ok(())
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(user_id).cloned())
    }

    async fn apply(
        &self,
        user_id: &UserId,
        op: LedgerOp,
        now: DateTime<Utc>,
    ) -> Result<LedgerOutcome> {
        let mut state = self.state.lock().await;

        let mut account = state
            .accounts
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::account_not_found(user_id))?;

        let (outcome, transaction) = op.apply(&mut account, now)?;

        state.accounts.insert(*user_id, account);
        if let Some(tx) = transaction {
            state.transactions.entry(*user_id).or_default().push(tx);
        }

        tracing::debug!(%user_id, op = op.name(), "ledger op applied");
        Ok(outcome)
    }

    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .get(user_id)
            .map(|ledger| {
                ledger
                    .iter()
                    .rev()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_artifact(&self, artifact: &Artifact) -> Result<()> {
        self.state
            .lock()
            .await
            .artifacts
            .insert((artifact.user_id, artifact.category), artifact.clone());
        Ok(())
    }

    async fn get_artifact(
        &self,
        user_id: &UserId,
        category: GenerationCategory,
    ) -> Result<Option<Artifact>> {
        Ok(self
            .state
            .lock()
            .await
            .artifacts
            .get(&(*user_id, category))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use codia_core::{
        AccountStatus, Charge, LedgerError, PriceTable, TransactionCategory,
        EMAIL_VERIFICATION_BONUS_CREDITS,
    };

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    fn charge(category: GenerationCategory) -> Charge {
        let price = PriceTable::default().price(category).unwrap();
        Charge::new(category, price, serde_json::Value::Null)
    }

    async fn store_with_account(purchased: i64) -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        let mut account = Account::new_at(user_id, None, noon());
        account.total_credits = purchased;
        store.create_account(&account).await.unwrap();
        (store, user_id)
    }

    #[tokio::test]
    async fn create_is_unique_per_user() {
        let (store, user_id) = store_with_account(0).await;
        let again = Account::new(user_id, None);
        let result = store.create_account(&again).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .consume(&UserId::generate(), charge(GenerationCategory::Logo), noon())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn consume_drains_daily_then_purchased() {
        let (store, user_id) = store_with_account(20).await;

        let first = store
            .consume(&user_id, charge(GenerationCategory::Storefront), noon())
            .await
            .unwrap();
        assert_eq!(first.breakdown.daily, 10);
        assert_eq!(first.breakdown.purchased, 0);

        let second = store
            .consume(&user_id, charge(GenerationCategory::Logo), noon())
            .await
            .unwrap();
        assert_eq!(second.breakdown.daily, 0);
        assert_eq!(second.breakdown.purchased, 5);
        assert_eq!(second.remaining.total, 15);

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.total_credits, 15);
        assert_eq!(account.lifetime_used_credits, 15);
    }

    #[tokio::test]
    async fn rejected_consume_leaves_state_untouched() {
        let (store, user_id) = store_with_account(0).await;
        store
            .consume(&user_id, charge(GenerationCategory::Storefront), noon())
            .await
            .unwrap();
        let before = store.get_account(&user_id).await.unwrap().unwrap();

        let result = store
            .consume(&user_id, charge(GenerationCategory::Logo), noon())
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Ledger(LedgerError::InsufficientCredits {
                available: 0,
                required: 5
            }))
        ));

        let after = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(
            store
                .list_transactions_by_user(&user_id, 10, 0)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn next_day_resets_the_allowance() {
        let (store, user_id) = store_with_account(0).await;
        store
            .consume(&user_id, charge(GenerationCategory::Storefront), noon())
            .await
            .unwrap();

        let tomorrow = noon() + Duration::days(1);
        let consumption = store
            .consume(&user_id, charge(GenerationCategory::Logo), tomorrow)
            .await
            .unwrap();
        assert_eq!(consumption.breakdown.daily, 5);
        assert_eq!(consumption.streak.current, 2);
    }

    #[tokio::test]
    async fn refund_restores_both_pools() {
        let (store, user_id) = store_with_account(5).await;
        store
            .consume(&user_id, charge(GenerationCategory::Logo), noon())
            .await
            .unwrap();
        let consumption = store
            .consume(&user_id, charge(GenerationCategory::Storefront), noon())
            .await
            .unwrap();
        assert_eq!(consumption.breakdown.daily, 5);
        assert_eq!(consumption.breakdown.purchased, 5);

        let balance = store
            .refund(&user_id, &consumption, "upstream failed", noon())
            .await
            .unwrap();
        assert_eq!(balance, 5);

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.daily_credits_used, 5);

        let ledger = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(ledger[0].kind, "refund");
        assert_eq!(ledger[0].amount, 10);
    }

    #[tokio::test]
    async fn verify_email_is_granted_once() {
        let (store, user_id) = store_with_account(0).await;

        let first = store.verify_email(&user_id, noon()).await.unwrap();
        assert!(!first.already_verified);
        assert_eq!(first.new_balance, EMAIL_VERIFICATION_BONUS_CREDITS);

        let second = store.verify_email(&user_id, noon()).await.unwrap();
        assert!(second.already_verified);
        assert_eq!(second.new_balance, EMAIL_VERIFICATION_BONUS_CREDITS);

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.account_status, AccountStatus::Active);

        let ledger = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].category, TransactionCategory::Bonus);
    }

    #[tokio::test]
    async fn deleted_account_rejects_credit_movement() {
        let (store, user_id) = store_with_account(50).await;
        let deleted = store.delete_account(&user_id, noon()).await.unwrap();
        assert_eq!(deleted.account_status, AccountStatus::Deleted);

        let result = store.add_credits(&user_id, 10, None, noon()).await;
        assert!(matches!(
            result,
            Err(StoreError::Ledger(LedgerError::AccountInactive { .. }))
        ));
    }

    #[tokio::test]
    async fn transactions_paginate_newest_first() {
        let (store, user_id) = store_with_account(0).await;
        for amount in 1..=5 {
            store
                .add_credits(&user_id, amount, None, noon())
                .await
                .unwrap();
        }

        let page = store
            .list_transactions_by_user(&user_id, 2, 1)
            .await
            .unwrap();
        let amounts: Vec<i64> = page.iter().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![4, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumes_never_overdraw() {
        let (store, user_id) = store_with_account(10).await;
        let store = Arc::new(store);

        // 20 credits in total, five logo charges of 5 each.
        let tasks = (0..5).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .consume(&user_id, charge(GenerationCategory::Logo), noon())
                    .await
            })
        });
        let results = futures::future::join_all(tasks).await;

        let succeeded = results
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(|result| result.is_ok())
            .count();
        assert_eq!(succeeded, 4);

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.total_credits, 0);
        assert_eq!(account.daily_credits_used, 10);
    }

    #[tokio::test]
    async fn artifacts_are_keyed_by_category() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .put_artifact(&Artifact::new(
                user_id,
                GenerationCategory::BrandVoice,
                serde_json::json!({"tone": "warm"}),
            ))
            .await
            .unwrap();

        let voice = store
            .get_artifact(&user_id, GenerationCategory::BrandVoice)
            .await
            .unwrap();
        assert_eq!(voice.unwrap().content["tone"], "warm");
        assert!(store
            .get_artifact(&user_id, GenerationCategory::Logo)
            .await
            .unwrap()
            .is_none());
    }
}
