//! Credit balance, consumption and transaction handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use codia_core::{
    AddCreditsRequest, AddCreditsResponse, Balance, Charge, ConsumeRequest, ConsumeResponse,
    CreditTransaction, UserId,
};

use crate::auth::{AdminAuth, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Get the caller's balance: daily allowance, purchased pool and progression.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Balance>, ApiError> {
    let account = state
        .store
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(account.balance(Utc::now())))
}

/// Charge one generation by category name.
pub async fn consume(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<ConsumeRequest>, JsonRejection>,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let Json(body) = body?;
    let (category, price) = state.prices.price_by_name(&body.category)?;
    let charge = Charge::new(
        category,
        price,
        body.metadata.unwrap_or(serde_json::Value::Null),
    );

    let consumption = state
        .store
        .consume(&auth.user_id, charge, Utc::now())
        .await?;

    tracing::info!(
        user_id = %auth.user_id,
        category = %category,
        daily = consumption.breakdown.daily,
        purchased = consumption.breakdown.purchased,
        remaining = consumption.remaining.total,
        "Credits consumed"
    );

    Ok(Json(ConsumeResponse::from(consumption)))
}

/// Add purchased credits to the caller's pool.
pub async fn add_credits(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<AddCreditsRequest>, JsonRejection>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let Json(body) = body?;
    let new_balance = state
        .store
        .add_credits(
            &auth.user_id,
            body.amount,
            body.description.as_deref(),
            Utc::now(),
        )
        .await?;

    tracing::info!(
        user_id = %auth.user_id,
        amount = body.amount,
        new_balance = new_balance,
        "Credits added"
    );

    Ok(Json(AddCreditsResponse {
        success: true,
        new_balance,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Signed amount (positive = credit, negative = debit).
    pub amount: i64,
    /// Coarse category.
    pub category: String,
    /// Type within the category.
    pub kind: String,
    /// Purchased pool after this entry.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Metadata.
    pub metadata: serde_json::Value,
    /// Timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            category: tx.category.as_str().to_string(),
            kind: tx.kind.clone(),
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            metadata: tx.metadata.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    state
        .store
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let transactions = state
        .store
        .list_transactions_by_user(&auth.user_id, limit + 1, query.offset)
        .await?;

    let has_more = transactions.len() > limit;
    let transactions: Vec<_> = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Admin grant request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantCreditsRequest {
    /// Recipient.
    pub user_id: String,
    /// Credits to grant.
    pub amount: i64,
    /// Reason recorded on the ledger.
    pub reason: String,
}

/// Admin endpoint to grant bonus credits.
pub async fn admin_grant_credits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    body: Result<Json<GrantCreditsRequest>, JsonRejection>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let Json(body) = body?;
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid user ID".into()))?;

    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::Validation("reason is required".into()));
    }

    let new_balance = state
        .store
        .grant_bonus(&user_id, body.amount, reason, Utc::now())
        .await?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        amount = body.amount,
        reason = %reason,
        new_balance = new_balance,
        "Credits granted"
    );

    Ok(Json(AddCreditsResponse {
        success: true,
        new_balance,
    }))
}
