//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use codia_core::{Account, Balance, VerifyEmailResponse};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// E-mail address.
    pub email: Option<String>,
    /// Subscription tier.
    pub tier: String,
    /// Lifecycle status.
    pub status: String,
    /// Whether the e-mail was verified.
    pub email_verified: bool,
    /// Current balance view.
    pub balance: Balance,
    /// Lifetime credits consumed.
    pub lifetime_used_credits: i64,
    /// Lifetime money saved, in cents.
    pub lifetime_saved_cents: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            email: account.email.clone(),
            tier: account.subscription_tier.as_str().to_string(),
            status: account.account_status.as_str().to_string(),
            email_verified: account.email_verified,
            balance: account.balance(Utc::now()),
            lifetime_used_credits: account.lifetime_used_credits,
            lifetime_saved_cents: account.lifetime_saved_cents,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create account request.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountRequest {
    /// E-mail; defaults to the token's `email` claim.
    pub email: Option<String>,
}

/// Register the caller's account.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<CreateAccountRequest>>,
) -> Result<Json<AccountResponse>, ApiError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let email = body.email.or(auth.email);

    let account = Account::new(auth.user_id, email);
    state.store.create_account(&account).await?;

    tracing::info!(user_id = %auth.user_id, "Account created");

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&account)))
}

/// Soft-delete the current user's account.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_account(&auth.user_id, Utc::now()).await?;

    tracing::info!(user_id = %auth.user_id, "Account deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Mark the caller's e-mail as verified and grant the one-time bonus.
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<VerifyEmailResponse>, ApiError> {
    let verification = state.store.verify_email(&auth.user_id, Utc::now()).await?;

    tracing::info!(
        user_id = %auth.user_id,
        already_verified = verification.already_verified,
        bonus_credits = verification.bonus_credits,
        "E-mail verified"
    );

    Ok(Json(VerifyEmailResponse {
        success: true,
        verification,
    }))
}
