//! API error types and responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use codia_core::LedgerError;
use codia_store::StoreError;

use crate::provider::ProviderError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    #[error("authentication required")]
    Unauthenticated,

    /// Valid credentials, but the action is not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed or incomplete input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Non-positive credit amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Both pools together cannot cover the cost.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Daily remaining plus purchased.
        available: i64,
        /// Cost of the operation.
        required: i64,
    },

    /// Upstream provider rate limit.
    #[error("rate limit exceeded, try again later")]
    RateLimited,

    /// Upstream provider account is out of funds.
    #[error("generation provider payment required")]
    UpstreamPaymentRequired,

    /// Upstream provider failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientCredits { .. } | Self::UpstreamPaymentRequired => {
                StatusCode::PAYMENT_REQUIRED
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::Conflict(_) => "conflict",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::RateLimited => "rate_limited",
            Self::UpstreamPaymentRequired => "upstream_payment_required",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match &self {
            Self::InsufficientCredits {
                available,
                required,
            } => (
                "Not enough credits for this operation".to_string(),
                Some(serde_json::json!({
                    "available": available,
                    "required": required
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                ("An internal error occurred".to_string(), None)
            }
            Self::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream provider error");
                ("The generation provider failed".to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCredits {
                available,
                required,
            } => Self::InsufficientCredits {
                available,
                required,
            },
            LedgerError::InvalidAmount(amount) => Self::InvalidAmount(amount),
            LedgerError::UnknownCategory(_) | LedgerError::InvalidId(_) => {
                Self::Validation(err.to_string())
            }
            LedgerError::AccountInactive { .. } => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            StoreError::AlreadyExists { entity, .. } => {
                Self::Conflict(format!("{entity} already exists"))
            }
            StoreError::Ledger(ledger) => ledger.into(),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited => Self::RateLimited,
            ProviderError::PaymentRequired => Self::UpstreamPaymentRequired,
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_api_codes() {
        let insufficient: ApiError = LedgerError::InsufficientCredits {
            available: 3,
            required: 5,
        }
        .into();
        assert_eq!(insufficient.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(insufficient.code(), "insufficient_credits");

        let unknown: ApiError = LedgerError::UnknownCategory("tattoo".into()).into();
        assert_eq!(unknown.code(), "validation_error");

        let inactive: ApiError = LedgerError::AccountInactive {
            status: codia_core::AccountStatus::Deleted,
        }
        .into();
        assert_eq!(inactive.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_errors_map_to_api_codes() {
        let missing: ApiError = StoreError::NotFound {
            entity: "account",
            id: "x".into(),
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let duplicate: ApiError = StoreError::AlreadyExists {
            entity: "account",
            id: "x".into(),
        }
        .into();
        assert_eq!(duplicate.code(), "conflict");

        let amount: ApiError = StoreError::Ledger(LedgerError::InvalidAmount(0)).into();
        assert_eq!(amount.code(), "invalid_amount");
    }

    #[test]
    fn provider_errors_map_to_api_codes() {
        assert_eq!(
            ApiError::from(ProviderError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(ProviderError::PaymentRequired).code(),
            "upstream_payment_required"
        );
        let api = ApiError::from(ProviderError::Api {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(api.status(), StatusCode::BAD_GATEWAY);
    }
}
