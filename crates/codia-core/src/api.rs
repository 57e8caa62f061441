//! Wire types shared by the HTTP service and the client SDK.

use serde::{Deserialize, Serialize};

use crate::ledger::{Consumption, Verification};

/// Body of `POST /v1/credits/consume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeRequest {
    /// Generation category name, looked up in the price table.
    pub category: String,
    /// Free-form data stored on the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Response of `POST /v1/credits/consume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResponse {
    /// Always `true`; failures use the error envelope.
    pub success: bool,
    /// The receipt.
    #[serde(flatten)]
    pub consumption: Consumption,
}

impl From<Consumption> for ConsumeResponse {
    fn from(consumption: Consumption) -> Self {
        Self {
            success: true,
            consumption,
        }
    }
}

/// Body of `POST /v1/credits/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCreditsRequest {
    /// Credits to add. Must be positive.
    pub amount: i64,
    /// Optional description for the ledger entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response of `POST /v1/credits/add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCreditsResponse {
    /// Always `true`; failures use the error envelope.
    pub success: bool,
    /// Purchased pool afterwards.
    pub new_balance: i64,
}

/// Response of `POST /v1/accounts/me/verify-email`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyEmailResponse {
    /// Always `true`; failures use the error envelope.
    pub success: bool,
    /// What was granted.
    #[serde(flatten)]
    pub verification: Verification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_request_metadata_is_optional() {
        let req: ConsumeRequest = serde_json::from_str(r#"{"category":"logo"}"#).unwrap();
        assert_eq!(req.category, "logo");
        assert!(req.metadata.is_none());
    }

    #[test]
    fn add_response_uses_camel_case() {
        let json = serde_json::to_value(AddCreditsResponse {
            success: true,
            new_balance: 8,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "newBalance": 8}));
    }
}
