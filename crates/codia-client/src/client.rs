//! Ledger HTTP client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use codia_core::{AddCreditsRequest, AddCreditsResponse, Balance, ConsumeRequest, ConsumeResponse};

use crate::cache::BalanceSource;
use crate::error::ClientError;

/// Credit ledger API client.
///
/// Every call carries the end user's bearer token; the client itself holds
/// no credentials.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    base_url: String,
}

impl LedgerClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"https://api.codia.app"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the caller's balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, token: &str) -> Result<Balance, ClientError> {
        let url = format!("{}/v1/credits/balance", self.base_url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        self.handle_response(response).await
    }

    /// Charge one generation.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InsufficientCredits` when both pools together
    /// cannot cover the price, or any other request error.
    pub async fn consume(
        &self,
        token: &str,
        request: &ConsumeRequest,
    ) -> Result<ConsumeResponse, ClientError> {
        let url = format!("{}/v1/credits/consume", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Add purchased credits.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidAmount` for non-positive amounts, or any
    /// other request error.
    pub async fn add_credits(
        &self,
        token: &str,
        request: &AddCreditsRequest,
    ) -> Result<AddCreditsResponse, ClientError> {
        let url = format!("{}/v1/credits/add", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let Ok(api_error) = response.json::<ErrorEnvelope>().await else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        let ErrorBody {
            code,
            message,
            details,
        } = api_error.error;
        let detail = |key: &str| {
            details
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(0)
        };

        tracing::debug!(status = %status, code = %code, "Ledger request failed");

        match code.as_str() {
            "unauthenticated" => Err(ClientError::Unauthenticated),
            "insufficient_credits" => Err(ClientError::InsufficientCredits {
                available: detail("available"),
                required: detail("required"),
            }),
            "invalid_amount" => Err(ClientError::InvalidAmount { message }),
            _ => Err(ClientError::Api {
                code,
                message,
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl BalanceSource for LedgerClient {
    async fn fetch_balance(&self, token: &str) -> Result<Balance, ClientError> {
        self.get_balance(token).await
    }

    async fn consume(
        &self,
        token: &str,
        request: &ConsumeRequest,
    ) -> Result<ConsumeResponse, ClientError> {
        LedgerClient::consume(self, token, request).await
    }

    async fn add_credits(
        &self,
        token: &str,
        request: &AddCreditsRequest,
    ) -> Result<AddCreditsResponse, ClientError> {
        LedgerClient::add_credits(self, token, request).await
    }
}

/// Error envelope returned by the service.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn balance_body(purchased: i64) -> serde_json::Value {
        json!({
            "daily": { "used": 4, "limit": 10, "remaining": 6 },
            "purchased": purchased,
            "total": 6 + purchased,
            "tier": "free",
            "level": 1,
            "xp": 40,
            "nextLevelXp": 100,
            "streak": { "current": 1, "longest": 3 }
        })
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = LedgerClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn balance_is_fetched_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/credits/balance"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(balance_body(12)))
            .mount(&server)
            .await;

        let client = LedgerClient::new(server.uri()).unwrap();
        let balance = client.get_balance("user-jwt").await.unwrap();

        assert_eq!(balance.purchased, 12);
        assert_eq!(balance.total, 18);
        assert_eq!(balance.daily.remaining, 6);
        assert_eq!(balance.next_level_xp, 100);
    }

    #[tokio::test]
    async fn insufficient_credits_are_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/credits/consume"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "code": "insufficient_credits",
                    "message": "Not enough credits for this operation",
                    "details": { "available": 3, "required": 5 }
                }
            })))
            .mount(&server)
            .await;

        let client = LedgerClient::new(server.uri()).unwrap();
        let err = client
            .consume(
                "user-jwt",
                &ConsumeRequest {
                    category: "logo".into(),
                    metadata: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::InsufficientCredits {
                available: 3,
                required: 5
            }
        ));
    }

    #[tokio::test]
    async fn error_codes_are_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/credits/add"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "invalid_amount", "message": "invalid amount: 0" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/credits/balance"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": "unauthenticated", "message": "authentication required" }
            })))
            .mount(&server)
            .await;

        let client = LedgerClient::new(server.uri()).unwrap();

        let add = client
            .add_credits(
                "user-jwt",
                &AddCreditsRequest {
                    amount: 0,
                    description: None,
                },
            )
            .await;
        assert!(matches!(add, Err(ClientError::InvalidAmount { .. })));

        let balance = client.get_balance("expired").await;
        assert!(matches!(balance, Err(ClientError::Unauthenticated)));
    }

    #[tokio::test]
    async fn non_envelope_errors_keep_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/credits/balance"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = LedgerClient::new(server.uri()).unwrap();
        let err = client.get_balance("user-jwt").await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 503, .. }));
    }
}
