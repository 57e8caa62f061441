//! Common test utilities for Codia service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use codia_core::UserId;
use codia_service::auth::JwtClaims;
use codia_service::{create_router, AppState, GenerationProvider, ProviderConfig, ServiceConfig};
use codia_store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "test-secret";
pub const AUDIENCE: &str = "authenticated";
pub const ADMIN_KEY: &str = "test-admin-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and inspection.
    pub store: Arc<MemoryStore>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Harness without a generation provider.
    pub fn new() -> Self {
        Self::build(ProviderConfig::default(), 30, None)
    }

    /// Harness whose provider points at `api_url` (usually a wiremock server).
    pub fn with_provider(api_url: &str) -> Self {
        Self::with_provider_and_timeout(api_url, 30)
    }

    /// Like [`TestHarness::with_provider`], with a custom request timeout.
    pub fn with_provider_and_timeout(api_url: &str, request_timeout_seconds: u64) -> Self {
        Self::build(
            ProviderConfig {
                api_url: api_url.to_string(),
                api_key: Some("test-provider-key".into()),
                ..ProviderConfig::default()
            },
            request_timeout_seconds,
            None,
        )
    }

    /// Harness backed by an in-process generation provider.
    pub fn with_generation_provider(
        provider: Arc<dyn GenerationProvider>,
        request_timeout_seconds: u64,
    ) -> Self {
        Self::build(
            ProviderConfig::default(),
            request_timeout_seconds,
            Some(provider),
        )
    }

    fn build(
        provider_config: ProviderConfig,
        request_timeout_seconds: u64,
        provider: Option<Arc<dyn GenerationProvider>>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            auth_jwt_secret: Some(JWT_SECRET.into()),
            auth_audience: AUDIENCE.into(),
            admin_api_key: Some(ADMIN_KEY.into()),
            provider: provider_config,
            request_timeout_seconds,
            ..ServiceConfig::default()
        };

        let mut state = AppState::new(store.clone() as Arc<dyn Store>, config);
        if let Some(provider) = provider {
            state = state.with_provider(provider);
        }
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
        }
    }

    /// Authorization header value for the test user.
    pub fn user_auth(&self) -> HeaderValue {
        bearer(&self.test_user_id)
    }

    /// Register the test user's account.
    pub async fn create_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header(AUTHORIZATION, self.user_auth())
            .json(&json!({ "email": "dona@padaria.com.br" }))
            .await
            .assert_status_ok();
    }

    /// Add purchased credits to the test user.
    pub async fn add_credits(&self, amount: i64) {
        self.server
            .post("/v1/credits/add")
            .add_header(AUTHORIZATION, self.user_auth())
            .json(&json!({ "amount": amount }))
            .await
            .assert_status_ok();
    }

    /// Current balance of the test user.
    pub async fn balance(&self) -> serde_json::Value {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header(AUTHORIZATION, self.user_auth())
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint an HS256 platform token for `user_id`.
pub fn mint_token(user_id: &UserId, secret: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        aud: Some(json!(AUDIENCE)),
        iss: None,
        exp: now + 3600,
        iat: Some(now),
        email: Some("dona@padaria.com.br".into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// `Bearer <token>` for `user_id`, signed with the test secret.
pub fn bearer(user_id: &UserId) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", mint_token(user_id, JWT_SECRET)))
        .expect("Invalid header value")
}

/// Admin key header.
pub fn admin_key_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-admin-key"),
        HeaderValue::from_static(ADMIN_KEY),
    )
}
