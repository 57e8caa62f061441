//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `AuthUser` - End-user authentication via the identity platform's JWT
//! - `AdminAuth` - Operator authentication for privileged endpoints
//!
//! Tokens are HS256-signed with the platform's shared secret when
//! `AUTH_JWT_SECRET` is configured; otherwise RS256 signatures are checked
//! against the platform's JWKS.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use codia_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Constants
// ============================================================================

/// How long to cache JWKS keys before refreshing.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// Timeout for JWKS fetch requests.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated user extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID (`sub` claim).
    pub user_id: UserId,
    /// E-mail claim, if present.
    pub email: Option<String>,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthenticated)?;

        let claims = validate_jwt(token, state).await?;

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthenticated)?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}

/// Operator authentication via the `X-Admin-Key` header.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Forbidden("admin API disabled".into()))?;

        if !constant_time_equal(admin_key.as_bytes(), expected_key.as_bytes()) {
            return Err(ApiError::Unauthenticated);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(AdminAuth { admin_id })
    }
}

/// Compare two secrets without short-circuiting on the first differing byte.
fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// JWT claims issued by the identity platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Audience (can be string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: Option<i64>,
    /// User e-mail.
    #[serde(default)]
    pub email: Option<String>,
}

/// Validate a bearer token with the configured scheme.
async fn validate_jwt(token: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let (decoding_key, validation) = if let Some(secret) = &state.config.auth_jwt_secret {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&state.config.auth_audience]);
        (DecodingKey::from_secret(secret.as_bytes()), validation)
    } else {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            ApiError::Unauthenticated
        })?;

        let key = state
            .jwks
            .decoding_key(header.kid.as_deref(), &state.config.auth_base_url)
            .await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&state.config.auth_audience]);
        validation.set_issuer(&[&state.config.auth_base_url]);
        (key, validation)
    };

    let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        ApiError::Unauthenticated
    })?;

    Ok(token_data.claims)
}

// ============================================================================
// JWKS
// ============================================================================

/// JWKS (JSON Web Key Set) response structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// List of JWK keys.
    pub keys: Vec<Jwk>,
}

/// Single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// RSA public key modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public key exponent (base64url encoded).
    pub e: Option<String>,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    /// Used for tokens without `kid`.
    default_key: Option<DecodingKey>,
    last_updated: Option<Instant>,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.last_updated
            .is_some_and(|at| at.elapsed() < JWKS_CACHE_DURATION)
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            None => self.default_key.clone(),
        }
    }
}

/// Signing keys of the identity platform, refreshed hourly.
pub struct JwksCache {
    client: reqwest::Client,
    inner: RwLock<CachedKeys>,
}

impl JwksCache {
    /// Create an empty cache; keys are fetched on first use.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            inner: RwLock::new(CachedKeys {
                keys: HashMap::new(),
                default_key: None,
                last_updated: None,
            }),
        }
    }

    async fn decoding_key(
        &self,
        kid: Option<&str>,
        auth_base_url: &str,
    ) -> Result<DecodingKey, ApiError> {
        {
            let cached = self.inner.read().await;
            if cached.is_fresh() {
                if let Some(key) = cached.lookup(kid) {
                    return Ok(key);
                }
            }
        }

        let jwks = self.fetch(auth_base_url).await?;

        let mut cached = self.inner.write().await;
        cached.keys.clear();
        cached.default_key = None;
        cached.last_updated = Some(Instant::now());

        for jwk in &jwks.keys {
            if let Some(decoding_key) = jwk_to_decoding_key(jwk) {
                if let Some(key_kid) = &jwk.kid {
                    cached.keys.insert(key_kid.clone(), decoding_key.clone());
                }
                if cached.default_key.is_none() {
                    cached.default_key = Some(decoding_key);
                }
            }
        }

        cached.lookup(kid).ok_or(ApiError::Unauthenticated)
    }

    async fn fetch(&self, auth_base_url: &str) -> Result<Jwks, ApiError> {
        let jwks_url = format!("{}/.well-known/jwks.json", auth_base_url.trim_end_matches('/'));

        tracing::debug!(url = %jwks_url, "Fetching JWKS");

        let response = self.client.get(&jwks_url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %jwks_url, "Failed to fetch JWKS");
            ApiError::Upstream("failed to fetch authentication keys".into())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                status = %response.status(),
                url = %jwks_url,
                "JWKS fetch returned non-success status"
            );
            return Err(ApiError::Upstream(
                "failed to fetch authentication keys".into(),
            ));
        }

        let jwks: Jwks = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            ApiError::Upstream("failed to parse authentication keys".into())
        })?;

        tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched successfully");

        Ok(jwks)
    }
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a JWK to a `DecodingKey`. Only RSA keys are supported.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }

    let n = jwk.n.as_ref()?;
    let e = jwk.e.as_ref()?;

    DecodingKey::from_rsa_components(n, e).ok()
}
