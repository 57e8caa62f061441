//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process map; state is lost on restart.
    Memory,
    /// PostgreSQL at `DATABASE_URL`.
    Postgres,
    /// `RocksDB` under `DATA_DIR` (feature `rocksdb-backend`).
    RocksDb,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "rocksdb" | "rocks" => Some(Self::RocksDb),
            _ => None,
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Storage backend (default: memory).
    pub store_backend: StoreBackend,

    /// PostgreSQL connection string, required for the postgres backend.
    pub database_url: Option<String>,

    /// Maximum PostgreSQL pool size (default: 10).
    pub database_max_connections: u32,

    /// Path to the `RocksDB` data directory (default: "/data/codia").
    pub data_dir: String,

    /// Shared HS256 secret of the identity platform. When set, bearer tokens
    /// are validated with it instead of the JWKS.
    pub auth_jwt_secret: Option<String>,

    /// Identity platform base URL, used as issuer and JWKS host.
    pub auth_base_url: String,

    /// Expected JWT audience (default: "authenticated").
    pub auth_audience: String,

    /// Admin API key for the grant endpoint.
    pub admin_api_key: Option<String>,

    /// Upstream generation provider.
    pub provider: ProviderConfig,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Upstream AI provider settings (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base URL, without trailing slash.
    pub api_url: String,
    /// API key. Generation is disabled when absent.
    pub api_key: Option<String>,
    /// Chat model for text categories.
    pub text_model: String,
    /// Image model for `logo` and `product_image`.
    pub image_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".into(),
            api_key: None,
            text_model: "gpt-4o-mini".into(),
            image_model: "dall-e-3".into(),
        }
    }
}

/// Provider secrets file structure.
#[derive(Debug, Deserialize)]
struct ProviderSecrets {
    api_key: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Timeout for one upstream generation call.
    ///
    /// Always strictly below the request timeout, leaving a tenth of it (at
    /// least 100 ms, at most 5 s) to map the failure and answer.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        let request = Duration::from_secs(self.request_timeout_seconds);
        let margin = (request / 10).clamp(Duration::from_millis(100), Duration::from_secs(5));
        request.saturating_sub(margin)
    }

    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (secret_key, secret_url) = load_provider_secrets();

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => StoreBackend::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown STORE_BACKEND, using memory");
                StoreBackend::Memory
            }),
            Err(_) => defaults.store_backend,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            store_backend,
            database_url: std::env::var("DATABASE_URL").ok(),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET").ok(),
            auth_base_url: std::env::var("AUTH_BASE_URL").unwrap_or(defaults.auth_base_url),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            provider: ProviderConfig {
                api_url: secret_url
                    .or_else(|| std::env::var("PROVIDER_API_URL").ok())
                    .unwrap_or(defaults.provider.api_url),
                api_key: secret_key.or_else(|| std::env::var("PROVIDER_API_KEY").ok()),
                text_model: std::env::var("PROVIDER_TEXT_MODEL")
                    .unwrap_or(defaults.provider.text_model),
                image_model: std::env::var("PROVIDER_IMAGE_MODEL")
                    .unwrap_or(defaults.provider.image_model),
            },
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load provider secrets from file. Returns `(api_key, api_url)`.
fn load_provider_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [".secrets/provider.json", "../.secrets/provider.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<ProviderSecrets>(path) {
            tracing::info!(path = %path, "Loaded provider secrets from file");
            return (Some(secrets.api_key), secrets.api_url);
        }
    }

    tracing::debug!("Provider secrets file not found, using environment variables");
    (None, None)
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            data_dir: "/data/codia".into(),
            auth_jwt_secret: None,
            auth_base_url: "http://localhost:54321/auth/v1".into(),
            auth_audience: "authenticated".into(),
            admin_api_key: None,
            provider: ProviderConfig::default(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 120,
        }
    }
}
