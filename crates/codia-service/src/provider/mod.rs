//! Upstream AI provider integration.
//!
//! Generation handlers talk to the provider through [`GenerationProvider`],
//! so tests can point the service at a mock server or swap the client out.

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::ProviderClient;

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered 429.
    #[error("provider rate limit exceeded")]
    RateLimited,

    /// Upstream answered 402 (provider account out of funds).
    #[error("provider payment required")]
    PaymentRequired,

    /// Upstream answered with another non-success status.
    #[error("provider API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, if any.
        message: String,
    },

    /// Upstream answered 2xx with a body we could not use.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Something that can run text and image generations.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Run a chat completion in JSON mode and return the parsed object.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` for transport failures, non-2xx statuses and
    /// unparseable bodies.
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Generate one image and return `{imageUrl, revisedPrompt?}`.
    ///
    /// # Errors
    ///
    /// Same as [`GenerationProvider::complete_json`].
    async fn generate_image(&self, prompt: &str) -> Result<serde_json::Value, ProviderError>;
}
