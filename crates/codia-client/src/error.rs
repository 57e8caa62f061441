//! Client error types.

/// Errors that can occur when using the ledger client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or rejected bearer token, or no signed-in session.
    #[error("authentication required")]
    Unauthenticated,

    /// Both pools together cannot cover the cost.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Daily remaining plus purchased.
        available: i64,
        /// Cost of the operation.
        required: i64,
    },

    /// Non-positive credit amount.
    #[error("invalid amount: {message}")]
    InvalidAmount {
        /// Server message.
        message: String,
    },

    /// Server returned any other error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
