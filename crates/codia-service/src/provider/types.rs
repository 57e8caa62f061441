//! Wire types of the OpenAI-compatible provider API.

use serde::{Deserialize, Serialize};

/// Chat completion request.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model name.
    pub model: &'a str,
    /// Conversation.
    pub messages: Vec<ChatMessage<'a>>,
    /// Forces a JSON object answer.
    pub response_format: ResponseFormat,
    /// Sampling temperature.
    pub temperature: f32,
}

/// One chat message.
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    /// `system` or `user`.
    pub role: &'static str,
    /// Message text.
    pub content: &'a str,
}

/// Response format selector.
#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    /// Always `json_object`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ResponseFormat {
    /// JSON mode.
    #[must_use]
    pub const fn json_object() -> Self {
        Self {
            kind: "json_object",
        }
    }
}

/// Chat completion response (fields we read).
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate answers.
    pub choices: Vec<ChatChoice>,
}

/// One candidate answer.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The assistant message.
    pub message: ChatChoiceMessage,
}

/// Assistant message.
#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    /// Message text; a JSON document in JSON mode.
    #[serde(default)]
    pub content: Option<String>,
}

/// Image generation request.
#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    /// Model name.
    pub model: &'a str,
    /// Prompt.
    pub prompt: &'a str,
    /// Number of images.
    pub n: u8,
    /// Output size.
    pub size: &'static str,
}

/// Image generation response.
#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    /// Generated images.
    pub data: Vec<ImageData>,
}

/// One generated image.
#[derive(Debug, Deserialize)]
pub struct ImageData {
    /// Hosted image URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Inline base64 PNG, when the provider returns one instead of a URL.
    #[serde(default)]
    pub b64_json: Option<String>,
    /// Prompt as rewritten by the model.
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

/// Error body of the provider API.
#[derive(Debug, Deserialize)]
pub struct ProviderErrorResponse {
    /// Error details.
    pub error: ProviderErrorBody,
}

/// Error details.
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    /// Human-readable message.
    pub message: String,
}
