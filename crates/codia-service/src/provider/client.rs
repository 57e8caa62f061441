//! OpenAI-compatible provider client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ImageRequest, ImageResponse,
    ProviderErrorResponse, ResponseFormat,
};
use super::{GenerationProvider, ProviderError};
use crate::config::ProviderConfig;

/// Provider API client.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl ProviderClient {
    /// Create a client from configuration. Every upstream call gives up
    /// after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if no API key is configured, or
    /// `ProviderError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider API key not set".into()))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    /// Map the upstream status and decode the body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => Err(ProviderError::PaymentRequired),
            _ => {
                let message = response
                    .json::<ProviderErrorResponse>()
                    .await
                    .map_or_else(|_| format!("HTTP {status}"), |body| body.error.message);
                Err(ProviderError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for ProviderClient {
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.text_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat::json_object(),
            temperature: 0.8,
        };

        tracing::debug!(model = %self.text_model, "Requesting chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let completion: ChatCompletionResponse = self.handle_response(response).await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("empty completion".into()))?;

        serde_json::from_str(&content)
            .map_err(|e| ProviderError::InvalidResponse(format!("completion is not JSON: {e}")))
    }

    async fn generate_image(&self, prompt: &str) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/images/generations", self.base_url);
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: "1024x1024",
        };

        tracing::debug!(model = %self.image_model, "Requesting image generation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let images: ImageResponse = self.handle_response(response).await?;
        let image = images
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no image returned".into()))?;

        let image_url = match (image.url, image.b64_json) {
            (Some(url), _) => url,
            (None, Some(b64)) => format!("data:image/png;base64,{b64}"),
            (None, None) => {
                return Err(ProviderError::InvalidResponse(
                    "image has neither url nor data".into(),
                ))
            }
        };

        Ok(serde_json::json!({
            "imageUrl": image_url,
            "revisedPrompt": image.revised_prompt,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ProviderClient {
        ProviderClient::new(
            &ProviderConfig {
                api_url: format!("{}/", server.uri()),
                api_key: Some("sk-test".into()),
                ..ProviderConfig::default()
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let result = ProviderClient::new(&ProviderConfig::default(), Duration::from_secs(5));
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[tokio::test]
    async fn completion_content_is_parsed_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"headline\":\"Olá\"}"}}]
            })))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .complete_json("system", "user")
            .await
            .unwrap();
        assert_eq!(value["headline"], "Olá");
    }

    #[tokio::test]
    async fn non_json_completion_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "not json"}}]
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).complete_json("s", "u").await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn upstream_statuses_are_mapped() {
        for (status, check) in [
            (429, "rate"),
            (402, "payment"),
            (500, "api"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/images/generations"))
                .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                    "error": {"message": "upstream says no"}
                })))
                .mount(&server)
                .await;

            let result = client_for(&server).generate_image("logo").await;
            match (check, result) {
                ("rate", Err(ProviderError::RateLimited))
                | ("payment", Err(ProviderError::PaymentRequired)) => {}
                ("api", Err(ProviderError::Api { status, message })) => {
                    assert_eq!(status, 500);
                    assert_eq!(message, "upstream says no");
                }
                (check, other) => panic!("{check}: unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn image_url_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": "https://img.test/1.png", "revised_prompt": "a logo"}]
            })))
            .mount(&server)
            .await;

        let value = client_for(&server).generate_image("logo").await.unwrap();
        assert_eq!(value["imageUrl"], "https://img.test/1.png");
        assert_eq!(value["revisedPrompt"], "a logo");
    }
}
