//! Generation proxy handlers.
//!
//! Each generation is charged before the upstream call. When the provider
//! fails the charge is refunded and the mapped provider error is returned.
//! The upstream call outlives the request that started it.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use codia_core::{Artifact, Charge, ConsumeResponse, Consumption, GenerationCategory, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::prompts::{image_prompt, system_prompt, user_prompt, PromptInput};
use crate::provider::{GenerationProvider, ProviderError};
use crate::state::AppState;

/// Body of `POST /v1/generate/{category}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Business name.
    #[serde(default)]
    pub business_name: String,
    /// Free-text details; required for product and campaign categories.
    #[serde(default)]
    pub details: Option<String>,
    /// Extra context passed to the prompt as-is.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Generation response.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Category generated.
    pub category: GenerationCategory,
    /// Upstream result.
    pub result: serde_json::Value,
    /// Charge receipt.
    pub credits: ConsumeResponse,
}

fn parse_category(name: &str) -> Result<GenerationCategory, ApiError> {
    name.parse::<GenerationCategory>().map_err(ApiError::from)
}

fn validate(category: GenerationCategory, body: &GenerateRequest) -> Result<(), ApiError> {
    if body.business_name.trim().is_empty() {
        return Err(ApiError::Validation("businessName is required".into()));
    }

    let has_details = body
        .details
        .as_deref()
        .is_some_and(|details| !details.trim().is_empty());
    if category.requires_details() && !has_details {
        return Err(ApiError::Validation(format!(
            "details is required for {category}"
        )));
    }

    Ok(())
}

/// Upstream request for one generation, built before the charge.
#[derive(Debug)]
enum ProviderRequest {
    Text { system: &'static str, user: String },
    Image { prompt: String },
}

impl ProviderRequest {
    fn build(category: GenerationCategory, input: &PromptInput<'_>) -> Self {
        if category.is_image() {
            Self::Image {
                prompt: image_prompt(category, input),
            }
        } else {
            Self::Text {
                system: system_prompt(category),
                user: user_prompt(category, input),
            }
        }
    }

    async fn send(
        &self,
        provider: &dyn GenerationProvider,
    ) -> Result<serde_json::Value, ProviderError> {
        match self {
            Self::Text { system, user } => provider.complete_json(system, user).await,
            Self::Image { prompt } => provider.generate_image(prompt).await,
        }
    }
}

/// Generate content for a category, charging the caller.
///
/// Everything after the charge runs on its own task, so a request that
/// times out or disconnects still gets its refund or its artifact.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    auth: AuthUser,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let category = parse_category(&category)?;
    let Json(body) = body?;
    validate(category, &body)?;

    state
        .store
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let brand_voice = if category.uses_brand_voice() {
        state
            .store
            .get_artifact(&auth.user_id, GenerationCategory::BrandVoice)
            .await?
            .map(|artifact| artifact.content)
    } else {
        None
    };

    let provider = state
        .provider
        .clone()
        .ok_or_else(|| ApiError::Upstream("generation provider not configured".into()))?;

    let request = ProviderRequest::build(
        category,
        &PromptInput {
            business_name: body.business_name.trim(),
            details: body.details.as_deref(),
            context: body.context.as_ref(),
            brand_voice: brand_voice.as_ref(),
        },
    );

    let price = state.prices.price(category)?;
    let metadata = serde_json::json!({ "businessName": body.business_name });
    let consumption = state
        .store
        .consume(
            &auth.user_id,
            Charge::new(category, price, metadata),
            Utc::now(),
        )
        .await?;

    let task = tokio::spawn(run_generation(
        state,
        provider,
        auth.user_id,
        category,
        request,
        consumption.clone(),
    ));
    let result = task
        .await
        .map_err(|e| ApiError::Internal(format!("generation task failed: {e}")))??;

    Ok(Json(GenerateResponse {
        category,
        result,
        credits: ConsumeResponse::from(consumption),
    }))
}

/// Call the provider for a charged generation. Refunds on failure, stores
/// the artifact on success.
async fn run_generation(
    state: Arc<AppState>,
    provider: Arc<dyn GenerationProvider>,
    user_id: UserId,
    category: GenerationCategory,
    request: ProviderRequest,
    consumption: Consumption,
) -> Result<serde_json::Value, ApiError> {
    let result = match request.send(provider.as_ref()).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(
                user_id = %user_id,
                category = %category,
                error = %err,
                "Generation failed, refunding charge"
            );
            if let Err(refund_err) = state
                .store
                .refund(&user_id, &consumption, "generation failed", Utc::now())
                .await
            {
                tracing::error!(
                    user_id = %user_id,
                    transaction_id = %consumption.transaction_id,
                    error = %refund_err,
                    "Refund failed"
                );
            }
            return Err(err.into());
        }
    };

    let artifact = Artifact::new(user_id, category, result.clone());
    if let Err(e) = state.store.put_artifact(&artifact).await {
        tracing::warn!(
            user_id = %user_id,
            category = %category,
            error = %e,
            "Failed to store artifact"
        );
    }

    tracing::info!(
        user_id = %user_id,
        category = %category,
        credits_used = consumption.credits_used,
        "Generation completed"
    );

    Ok(result)
}

/// Get the caller's latest artifact for a category.
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    auth: AuthUser,
) -> Result<Json<Artifact>, ApiError> {
    let category = parse_category(&category)?;

    let artifact = state
        .store
        .get_artifact(&auth.user_id, category)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {category} artifact")))?;

    Ok(Json(artifact))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(business_name: &str, details: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            business_name: business_name.into(),
            details: details.map(str::to_string),
            context: None,
        }
    }

    #[test]
    fn business_name_is_required() {
        let err = validate(GenerationCategory::Logo, &request("  ", None)).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn details_required_only_where_needed() {
        assert!(validate(GenerationCategory::Logo, &request("Padaria", None)).is_ok());
        assert!(validate(GenerationCategory::Copywriter, &request("Padaria", None)).is_err());
        assert!(validate(GenerationCategory::Copywriter, &request("Padaria", Some(" "))).is_err());
        assert!(
            validate(GenerationCategory::Copywriter, &request("Padaria", Some("pão"))).is_ok()
        );
    }

    #[test]
    fn image_categories_build_image_requests() {
        let input = PromptInput {
            business_name: "Padaria Central",
            details: Some("pão"),
            context: None,
            brand_voice: None,
        };

        assert!(matches!(
            ProviderRequest::build(GenerationCategory::Logo, &input),
            ProviderRequest::Image { .. }
        ));
        let ProviderRequest::Text { system, user } =
            ProviderRequest::build(GenerationCategory::Copywriter, &input)
        else {
            panic!("copywriter should be a text request");
        };
        assert_eq!(system, system_prompt(GenerationCategory::Copywriter));
        assert!(user.contains("Padaria Central"));
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        assert_eq!(parse_category("tattoo").unwrap_err().code(), "validation_error");
    }
}
