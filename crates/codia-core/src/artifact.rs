//! Stored generation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GenerationCategory, UserId};

/// The latest result a user generated for one category.
///
/// The `brand_voice` artifact is read back as context for later text
/// generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Owner.
    pub user_id: UserId,
    /// Category that produced it.
    pub category: GenerationCategory,
    /// Generated content as returned upstream.
    pub content: serde_json::Value,
    /// When it was generated.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Wrap freshly generated content.
    #[must_use]
    pub fn new(user_id: UserId, category: GenerationCategory, content: serde_json::Value) -> Self {
        Self {
            user_id,
            category,
            content,
            created_at: Utc::now(),
        }
    }
}
