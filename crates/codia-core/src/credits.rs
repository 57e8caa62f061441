//! Credit transaction types.
//!
//! Every change to a purchased pool or to the daily counter appends one
//! transaction. The log is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// A ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The account this entry belongs to.
    pub user_id: UserId,

    /// Signed amount. Positive adds credits, negative consumes them.
    pub amount: i64,

    /// Coarse category.
    pub category: TransactionCategory,

    /// Free-form type within the category (`generation`, `manual_add`, ...).
    pub kind: String,

    /// Human-readable description.
    pub description: String,

    /// Purchased pool after this entry was applied.
    pub balance_after: i64,

    /// Additional metadata (generation category, breakdown, caller data).
    pub metadata: serde_json::Value,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// A consumption entry. The stored amount is always negative.
    #[must_use]
    pub fn consumption(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        description: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount: -amount.abs(),
            category: TransactionCategory::Consumption,
            kind: "generation".to_string(),
            description,
            balance_after,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// A purchase entry (credits bought or added by the owner).
    #[must_use]
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount,
            category: TransactionCategory::Purchase,
            kind: "manual_add".to_string(),
            description,
            balance_after,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// A bonus entry of the given kind.
    #[must_use]
    pub fn bonus(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        kind: &str,
        description: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount,
            category: TransactionCategory::Bonus,
            kind: kind.to_string(),
            description,
            balance_after,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Transaction category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    /// Granted for free (verification bonus, refund, promotion).
    Bonus,

    /// Spent on a generation.
    Consumption,

    /// Bought or added by the owner.
    Purchase,
}

impl TransactionCategory {
    /// Stable lowercase name, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bonus => "bonus",
            Self::Consumption => "consumption",
            Self::Purchase => "purchase",
        }
    }

    /// Parse the stored name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bonus" => Some(Self::Bonus),
            "consumption" => Some(Self::Consumption),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}
