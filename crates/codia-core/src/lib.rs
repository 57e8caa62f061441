//! Core types and ledger rules for Codia credits.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Accounts**: `Account`, `SubscriptionTier`, `AccountStatus`
//! - **Credits**: `CreditTransaction`, `TransactionCategory`
//! - **Pricing**: `PriceTable`, `GenerationCategory`, `CategoryPrice`
//! - **Artifacts**: the latest stored result per generation category
//! - **Progression**: XP levels and daily streaks
//! - **Ledger**: the consume/add/refund rules applied by every storage backend
//!
//! # Credit pools
//!
//! Every account has two pools:
//!
//! - a **daily allowance** sized by the subscription tier, reset at each UTC day
//! - a **purchased pool** that persists until consumed
//!
//! Consumption always drains the daily allowance before the purchased pool.
//! All quantities are whole credits stored as `i64`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod api;
pub mod artifact;
pub mod credits;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod pricing;
pub mod progression;

pub use account::{
    Account, AccountStatus, SubscriptionTier, ENTERPRISE_DAILY_CREDITS, FREE_DAILY_CREDITS,
    PRO_DAILY_CREDITS, STARTER_DAILY_CREDITS,
};
pub use api::{
    AddCreditsRequest, AddCreditsResponse, ConsumeRequest, ConsumeResponse, VerifyEmailResponse,
};
pub use artifact::Artifact;
pub use credits::{CreditTransaction, TransactionCategory};
pub use error::{LedgerError, Result};
pub use ids::{IdError, TransactionId, UserId};
pub use ledger::{
    Balance, Breakdown, Charge, Consumption, DailyAllowance, Remaining, StreakView,
    Verification, XpChange, EMAIL_VERIFICATION_BONUS_CREDITS, EMAIL_VERIFICATION_BONUS_XP,
};
pub use pricing::{CategoryPrice, GenerationCategory, PriceTable};
pub use progression::{level_for_xp, next_streak, xp_for_level};
