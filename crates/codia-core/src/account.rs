//! Account types.
//!
//! An account is the single persisted row per user. It carries both credit
//! pools, the gamification counters and the lifecycle status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Daily allowance for the free tier.
pub const FREE_DAILY_CREDITS: i64 = 10;

/// Daily allowance for the starter tier.
pub const STARTER_DAILY_CREDITS: i64 = 50;

/// Daily allowance for the pro tier.
pub const PRO_DAILY_CREDITS: i64 = 200;

/// Daily allowance for the enterprise tier.
pub const ENTERPRISE_DAILY_CREDITS: i64 = 1000;

/// A user's credit account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The user ID (JWT `sub` claim).
    pub user_id: UserId,

    /// E-mail address, if the identity provider shared one.
    pub email: Option<String>,

    /// Subscription tier, which sizes the daily allowance.
    pub subscription_tier: SubscriptionTier,

    /// Purchased pool. Never negative.
    pub total_credits: i64,

    /// Credits taken from the daily allowance during `daily_window`.
    pub daily_credits_used: i64,

    /// UTC day that `daily_credits_used` belongs to.
    pub daily_window: NaiveDate,

    /// Current level, derived from XP and never lowered.
    pub level: u32,

    /// Cumulative experience points.
    pub experience_points: i64,

    /// Consecutive UTC days with at least one consumption.
    pub current_streak: u32,

    /// Best streak ever reached.
    pub longest_streak: u32,

    /// UTC day of the last successful consumption.
    pub last_consumed_on: Option<NaiveDate>,

    /// Whether the e-mail address was verified.
    pub email_verified: bool,

    /// Lifecycle status.
    pub account_status: AccountStatus,

    /// Lifetime credits consumed, both pools combined.
    pub lifetime_used_credits: i64,

    /// Lifetime money saved versus hiring professionals, in cents.
    pub lifetime_saved_cents: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh free-tier account in `pending` status.
    #[must_use]
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self::new_at(user_id, email, Utc::now())
    }

    /// Create a fresh account as of `now`.
    #[must_use]
    pub fn new_at(user_id: UserId, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email,
            subscription_tier: SubscriptionTier::Free,
            total_credits: 0,
            daily_credits_used: 0,
            daily_window: now.date_naive(),
            level: 1,
            experience_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_consumed_on: None,
            email_verified: false,
            account_status: AccountStatus::Pending,
            lifetime_used_credits: 0,
            lifetime_saved_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Daily allowance for the account's tier.
    #[must_use]
    pub const fn daily_limit(&self) -> i64 {
        self.subscription_tier.daily_limit()
    }

    /// Daily credits used as seen on `today`.
    ///
    /// A counter that belongs to an earlier day reads as zero.
    #[must_use]
    pub fn daily_used_on(&self, today: NaiveDate) -> i64 {
        if self.daily_window == today {
            self.daily_credits_used
        } else {
            0
        }
    }

    /// Remaining daily allowance on `today`.
    #[must_use]
    pub fn daily_remaining_on(&self, today: NaiveDate) -> i64 {
        (self.daily_limit() - self.daily_used_on(today)).max(0)
    }

    /// Move the daily counter to `today`, zeroing it if the day changed.
    pub fn roll_daily_window(&mut self, today: NaiveDate) {
        if self.daily_window != today {
            self.daily_window = today;
            self.daily_credits_used = 0;
        }
    }

    /// Whether the account may consume or receive credits.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.account_status.is_usable()
    }
}

/// Subscription tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// Free tier: 10 credits per day.
    Free,

    /// Starter plan: 50 credits per day.
    Starter,

    /// Pro plan: 200 credits per day.
    Pro,

    /// Enterprise plan: 1000 credits per day.
    Enterprise,
}

impl SubscriptionTier {
    /// Daily allowance for this tier.
    #[must_use]
    pub const fn daily_limit(&self) -> i64 {
        match self {
            Self::Free => FREE_DAILY_CREDITS,
            Self::Starter => STARTER_DAILY_CREDITS,
            Self::Pro => PRO_DAILY_CREDITS,
            Self::Enterprise => ENTERPRISE_DAILY_CREDITS,
        }
    }

    /// Stable lowercase name, as stored and sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// Parse the stored name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "starter" => Some(Self::Starter),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Created, e-mail not yet verified.
    Pending,

    /// Verified and in good standing.
    Active,

    /// Blocked by an operator.
    Suspended,

    /// Soft-deleted. The row is kept for the ledger history.
    Deleted,
}

impl AccountStatus {
    /// Whether credits may move on an account in this status.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Stable lowercase name, as stored and sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
        }
    }

    /// Parse the stored name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_account_starts_empty_on_free_tier() {
        let account = Account::new(UserId::generate(), None);
        assert_eq!(account.subscription_tier, SubscriptionTier::Free);
        assert_eq!(account.total_credits, 0);
        assert_eq!(account.daily_credits_used, 0);
        assert_eq!(account.level, 1);
        assert_eq!(account.account_status, AccountStatus::Pending);
        assert!(!account.email_verified);
    }

    #[test]
    fn tier_daily_limits() {
        assert_eq!(SubscriptionTier::Free.daily_limit(), 10);
        assert_eq!(SubscriptionTier::Starter.daily_limit(), 50);
        assert_eq!(SubscriptionTier::Pro.daily_limit(), 200);
        assert_eq!(SubscriptionTier::Enterprise.daily_limit(), 1000);
    }

    #[test]
    fn stale_daily_counter_reads_as_zero() {
        let mut account = Account::new(UserId::generate(), None);
        account.daily_window = day(2026, 3, 1);
        account.daily_credits_used = 7;

        assert_eq!(account.daily_used_on(day(2026, 3, 1)), 7);
        assert_eq!(account.daily_remaining_on(day(2026, 3, 1)), 3);
        assert_eq!(account.daily_used_on(day(2026, 3, 2)), 0);
        assert_eq!(account.daily_remaining_on(day(2026, 3, 2)), 10);
    }

    #[test]
    fn rolling_the_window_only_resets_on_a_new_day() {
        let mut account = Account::new(UserId::generate(), None);
        account.daily_window = day(2026, 3, 1);
        account.daily_credits_used = 7;

        account.roll_daily_window(day(2026, 3, 1));
        assert_eq!(account.daily_credits_used, 7);

        account.roll_daily_window(day(2026, 3, 2));
        assert_eq!(account.daily_credits_used, 0);
        assert_eq!(account.daily_window, day(2026, 3, 2));
    }

    #[test]
    fn remaining_saturates_after_a_downgrade() {
        let mut account = Account::new(UserId::generate(), None);
        account.subscription_tier = SubscriptionTier::Pro;
        account.daily_credits_used = 40;
        account.subscription_tier = SubscriptionTier::Free;
        assert_eq!(account.daily_remaining_on(account.daily_window), 0);
    }

    #[test]
    fn status_names_roundtrip() {
        for status in [
            AccountStatus::Pending,
            AccountStatus::Active,
            AccountStatus::Suspended,
            AccountStatus::Deleted,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert!(AccountStatus::Pending.is_usable());
        assert!(!AccountStatus::Suspended.is_usable());
        assert!(!AccountStatus::Deleted.is_usable());
    }
}
