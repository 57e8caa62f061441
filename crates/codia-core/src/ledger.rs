//! Ledger rules.
//!
//! These are the only functions that mutate balance fields. Storage backends
//! load an account, apply one of these rules to a copy inside their critical
//! section, and persist the copy together with the returned transaction only
//! when the rule succeeded. A rule that returns an error has not been
//! persisted, which makes every operation all-or-nothing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountStatus, SubscriptionTier};
use crate::credits::CreditTransaction;
use crate::error::{LedgerError, Result};
use crate::pricing::{CategoryPrice, GenerationCategory};
use crate::progression::{level_for_xp, next_streak, xp_for_level};
use crate::TransactionId;

/// Credits granted to the purchased pool on e-mail verification.
pub const EMAIL_VERIFICATION_BONUS_CREDITS: i64 = 20;

/// XP granted on e-mail verification.
pub const EMAIL_VERIFICATION_BONUS_XP: i64 = 50;

// ============================================================================
// Views
// ============================================================================

/// Balance as returned by the balance endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Daily allowance state.
    pub daily: DailyAllowance,
    /// Purchased pool.
    pub purchased: i64,
    /// Daily remaining plus purchased.
    pub total: i64,
    /// Subscription tier.
    pub tier: SubscriptionTier,
    /// Current level.
    pub level: u32,
    /// Cumulative XP.
    pub xp: i64,
    /// Cumulative XP at which the next level starts.
    pub next_level_xp: i64,
    /// Streak counters.
    pub streak: StreakView,
}

/// Daily allowance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAllowance {
    /// Credits used today.
    pub used: i64,
    /// Tier limit.
    pub limit: i64,
    /// Credits left today.
    pub remaining: i64,
}

/// Streak counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakView {
    /// Current streak in days.
    pub current: u32,
    /// Longest streak in days.
    pub longest: u32,
}

/// How a charge was split between the two pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Breakdown {
    /// Taken from the daily allowance.
    pub daily: i64,
    /// Taken from the purchased pool.
    pub purchased: i64,
}

impl Breakdown {
    /// Total credits charged.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.daily + self.purchased
    }
}

/// Pool levels after a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    /// Daily allowance left.
    pub daily: i64,
    /// Purchased pool left.
    pub purchased: i64,
    /// Sum of both.
    pub total: i64,
}

/// XP movement caused by a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpChange {
    /// XP awarded.
    pub gained: i64,
    /// XP after the award.
    pub total: i64,
    /// Level before.
    pub old_level: u32,
    /// Level after.
    pub new_level: u32,
    /// Whether `new_level > old_level`.
    pub leveled_up: bool,
}

/// A request to charge one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    /// What is being generated.
    pub category: GenerationCategory,
    /// Its price entry.
    pub price: CategoryPrice,
    /// Caller metadata stored on the transaction.
    pub metadata: serde_json::Value,
}

impl Charge {
    /// Build a charge.
    #[must_use]
    pub fn new(
        category: GenerationCategory,
        price: CategoryPrice,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            category,
            price,
            metadata,
        }
    }
}

/// Receipt of a successful consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    /// What was generated.
    pub category: GenerationCategory,
    /// Credits charged.
    pub credits_used: i64,
    /// Split between pools.
    pub breakdown: Breakdown,
    /// Pool levels afterwards.
    pub remaining: Remaining,
    /// XP movement.
    pub xp: XpChange,
    /// Money saved by this generation, in cents.
    pub saved_money: i64,
    /// Streak afterwards.
    pub streak: StreakView,
    /// Ledger entry recording the charge.
    pub transaction_id: TransactionId,
    /// UTC day whose allowance was charged.
    pub charged_on: NaiveDate,
}

/// Outcome of an e-mail verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// The address had already been verified; nothing was granted.
    pub already_verified: bool,
    /// Credits granted.
    pub bonus_credits: i64,
    /// XP granted.
    pub bonus_xp: i64,
    /// Purchased pool afterwards.
    pub new_balance: i64,
    /// Level afterwards.
    pub level: u32,
}

// ============================================================================
// Rules
// ============================================================================

impl Account {
    /// Balance view as of `now`. Does not modify the account.
    #[must_use]
    pub fn balance(&self, now: DateTime<Utc>) -> Balance {
        let today = now.date_naive();
        let remaining = self.daily_remaining_on(today);
        Balance {
            daily: DailyAllowance {
                used: self.daily_used_on(today),
                limit: self.daily_limit(),
                remaining,
            },
            purchased: self.total_credits,
            total: remaining + self.total_credits,
            tier: self.subscription_tier,
            level: self.level,
            xp: self.experience_points,
            next_level_xp: xp_for_level(self.level.saturating_add(1)),
            streak: StreakView {
                current: self.current_streak,
                longest: self.longest_streak,
            },
        }
    }

    /// Charge one generation, daily allowance first.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountInactive` for suspended or deleted accounts.
    /// - `LedgerError::InvalidAmount` if the price is not positive.
    /// - `LedgerError::InsufficientCredits` if both pools together are short.
    ///
    /// On error the account may have had its daily window rolled; callers
    /// must discard it.
    pub fn consume(
        &mut self,
        charge: &Charge,
        now: DateTime<Utc>,
    ) -> Result<(Consumption, CreditTransaction)> {
        self.ensure_usable()?;

        let cost = charge.price.credits;
        if cost <= 0 {
            return Err(LedgerError::InvalidAmount(cost));
        }

        let today = now.date_naive();
        self.roll_daily_window(today);

        let daily_remaining = self.daily_remaining_on(today);
        let from_daily = cost.min(daily_remaining);
        let from_purchased = cost - from_daily;

        if from_purchased > self.total_credits {
            return Err(LedgerError::InsufficientCredits {
                available: daily_remaining + self.total_credits,
                required: cost,
            });
        }

        let breakdown = Breakdown {
            daily: from_daily,
            purchased: from_purchased,
        };

        self.daily_credits_used += from_daily;
        self.total_credits -= from_purchased;
        self.lifetime_used_credits += cost;
        self.lifetime_saved_cents += charge.price.saved_money_cents;

        let xp = self.award_xp(charge.price.xp_reward);

        self.current_streak = next_streak(self.current_streak, self.last_consumed_on, today);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_consumed_on = Some(today);
        self.updated_at = now;

        let metadata = serde_json::json!({
            "category": charge.category,
            "breakdown": breakdown,
            "details": charge.metadata,
        });
        let tx = CreditTransaction::consumption(
            self.user_id,
            cost,
            self.total_credits,
            format!("{} generation", charge.category),
            metadata,
        );

        let daily_left = self.daily_remaining_on(today);
        let consumption = Consumption {
            category: charge.category,
            credits_used: cost,
            breakdown,
            remaining: Remaining {
                daily: daily_left,
                purchased: self.total_credits,
                total: daily_left + self.total_credits,
            },
            xp,
            saved_money: charge.price.saved_money_cents,
            streak: StreakView {
                current: self.current_streak,
                longest: self.longest_streak,
            },
            transaction_id: tx.id,
            charged_on: today,
        };

        Ok((consumption, tx))
    }

    /// Add purchased credits.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `amount <= 0`.
    /// - `LedgerError::AccountInactive` for suspended or deleted accounts.
    pub fn add_credits(
        &mut self,
        amount: i64,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CreditTransaction> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.ensure_usable()?;

        self.total_credits = self
            .total_credits
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        self.updated_at = now;

        let description = description
            .filter(|d| !d.trim().is_empty())
            .map_or_else(|| format!("Added {amount} credits"), str::to_string);

        Ok(CreditTransaction::purchase(
            self.user_id,
            amount,
            self.total_credits,
            description,
        ))
    }

    /// Grant bonus credits (operator promotion).
    ///
    /// # Errors
    ///
    /// Same as [`Account::add_credits`].
    pub fn grant_bonus(
        &mut self,
        amount: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CreditTransaction> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.ensure_usable()?;

        self.total_credits = self
            .total_credits
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        self.updated_at = now;

        Ok(CreditTransaction::bonus(
            self.user_id,
            amount,
            self.total_credits,
            "promotion",
            reason.to_string(),
            serde_json::Value::Null,
        ))
    }

    /// Give back a charge that did not produce anything.
    ///
    /// The purchased portion returns to the pool. The daily portion is given
    /// back only while the allowance it came from is still current. XP and
    /// streak are left alone.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` for an empty breakdown.
    pub fn refund(
        &mut self,
        breakdown: &Breakdown,
        charged_on: NaiveDate,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CreditTransaction> {
        if breakdown.daily < 0 || breakdown.purchased < 0 || breakdown.total() <= 0 {
            return Err(LedgerError::InvalidAmount(breakdown.total()));
        }

        let today = now.date_naive();
        self.roll_daily_window(today);

        let daily_returned = if charged_on == today {
            let returned = breakdown.daily.min(self.daily_credits_used);
            self.daily_credits_used -= returned;
            returned
        } else {
            0
        };
        self.total_credits += breakdown.purchased;
        let returned = daily_returned + breakdown.purchased;
        self.lifetime_used_credits = (self.lifetime_used_credits - returned).max(0);
        self.updated_at = now;

        Ok(CreditTransaction::bonus(
            self.user_id,
            returned,
            self.total_credits,
            "refund",
            reason.to_string(),
            serde_json::json!({
                "breakdown": breakdown,
                "daily_returned": daily_returned,
                "charged_on": charged_on,
            }),
        ))
    }

    /// Mark the e-mail as verified and grant the one-time bonus.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountInactive` for suspended or deleted
    /// accounts.
    pub fn verify_email(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<(Verification, Option<CreditTransaction>)> {
        self.ensure_usable()?;

        if self.email_verified {
            return Ok((
                Verification {
                    already_verified: true,
                    bonus_credits: 0,
                    bonus_xp: 0,
                    new_balance: self.total_credits,
                    level: self.level,
                },
                None,
            ));
        }

        self.email_verified = true;
        if self.account_status == AccountStatus::Pending {
            self.account_status = AccountStatus::Active;
        }
        self.total_credits += EMAIL_VERIFICATION_BONUS_CREDITS;
        self.award_xp(EMAIL_VERIFICATION_BONUS_XP);
        self.updated_at = now;

        let tx = CreditTransaction::bonus(
            self.user_id,
            EMAIL_VERIFICATION_BONUS_CREDITS,
            self.total_credits,
            "email_verification",
            "E-mail verification bonus".to_string(),
            serde_json::json!({ "xp": EMAIL_VERIFICATION_BONUS_XP }),
        );

        Ok((
            Verification {
                already_verified: false,
                bonus_credits: EMAIL_VERIFICATION_BONUS_CREDITS,
                bonus_xp: EMAIL_VERIFICATION_BONUS_XP,
                new_balance: self.total_credits,
                level: self.level,
            },
            Some(tx),
        ))
    }

    /// Soft-delete the account.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.account_status = AccountStatus::Deleted;
        self.updated_at = now;
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(LedgerError::AccountInactive {
                status: self.account_status,
            })
        }
    }

    fn award_xp(&mut self, gained: i64) -> XpChange {
        let old_level = self.level;
        self.experience_points += gained.max(0);
        self.level = self.level.max(level_for_xp(self.experience_points));
        XpChange {
            gained: gained.max(0),
            total: self.experience_points,
            old_level,
            new_level: self.level,
            leveled_up: self.level > old_level,
        }
    }
}
