//! XP levels and daily streaks.

use chrono::NaiveDate;

/// XP needed per squared level step.
const XP_PER_LEVEL_STEP: i64 = 100;

/// Level reached with `xp` cumulative experience.
///
/// `floor(sqrt(xp / 100)) + 1`: level 2 at 100 XP, 3 at 400, 4 at 900.
/// Negative input is treated as zero.
#[must_use]
pub fn level_for_xp(xp: i64) -> u32 {
    let steps = xp.max(0) / XP_PER_LEVEL_STEP;
    let mut root: i64 = 0;
    while (root + 1) * (root + 1) <= steps {
        root += 1;
    }
    u32::try_from(root).unwrap_or(u32::MAX - 1) + 1
}

/// Minimum XP needed to reach `level`.
#[must_use]
pub fn xp_for_level(level: u32) -> i64 {
    let step = i64::from(level.saturating_sub(1));
    step * step * XP_PER_LEVEL_STEP
}

/// Streak after a consumption on `today`.
///
/// - same day as the previous consumption: unchanged (at least 1)
/// - the day after: +1
/// - anything else: back to 1
#[must_use]
pub fn next_streak(current: u32, last: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last {
        Some(day) if day == today => current.max(1),
        Some(day) if day.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(399), 2);
        assert_eq!(level_for_xp(400), 3);
        assert_eq!(level_for_xp(900), 4);
        assert_eq!(level_for_xp(-50), 1);
    }

    #[test]
    fn level_is_non_decreasing_in_xp() {
        let mut previous = level_for_xp(0);
        for xp in (0..20_000).step_by(7) {
            let level = level_for_xp(xp);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn xp_for_level_is_the_inverse_threshold() {
        for level in 1..30 {
            assert_eq!(level_for_xp(xp_for_level(level)), level);
            if level > 1 {
                assert_eq!(level_for_xp(xp_for_level(level) - 1), level - 1);
            }
        }
    }

    #[test]
    fn first_consumption_starts_streak() {
        assert_eq!(next_streak(0, None, day(10)), 1);
    }

    #[test]
    fn consecutive_days_increment() {
        assert_eq!(next_streak(3, Some(day(9)), day(10)), 4);
    }

    #[test]
    fn same_day_keeps_streak() {
        assert_eq!(next_streak(3, Some(day(10)), day(10)), 3);
        assert_eq!(next_streak(0, Some(day(10)), day(10)), 1);
    }

    #[test]
    fn gap_of_two_days_resets() {
        assert_eq!(next_streak(8, Some(day(8)), day(10)), 1);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let last = NaiveDate::from_ymd_opt(2026, 4, 30).unwrap();
        assert_eq!(next_streak(2, Some(last), day(1)), 3);
    }
}
