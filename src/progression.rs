//! Character progression: EXP, levels, affinity and the daily click cap.
//!
//! - EXP only moves on reward/penalty actions and never goes below zero.
//! - Each level needs 20% more EXP than the last (floored).
//! - Affinity: +1 per click, +5 per non-negative reward, -5 per penalty.
//!
//! All functions are pure: they take the current character and return an
//! updated copy. "Today" is passed in so the daily cap can be tested.

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::achievement::AchievementBook;
use crate::character::{affinity_level_for, Character};
use crate::quest::Quest;

/// Maximum rewarded character clicks per calendar day
pub const DAILY_CLICK_LIMIT: u32 = 20;

/// Growth factor applied to the level threshold on each level up
pub const LEVEL_CURVE: f64 = 1.2;

/// Affinity granted per accepted click
pub const CLICK_AFFINITY: i64 = 1;

/// Affinity granted (or removed) per reward (or penalty)
pub const REWARD_AFFINITY: i64 = 5;

/// Threshold for the level after one with threshold `current`
pub fn next_threshold(current: i64) -> i64 {
    // Always grow by at least one so the level-up loop terminates
    ((current as f64 * LEVEL_CURVE).floor() as i64).max(current.saturating_add(1))
}

/// Today's calendar day in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Calendar day key stored in `Character::last_click_date`
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// A single progression input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressAction {
    /// Poking the character; rate limited, affinity only
    Click,
    /// Step reward (positive) or revoked reward (negative)
    Reward(i64),
}

/// Result of a successfully applied action
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub character: Character,
    pub leveled_up: bool,
    pub levels_gained: i32,
    /// Titles unlocked by this action, in definition order
    pub unlocked: Vec<String>,
}

impl ProgressReport {
    /// The single title surfaced as a notification
    pub fn first_unlocked(&self) -> Option<&str> {
        self.unlocked.first().map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressOutcome {
    Applied(ProgressReport),
    /// Daily click cap hit; nothing changed
    LimitReached,
}

impl ProgressOutcome {
    pub fn into_report(self) -> Option<ProgressReport> {
        match self {
            ProgressOutcome::Applied(report) => Some(report),
            ProgressOutcome::LimitReached => None,
        }
    }

    pub fn is_limited(&self) -> bool {
        matches!(self, ProgressOutcome::LimitReached)
    }
}

/// Apply `amount` EXP (ignored for clicks) and the matching affinity change.
pub fn apply_exp(
    character: &Character,
    amount: i64,
    is_click_action: bool,
    today: NaiveDate,
    quests: &[Quest],
    book: &AchievementBook,
) -> ProgressOutcome {
    let action = if is_click_action {
        ProgressAction::Click
    } else {
        ProgressAction::Reward(amount)
    };
    apply(character, action, today, quests, book)
}

/// Register a click on the character
pub fn apply_click(
    character: &Character,
    today: NaiveDate,
    quests: &[Quest],
    book: &AchievementBook,
) -> ProgressOutcome {
    apply(character, ProgressAction::Click, today, quests, book)
}

pub fn apply(
    character: &Character,
    action: ProgressAction,
    today: NaiveDate,
    quests: &[Quest],
    book: &AchievementBook,
) -> ProgressOutcome {
    let mut updated = character.clone();

    let today_key = day_key(today);
    if updated.last_click_date.as_deref() != Some(today_key.as_str()) {
        updated.daily_click_count = 0;
        updated.last_click_date = Some(today_key);
    }

    let mut levels_gained = 0;
    let affinity_change = match action {
        ProgressAction::Click => {
            if updated.daily_click_count >= DAILY_CLICK_LIMIT {
                debug!("Daily click limit reached for {}", character.id);
                return ProgressOutcome::LimitReached;
            }
            updated.daily_click_count += 1;
            CLICK_AFFINITY
        }
        ProgressAction::Reward(amount) => {
            levels_gained = add_exp(&mut updated, amount);
            // Zero counts as a reward: only negative amounts cost affinity
            if amount < 0 { -REWARD_AFFINITY } else { REWARD_AFFINITY }
        }
    };

    updated.affinity = (updated.affinity + affinity_change).max(0);
    updated.affinity_level = affinity_level_for(updated.affinity);

    if levels_gained > 0 {
        info!(
            "{} reached level {} (+{})",
            updated.id, updated.level, levels_gained
        );
    }

    let unlocked = book.sweep(&mut updated, quests);

    ProgressOutcome::Applied(ProgressReport {
        character: updated,
        leveled_up: levels_gained > 0,
        levels_gained,
        unlocked,
    })
}

/// Add EXP, floor at zero and roll over thresholds. Returns levels gained.
fn add_exp(character: &mut Character, amount: i64) -> i32 {
    character.current_exp = character.current_exp.saturating_add(amount).max(0);

    let mut gained = 0;
    while character.current_exp >= character.next_level_exp {
        character.current_exp -= character.next_level_exp;
        character.level += 1;
        character.next_level_exp = next_threshold(character.next_level_exp);
        gained += 1;
    }
    gained
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn fresh() -> Character {
        Character::with_id("hero", "Hero")
    }

    fn reward(character: &Character, amount: i64) -> ProgressReport {
        apply_exp(character, amount, false, day(18), &[], &AchievementBook::default())
            .into_report()
            .unwrap()
    }

    #[test]
    fn test_threshold_curve() {
        assert_eq!(next_threshold(100), 120);
        assert_eq!(next_threshold(120), 144);
        assert_eq!(next_threshold(144), 172);
        assert_eq!(next_threshold(1), 2);
    }

    #[test]
    fn test_multi_level_jump() {
        let report = reward(&fresh(), 250);
        assert!(report.leveled_up);
        assert_eq!(report.levels_gained, 2);
        assert_eq!(report.character.level, 3);
        assert_eq!(report.character.current_exp, 30);
        assert_eq!(report.character.next_level_exp, 144);
    }

    #[test]
    fn test_huge_reward_saturates_instead_of_overflowing() {
        let mut character = fresh();
        character.current_exp = 10;

        let report = reward(&character, i64::MAX);
        assert!(report.leveled_up);
        assert!(report.character.level > 1);
        assert!(report.character.current_exp >= 0);
        assert!(report.character.current_exp < report.character.next_level_exp);
        assert_eq!(next_threshold(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_exp_floors_at_zero_without_delevel() {
        let mut character = fresh();
        character.level = 3;
        character.current_exp = 10;
        character.next_level_exp = 144;

        let report = reward(&character, -50);
        assert_eq!(report.character.level, 3);
        assert_eq!(report.character.current_exp, 0);
        assert_eq!(report.character.next_level_exp, 144);
        assert!(!report.leveled_up);
    }

    #[test]
    fn test_affinity_rules() {
        let gained = reward(&fresh(), 20);
        assert_eq!(gained.character.affinity, 5);

        // Zero reward still counts as non-negative
        let zero = reward(&fresh(), 0);
        assert_eq!(zero.character.affinity, 5);

        let lost = reward(&gained.character, -20);
        assert_eq!(lost.character.affinity, 0);

        let floored = reward(&fresh(), -20);
        assert_eq!(floored.character.affinity, 0);
    }

    #[test]
    fn test_affinity_level_is_derived() {
        let mut character = fresh();
        character.affinity = 98;
        character.affinity_level = 7; // stale value gets recomputed
        let report = reward(&character, 10);
        assert_eq!(report.character.affinity, 103);
        assert_eq!(report.character.affinity_level, 2);
    }

    #[test]
    fn test_click_does_not_grant_exp() {
        let book = AchievementBook::default();
        let outcome = apply_exp(&fresh(), 500, true, day(18), &[], &book);
        let report = outcome.into_report().unwrap();
        assert_eq!(report.character.current_exp, 0);
        assert_eq!(report.character.level, 1);
        assert_eq!(report.character.affinity, 1);
        assert_eq!(report.character.daily_click_count, 1);
    }

    #[test]
    fn test_daily_click_limit() {
        let book = AchievementBook::default();
        let mut character = fresh();
        for _ in 0..DAILY_CLICK_LIMIT {
            character = apply_click(&character, day(18), &[], &book)
                .into_report()
                .unwrap()
                .character;
        }
        assert_eq!(character.daily_click_count, 20);
        assert_eq!(character.affinity, 20);

        let outcome = apply_click(&character, day(18), &[], &book);
        assert!(outcome.is_limited());

        // Rewards are not rate limited
        let report = apply_exp(&character, 10, false, day(18), &[], &book)
            .into_report()
            .unwrap();
        assert_eq!(report.character.daily_click_count, 20);

        // A new day resets the counter once
        let next_day = apply_click(&character, day(19), &[], &book)
            .into_report()
            .unwrap();
        assert_eq!(next_day.character.daily_click_count, 1);
        assert_eq!(next_day.character.last_click_date.as_deref(), Some("2026-10-19"));
    }

    #[test]
    fn test_exp_stays_below_threshold() {
        let book = AchievementBook::default();
        let mut character = fresh();
        for amount in [30, -10, 500, 0, -1000, 77, 1200, -3, 9999] {
            character = apply_exp(&character, amount, false, day(18), &[], &book)
                .into_report()
                .unwrap()
                .character;
            assert!(character.current_exp >= 0);
            assert!(character.current_exp < character.next_level_exp);
            assert!(character.affinity >= 0);
        }
    }

    #[test]
    fn test_level_up_unlocks_achievement() {
        let book = AchievementBook::builtin();
        let mut character = fresh();
        character.level = 9;
        character.current_exp = 0;
        character.next_level_exp = 100;

        let report = apply_exp(&character, 100, false, day(18), &[], &book)
            .into_report()
            .unwrap();
        assert_eq!(report.character.level, 10);
        assert_eq!(report.first_unlocked(), Some("First Steps"));
        assert!(report.character.has_unlocked("growth_10"));
    }
}
