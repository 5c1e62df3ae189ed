//! Business rules that decide whether a verified referral may be paid out.
//!
//! The evaluator is a pure function of the professional's reward history and the configured limits. The reward cap is
//! checked before the cooldown window, and the first rule that fails provides the reason.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::RewardHistory;

const MILLIS_PER_DAY: i64 = 86_400_000;
const MAX_COOLDOWN_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl Eligibility {
    pub fn eligible() -> Self {
        Self { eligible: true, reason: None }
    }

    pub fn ineligible<S: Into<String>>(reason: S) -> Self {
        Self { eligible: false, reason: Some(reason.into()) }
    }
}

pub fn max_reward_reason(limit: u64) -> String {
    format!("Professional has reached the maximum of {limit} rewarded referrals")
}

pub fn cooldown_reason(days_remaining: i64) -> String {
    format!("Cooldown period active. {days_remaining} day(s) remaining")
}

/// The length of a cooldown window of `days` days, capped at a hundred years.
pub fn cooldown_duration(days: u64) -> Duration {
    Duration::days(i64::try_from(days).unwrap_or(MAX_COOLDOWN_DAYS).min(MAX_COOLDOWN_DAYS))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityEvaluator {
    /// Zero means unlimited
    pub max_reward_per_professional: u64,
    /// Zero disables the cooldown
    pub cooldown_days: u64,
}

impl EligibilityEvaluator {
    pub fn new(max_reward_per_professional: u64, cooldown_days: u64) -> Self {
        Self { max_reward_per_professional, cooldown_days }
    }

    pub fn evaluate(&self, history: &RewardHistory, now: DateTime<Utc>) -> Eligibility {
        let limit = self.max_reward_per_professional;
        if limit > 0 && history.rewarded_count >= limit {
            return Eligibility::ineligible(max_reward_reason(limit));
        }
        if self.cooldown_days > 0 {
            if let Some(last_payout) = history.last_payout_date {
                let cooldown = cooldown_duration(self.cooldown_days);
                let elapsed = now - last_payout;
                if elapsed < cooldown {
                    let remaining = (cooldown - elapsed).num_milliseconds();
                    // Round partial days up
                    let days = (remaining + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
                    return Eligibility::ineligible(cooldown_reason(days));
                }
            }
        }
        Eligibility::eligible()
    }
}
