use referral_common::{Cents, DEFAULT_CURRENCY_CODE};

use crate::rpe_api::eligibility::EligibilityEvaluator;

pub const DEFAULT_REWARD_AMOUNT: i64 = 5000;

/// The business configuration of the referral programme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralPolicy {
    /// The platform mailbox that must be CC'd on referral emails
    pub platform_email: String,
    /// Paid per rewarded referral. The amount is fixed on the referral when it is rewarded.
    pub reward_amount: Cents,
    pub currency: String,
    /// Zero means unlimited
    pub max_reward_per_professional: u64,
    /// Zero disables the cooldown
    pub cooldown_days: u64,
}

impl Default for ReferralPolicy {
    fn default() -> Self {
        Self {
            platform_email: String::default(),
            reward_amount: Cents::from(DEFAULT_REWARD_AMOUNT),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            max_reward_per_professional: 0,
            cooldown_days: 0,
        }
    }
}

impl ReferralPolicy {
    pub fn with_platform_email<S: Into<String>>(mut self, email: S) -> Self {
        self.platform_email = email.into();
        self
    }

    pub fn with_reward_amount(mut self, amount: Cents) -> Self {
        self.reward_amount = amount;
        self
    }

    pub fn with_max_rewards(mut self, max_rewards: u64) -> Self {
        self.max_reward_per_professional = max_rewards;
        self
    }

    pub fn with_cooldown_days(mut self, days: u64) -> Self {
        self.cooldown_days = days;
        self
    }

    pub fn evaluator(&self) -> EligibilityEvaluator {
        EligibilityEvaluator::new(self.max_reward_per_professional, self.cooldown_days)
    }
}
