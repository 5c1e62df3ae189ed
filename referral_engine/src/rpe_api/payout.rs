//! # Payout executor
//!
//! Transfers the reward for a verified referral to the professional's connected payout account, exactly once.
//!
//! Exactly-once is the result of three guards working together:
//! 1. The payout is *claimed* first (`payment_status = processing`) with a conditional update that also enforces the
//!    per-professional reward cap and cooldown window. Concurrent payouts for different referrals of the same
//!    professional are serialised by the store at this point: while one of them is in flight, the others count
//!    against the cap, and block the claim outright if a cooldown is configured.
//! 2. The transfer carries the idempotency key `referral-<id>`, so repeated attempts for one referral collapse into a
//!    single transfer at the provider.
//! 3. `commit_reward` only applies to a referral that is still `verified`. A caller that loses the race finds the
//!    referral already `rewarded` and reports the winner's payout.
//!
//! A failed transfer releases the claim, and leaves the referral `verified` and unpaid so that the payout can be retried.
use chrono::{DateTime, Utc};
use log::*;
use referral_common::Cents;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db_types::{Referral, ReferralStatus, RewardHistory, RewardRecord},
    rpe_api::{
        eligibility::{cooldown_reason, max_reward_reason, EligibilityEvaluator},
        errors::PayoutError,
        policy::ReferralPolicy,
    },
    traits::{
        ClaimResult,
        NotificationSink,
        NotificationType,
        PaymentTransfer,
        ReferralGatewayDatabase,
        TransferRequest,
        TransitionResult,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResult {
    pub amount: Cents,
    pub transfer_id: String,
    pub payout_date: DateTime<Utc>,
    /// True if the referral had already been paid and no new transfer was made by this call.
    pub already_paid: bool,
}

impl PayoutResult {
    /// The payout information recorded on a rewarded referral.
    pub fn from_rewarded(referral: &Referral) -> Result<Self, PayoutError> {
        match (&referral.payment_id, referral.payout_date, referral.reward_amount) {
            (Some(id), Some(date), Some(amount)) if referral.is_rewarded() => {
                Ok(Self { amount, transfer_id: id.clone(), payout_date: date, already_paid: true })
            },
            _ => Err(PayoutError::IncompletePayoutRecord(referral.id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PayoutOutcome {
    Paid(PayoutResult),
    /// The referral is not eligible for payment. It stays verified and unpaid.
    Ineligible { reason: String },
}

impl PayoutOutcome {
    pub fn is_paid(&self) -> bool {
        matches!(self, PayoutOutcome::Paid(_))
    }

    pub fn payout_result(&self) -> Option<&PayoutResult> {
        match self {
            PayoutOutcome::Paid(r) => Some(r),
            PayoutOutcome::Ineligible { .. } => None,
        }
    }
}

pub struct PayoutExecutor<'a, B, P, N> {
    db: &'a B,
    payments: &'a P,
    notifier: &'a N,
    policy: &'a ReferralPolicy,
}

impl<'a, B, P, N> PayoutExecutor<'a, B, P, N>
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
    N: NotificationSink,
{
    pub fn new(db: &'a B, payments: &'a P, notifier: &'a N, policy: &'a ReferralPolicy) -> Self {
        Self { db, payments, notifier, policy }
    }

    fn cooldown_reason(&self, last_payout: DateTime<Utc>) -> String {
        let history = RewardHistory { rewarded_count: 0, last_payout_date: Some(last_payout) };
        EligibilityEvaluator::new(0, self.policy.cooldown_days)
            .evaluate(&history, Utc::now())
            .reason
            .unwrap_or_else(|| cooldown_reason(1))
    }

    /// Pays out the reward for the referral.
    ///
    /// If the referral is already rewarded, the original payout is returned and no transfer is made.
    pub async fn payout(&self, referral: &Referral) -> Result<PayoutOutcome, PayoutError> {
        let id = referral.id;
        let pid = referral.professional_id;
        match referral.status {
            ReferralStatus::Rewarded => {
                debug!("💸️ Referral #{id} has already been paid out");
                return PayoutResult::from_rewarded(referral).map(PayoutOutcome::Paid);
            },
            ReferralStatus::Verified if !referral.email_domain_verified => {
                return Err(PayoutError::NotDomainVerified(id));
            },
            ReferralStatus::Verified => {},
            status => return Err(PayoutError::NotVerified { id, status }),
        }
        let professional = self.db.fetch_professional(pid).await?.ok_or(PayoutError::ProfessionalNotFound(pid))?;
        let destination = professional
            .payout_account_id
            .filter(|acc| !acc.trim().is_empty())
            .ok_or(PayoutError::MissingPayoutAccount(pid))?;
        let max_rewards = self.policy.max_reward_per_professional;
        let claimed = match self.db.claim_payout(id, max_rewards, self.policy.cooldown_days).await? {
            ClaimResult::Claimed(r) => r,
            ClaimResult::AlreadyRewarded(r) => {
                debug!("💸️ Referral #{id} was paid out by a concurrent request");
                return PayoutResult::from_rewarded(&r).map(PayoutOutcome::Paid);
            },
            ClaimResult::CapReached => {
                let reason = max_reward_reason(max_rewards);
                info!("💸️ Referral #{id} cannot be paid out. {reason}");
                return Ok(PayoutOutcome::Ineligible { reason });
            },
            ClaimResult::CooldownActive { last_payout } => {
                let reason = self.cooldown_reason(last_payout);
                info!("💸️ Referral #{id} cannot be paid out. {reason}");
                return Ok(PayoutOutcome::Ineligible { reason });
            },
            ClaimResult::NotClaimable(r) => return Err(PayoutError::NotVerified { id, status: r.status }),
        };
        let amount = self.policy.reward_amount;
        let request = TransferRequest {
            amount: amount.value(),
            currency: self.policy.currency.clone(),
            destination,
            description: format!("Referral reward for referral #{id}"),
            idempotency_key: claimed.idempotency_key(),
        };
        debug!("💸️ Transferring {amount} {} to professional #{pid} for referral #{id}", request.currency);
        let receipt = match self.payments.transfer(request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("💸️ Payout for referral #{id} to professional #{pid} failed. The referral remains verified. {e}");
                if let Err(release_err) = self.db.release_payout_claim(id).await {
                    error!("💸️ Could not release the payout claim on referral #{id}. {release_err}");
                }
                return Err(PayoutError::TransferFailed { referral_id: id, professional_id: pid, source: e });
            },
        };
        let reward = RewardRecord { payment_id: receipt.id.clone(), amount, payout_date: Utc::now() };
        match self.db.commit_reward(id, reward).await {
            Ok(TransitionResult::Applied(rewarded)) => {
                info!("💸️ Referral #{id} rewarded. {amount} paid to professional #{pid} with transfer {}", receipt.id);
                let result = PayoutResult::from_rewarded(&rewarded)?;
                let payload = json!({
                    "referralId": id,
                    "amount": result.amount,
                    "currency": self.policy.currency,
                    "transferId": result.transfer_id,
                });
                self.notifier.notify(pid, NotificationType::ReferralRewarded, payload).await;
                Ok(PayoutOutcome::Paid(PayoutResult { already_paid: false, ..result }))
            },
            Ok(TransitionResult::Unchanged(current)) if current.is_rewarded() => {
                debug!("💸️ Referral #{id} was rewarded by a concurrent request");
                PayoutResult::from_rewarded(&current).map(PayoutOutcome::Paid)
            },
            Ok(TransitionResult::Unchanged(current)) => {
                error!(
                    "💸️ Transfer {} for referral #{id} succeeded, but the referral is now {}. Manual reconciliation is \
                     required for professional #{pid}",
                    receipt.id, current.status
                );
                Err(PayoutError::UnrecordedTransfer { referral_id: id, transfer_id: receipt.id })
            },
            Err(e) => {
                error!(
                    "💸️ Transfer {} for referral #{id} succeeded, but it could not be recorded. Professional #{pid}. A \
                     retry will reuse the same transfer. {e}",
                    receipt.id
                );
                Err(PayoutError::UnrecordedTransfer { referral_id: id, transfer_id: receipt.id })
            },
        }
    }
}
