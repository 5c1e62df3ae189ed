use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::Referral;

/// The result of an idempotent referral insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertReferralResult {
    Inserted(Referral),
    /// A referral with the same inbound email id is already stored. Nothing was changed.
    AlreadyExists(Referral),
}

impl InsertReferralResult {
    pub fn referral(&self) -> &Referral {
        match self {
            InsertReferralResult::Inserted(r) | InsertReferralResult::AlreadyExists(r) => r,
        }
    }

    pub fn into_referral(self) -> Referral {
        match self {
            InsertReferralResult::Inserted(r) | InsertReferralResult::AlreadyExists(r) => r,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertReferralResult::Inserted(_))
    }
}

/// The result of a conditional status transition.
///
/// Transitions are conditional updates. If the referral was not in a state from which the transition is allowed, the
/// update is skipped and the current record is returned as `Unchanged`, so that callers can report what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Applied(Referral),
    Unchanged(Referral),
}

impl TransitionResult {
    pub fn referral(&self) -> &Referral {
        match self {
            TransitionResult::Applied(r) | TransitionResult::Unchanged(r) => r,
        }
    }

    pub fn into_referral(self) -> Referral {
        match self {
            TransitionResult::Applied(r) | TransitionResult::Unchanged(r) => r,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionResult::Applied(_))
    }
}

/// The result of trying to claim a referral for payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    /// The referral is now `processing` and this caller may transfer the reward.
    Claimed(Referral),
    /// Someone else already paid the referral out.
    AlreadyRewarded(Referral),
    /// The professional's other claimed or paid referrals have already reached the cap.
    CapReached,
    /// Another of the professional's referrals was paid (or is being paid) within the cooldown window. For a payout
    /// that is still in flight, `last_payout` is the time of the claim attempt.
    CooldownActive { last_payout: DateTime<Utc> },
    /// The referral is not verified (pending or rejected).
    NotClaimable(Referral),
}

/// Parameters of a single monetary transfer to a connected payout account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in minor units of `currency`
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    pub description: String,
    /// Repeated requests with the same key must result in (at most) one transfer at the provider.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// The provider's transfer id
    pub id: String,
}

impl TransferReceipt {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self { id: id.into() }
    }
}
