use crate::{
    db_types::{
        Candidate,
        NewCandidate,
        NewProfessional,
        NewReferral,
        NewReferralEvent,
        Professional,
        RewardRecord,
        VerificationDetails,
    },
    traits::{ClaimResult, InsertReferralResult, ReferralManagement, ReferralStoreError, TransitionResult},
};

/// This trait defines the state-changing behaviour of backends supporting the referral engine.
///
/// Every transition is a single conditional update (or a single database transaction), so that overlapping requests
/// for the same referral cannot both succeed. Backends never decide business rules; they only guarantee atomicity and
/// the referral invariants:
/// * `status = rewarded` if and only if `payment_status = paid`, `payment_id` is set and `payout_date` is set.
/// * `email_domain_verified` is only true for verified or rewarded referrals.
#[allow(async_fn_in_trait)]
pub trait ReferralGatewayDatabase: ReferralManagement + Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new referral with `status = pending` and `payment_status = pending`.
    ///
    /// If the referral carries email details and a referral with the same inbound email id already exists, nothing is
    /// stored and the existing referral is returned.
    async fn insert_referral(&self, referral: NewReferral) -> Result<InsertReferralResult, ReferralStoreError>;

    /// Moves a `pending` referral to `verified`, sets `email_domain_verified` and records the verification details.
    async fn mark_verified(
        &self,
        referral_id: i64,
        details: VerificationDetails,
    ) -> Result<TransitionResult, ReferralStoreError>;

    /// Claims a verified, unpaid referral for payout by moving `payment_status` to `processing`.
    ///
    /// The claim only succeeds if the professional's *other* referrals that are `processing` or `paid` number fewer
    /// than `max_rewards` (0 means unlimited), and, if `cooldown_days` is non-zero, none of them is `processing` or was
    /// paid within the last `cooldown_days`. A referral that is already `processing` may be claimed again, since the
    /// transfer that follows is idempotent.
    async fn claim_payout(
        &self,
        referral_id: i64,
        max_rewards: u64,
        cooldown_days: u64,
    ) -> Result<ClaimResult, ReferralStoreError>;

    /// Returns a claimed referral to `payment_status = pending` after a failed transfer.
    async fn release_payout_claim(&self, referral_id: i64) -> Result<(), ReferralStoreError>;

    /// The reward transition. In one database transaction,
    /// * moves a `verified` referral to `rewarded`, `payment_status = paid`, and records the payment id, payout date and
    ///   reward amount,
    /// * increments the professional's `successful_referrals` counter.
    ///
    /// If the referral is not `verified` (e.g. a concurrent caller already rewarded it), nothing changes and the current
    /// record is returned as `Unchanged`.
    async fn commit_reward(&self, referral_id: i64, reward: RewardRecord)
        -> Result<TransitionResult, ReferralStoreError>;

    /// Moves a `pending` or `verified` referral that has no payout in flight to `rejected`.
    async fn reject_referral(&self, referral_id: i64, reason: &str) -> Result<TransitionResult, ReferralStoreError>;

    /// Appends an entry to the audit trail and returns its id.
    async fn record_event(&self, event: NewReferralEvent) -> Result<i64, ReferralStoreError>;

    async fn insert_professional(&self, professional: NewProfessional) -> Result<Professional, ReferralStoreError>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate, ReferralStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReferralStoreError> {
        Ok(())
    }
}
