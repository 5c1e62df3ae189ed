use thiserror::Error;

use crate::db_types::{Candidate, Professional, Referral, ReferralEvent, RewardHistory};

#[derive(Debug, Clone, Error)]
pub enum ReferralStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested referral #{0} does not exist")]
    ReferralNotFound(i64),
    #[error("The requested professional #{0} does not exist")]
    ProfessionalNotFound(i64),
    #[error("The requested candidate #{0} does not exist")]
    CandidateNotFound(i64),
    #[error("A record with the same unique value already exists. {0}")]
    AlreadyExists(String),
    #[error("The stored data is inconsistent. {0}")]
    InconsistentData(String),
}

impl From<sqlx::Error> for ReferralStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::AlreadyExists(db.message().to_string()),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

/// The `ReferralManagement` trait defines the read side of the referral store.
///
/// None of these methods change any state. Querying for a record that does not exist returns `None` (or an empty list),
/// not an error.
#[allow(async_fn_in_trait)]
pub trait ReferralManagement {
    async fn fetch_referral(&self, id: i64) -> Result<Option<Referral>, ReferralStoreError>;

    /// Fetches the referral that was created from the inbound email with the given id.
    async fn fetch_referral_by_email_id(&self, referral_email_id: &str)
        -> Result<Option<Referral>, ReferralStoreError>;

    /// All referrals owned by the professional, oldest first.
    async fn fetch_referrals_for_professional(&self, professional_id: i64) -> Result<Vec<Referral>, ReferralStoreError>;

    /// All referrals of the candidate, oldest first.
    async fn fetch_referrals_for_candidate(&self, candidate_id: i64) -> Result<Vec<Referral>, ReferralStoreError>;

    /// Verified referrals that have not been paid yet. This is the reconciliation list for operators: it contains
    /// referrals that were ineligible at verification time, and referrals whose payout failed.
    async fn fetch_unpaid_verified_referrals(&self) -> Result<Vec<Referral>, ReferralStoreError>;

    /// The count of rewarded referrals of the professional and the date of the most recent payout.
    async fn fetch_reward_history(&self, professional_id: i64) -> Result<RewardHistory, ReferralStoreError>;

    async fn fetch_professional(&self, id: i64) -> Result<Option<Professional>, ReferralStoreError>;

    /// Email lookups are case-insensitive.
    async fn fetch_professional_by_email(&self, email: &str) -> Result<Option<Professional>, ReferralStoreError>;

    async fn fetch_candidate(&self, id: i64) -> Result<Option<Candidate>, ReferralStoreError>;

    async fn fetch_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, ReferralStoreError>;

    /// The audit trail of inbound events linked to the referral, in the order they were received.
    async fn fetch_events_for_referral(&self, referral_id: i64) -> Result<Vec<ReferralEvent>, ReferralStoreError>;
}
