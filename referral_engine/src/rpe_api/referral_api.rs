use std::fmt::Debug;

use crate::{
    db_types::{Referral, ReferralEvent},
    rpe_api::errors::ReferralFlowError,
    traits::ReferralManagement,
};

/// Read-only access to referrals and their audit trail, for controllers and operators.
pub struct ReferralApi<B> {
    db: B,
}

impl<B> Debug for ReferralApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReferralApi")
    }
}

impl<B> ReferralApi<B>
where B: ReferralManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn get_referral_by_id(&self, id: i64) -> Result<Referral, ReferralFlowError> {
        self.db.fetch_referral(id).await?.ok_or(ReferralFlowError::ReferralNotFound(id))
    }

    pub async fn get_referrals_for_professional(
        &self,
        professional_id: i64,
    ) -> Result<Vec<Referral>, ReferralFlowError> {
        self.db
            .fetch_professional(professional_id)
            .await?
            .ok_or(ReferralFlowError::ProfessionalNotFound(professional_id))?;
        Ok(self.db.fetch_referrals_for_professional(professional_id).await?)
    }

    /// Referrals for an unknown candidate id are an empty list, rather than an error.
    pub async fn get_referrals_for_candidate(&self, candidate_id: i64) -> Result<Vec<Referral>, ReferralFlowError> {
        Ok(self.db.fetch_referrals_for_candidate(candidate_id).await?)
    }

    /// Verified referrals that have not been paid. Operators use this list to follow up on ineligible referrals and
    /// failed payouts.
    pub async fn get_unpaid_verified_referrals(&self) -> Result<Vec<Referral>, ReferralFlowError> {
        Ok(self.db.fetch_unpaid_verified_referrals().await?)
    }

    pub async fn get_events_for_referral(&self, id: i64) -> Result<Vec<ReferralEvent>, ReferralFlowError> {
        self.get_referral_by_id(id).await?;
        Ok(self.db.fetch_events_for_referral(id).await?)
    }
}
