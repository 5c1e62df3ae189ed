use mockall::mock;
use referral_engine::{
    db_types::{Candidate, Professional, Referral, ReferralEvent, RewardHistory},
    traits::{PaymentTransfer, ReferralManagement, ReferralStoreError, TransferError, TransferReceipt, TransferRequest},
};

mock! {
    pub Payments {}
    impl PaymentTransfer for Payments {
        async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, TransferError>;
    }
}

mock! {
    pub ReferralStore {}
    impl ReferralManagement for ReferralStore {
        async fn fetch_referral(&self, id: i64) -> Result<Option<Referral>, ReferralStoreError>;
        async fn fetch_referral_by_email_id(&self, referral_email_id: &str) -> Result<Option<Referral>, ReferralStoreError>;
        async fn fetch_referrals_for_professional(&self, professional_id: i64) -> Result<Vec<Referral>, ReferralStoreError>;
        async fn fetch_referrals_for_candidate(&self, candidate_id: i64) -> Result<Vec<Referral>, ReferralStoreError>;
        async fn fetch_unpaid_verified_referrals(&self) -> Result<Vec<Referral>, ReferralStoreError>;
        async fn fetch_reward_history(&self, professional_id: i64) -> Result<RewardHistory, ReferralStoreError>;
        async fn fetch_professional(&self, id: i64) -> Result<Option<Professional>, ReferralStoreError>;
        async fn fetch_professional_by_email(&self, email: &str) -> Result<Option<Professional>, ReferralStoreError>;
        async fn fetch_candidate(&self, id: i64) -> Result<Option<Candidate>, ReferralStoreError>;
        async fn fetch_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, ReferralStoreError>;
        async fn fetch_events_for_referral(&self, referral_id: i64) -> Result<Vec<ReferralEvent>, ReferralStoreError>;
    }
}
