use cucumber::World;
use log::*;
use referral_engine::{
    db_types::{Referral, ReferralType},
    events::EventProducers,
    ReferralFlowApi,
    ReferralGatewayDatabase,
    ReferralManagement,
    ReferralPolicy,
    SqliteDatabase,
};

use crate::support::{
    fake_payments::FakePayments,
    prepare_env::{prepare_test_env, tear_down},
};

pub const PLATFORM_EMAIL: &str = "referrals@mentorhub.io";

#[derive(Default, Debug, World)]
pub struct ReferralWorld {
    pub system: Option<ReferralSystem>,
}

#[derive(Debug)]
pub struct ReferralSystem {
    pub db_path: String,
    pub api: ReferralFlowApi<SqliteDatabase, FakePayments, EventProducers>,
}

impl ReferralWorld {
    pub fn api(&self) -> &ReferralFlowApi<SqliteDatabase, FakePayments, EventProducers> {
        &self.system.as_ref().expect("ReferralFlowApi not initialised").api
    }

    pub fn payments(&self) -> &FakePayments {
        self.api().payments()
    }

    /// The most recent referral for the candidate with the given email address.
    pub async fn referral_for(&self, candidate_email: &str) -> Referral {
        let db = self.api().db();
        let candidate = db
            .fetch_candidate_by_email(candidate_email)
            .await
            .expect("Error fetching candidate")
            .unwrap_or_else(|| panic!("Candidate {candidate_email} does not exist"));
        let referrals = db.fetch_referrals_for_candidate(candidate.id).await.expect("Error fetching referrals");
        referrals.into_iter().last().unwrap_or_else(|| panic!("No referral for {candidate_email}"))
    }

    pub async fn professional_id(&self, email: &str) -> i64 {
        let db = self.api().db();
        let pro = db.fetch_professional_by_email(email).await.expect("Error fetching professional");
        pro.unwrap_or_else(|| panic!("Professional {email} does not exist")).id
    }

    pub async fn report_referral(&self, professional_email: &str, candidate_email: &str) -> Referral {
        let pid = self.professional_id(professional_email).await;
        self.api().create_referral(pid, candidate_email, ReferralType::Link).await.expect("Error reporting referral")
    }
}

impl ReferralSystem {
    pub async fn new(policy: ReferralPolicy) -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let policy = policy.with_platform_email(PLATFORM_EMAIL);
        let api = ReferralFlowApi::new(db, FakePayments::new(), EventProducers::default(), policy);
        Self { db_path: url, api }
    }

    /// Closes the connection pool and deletes the scenario's database.
    pub async fn shut_down(mut self) {
        debug!("🚀️ Removing database: {}", self.db_path);
        if let Err(e) = self.api.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        tear_down(&self.db_path).await;
    }
}
