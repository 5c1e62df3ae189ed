use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{new_pool, parties, referral_events, referrals, SqliteDatabaseError};
use crate::{
    db_types::{
        Candidate,
        NewCandidate,
        NewProfessional,
        NewReferral,
        NewReferralEvent,
        Professional,
        Referral,
        ReferralEvent,
        ReferralStatus,
        RewardHistory,
        RewardRecord,
        VerificationDetails,
    },
    rpe_api::eligibility::cooldown_duration,
    traits::{
        ClaimResult,
        InsertReferralResult,
        ReferralGatewayDatabase,
        ReferralManagement,
        ReferralStoreError,
        TransitionResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object with a connection pool of at most `max_connections` connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date by running the embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ReferralManagement for SqliteDatabase {
    async fn fetch_referral(&self, id: i64) -> Result<Option<Referral>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referrals::fetch_referral(id, &mut conn).await?)
    }

    async fn fetch_referral_by_email_id(
        &self,
        referral_email_id: &str,
    ) -> Result<Option<Referral>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referrals::fetch_referral_by_email_id(referral_email_id, &mut conn).await?)
    }

    async fn fetch_referrals_for_professional(&self, professional_id: i64) -> Result<Vec<Referral>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referrals::fetch_referrals_for_professional(professional_id, &mut conn).await?)
    }

    async fn fetch_referrals_for_candidate(&self, candidate_id: i64) -> Result<Vec<Referral>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referrals::fetch_referrals_for_candidate(candidate_id, &mut conn).await?)
    }

    async fn fetch_unpaid_verified_referrals(&self) -> Result<Vec<Referral>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referrals::fetch_unpaid_verified(&mut conn).await?)
    }

    async fn fetch_reward_history(&self, professional_id: i64) -> Result<RewardHistory, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referrals::fetch_reward_history(professional_id, &mut conn).await?)
    }

    async fn fetch_professional(&self, id: i64) -> Result<Option<Professional>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(parties::fetch_professional(id, &mut conn).await?)
    }

    async fn fetch_professional_by_email(&self, email: &str) -> Result<Option<Professional>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(parties::fetch_professional_by_email(email, &mut conn).await?)
    }

    async fn fetch_candidate(&self, id: i64) -> Result<Option<Candidate>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(parties::fetch_candidate(id, &mut conn).await?)
    }

    async fn fetch_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(parties::fetch_candidate_by_email(email, &mut conn).await?)
    }

    async fn fetch_events_for_referral(&self, referral_id: i64) -> Result<Vec<ReferralEvent>, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(referral_events::fetch_events_for_referral(referral_id, &mut conn).await?)
    }
}

impl ReferralGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_referral(&self, referral: NewReferral) -> Result<InsertReferralResult, ReferralStoreError> {
        let email_id = referral.email_details.as_ref().map(|d| d.referral_email_id.clone());
        let mut tx = self.pool.begin().await?;
        let result = match referrals::insert_referral(referral, Utc::now(), &mut tx).await? {
            Some(id) => {
                let referral = referrals::fetch_referral(id, &mut tx)
                    .await?
                    .ok_or(SqliteDatabaseError::ReferralDisappeared(id))?;
                debug!("🗃️ Referral #{id} has been saved in the DB");
                InsertReferralResult::Inserted(referral)
            },
            None => {
                let email_id = email_id.unwrap_or_default();
                let existing = referrals::fetch_referral_by_email_id(&email_id, &mut tx).await?.ok_or_else(|| {
                    ReferralStoreError::InconsistentData(format!(
                        "Insert of email {email_id} conflicted, but no referral has that email id"
                    ))
                })?;
                debug!("🗃️ Email {email_id} already belongs to referral #{}. Nothing inserted", existing.id);
                InsertReferralResult::AlreadyExists(existing)
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn mark_verified(
        &self,
        referral_id: i64,
        details: VerificationDetails,
    ) -> Result<TransitionResult, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        let changed = referrals::mark_verified(referral_id, &details, &mut conn).await?;
        let referral = referrals::fetch_existing_referral(referral_id, &mut conn).await?;
        if changed {
            debug!("🗃️ Referral #{referral_id} marked as verified ({})", details.verification_method);
            Ok(TransitionResult::Applied(referral))
        } else {
            trace!("🗃️ Referral #{referral_id} is {} and was not marked as verified", referral.status);
            Ok(TransitionResult::Unchanged(referral))
        }
    }

    async fn claim_payout(
        &self,
        referral_id: i64,
        max_rewards: u64,
        cooldown_days: u64,
    ) -> Result<ClaimResult, ReferralStoreError> {
        let max_rewards = i64::try_from(max_rewards).unwrap_or(i64::MAX);
        let now = Utc::now();
        let cooldown_start = (cooldown_days > 0).then(|| now - cooldown_duration(cooldown_days));
        let mut conn = self.pool.acquire().await?;
        let claimed = referrals::claim_payout(referral_id, max_rewards, cooldown_start, now, &mut conn).await?;
        let referral = referrals::fetch_existing_referral(referral_id, &mut conn).await?;
        let result = match (claimed, referral.status) {
            (true, _) => {
                debug!("🗃️ Referral #{referral_id} claimed for payout");
                ClaimResult::Claimed(referral)
            },
            (false, ReferralStatus::Rewarded) => ClaimResult::AlreadyRewarded(referral),
            (false, ReferralStatus::Verified) => {
                let (count, in_flight, last_payout) = referrals::fetch_claim_blockers(referral_id, &mut conn).await?;
                if max_rewards > 0 && count >= max_rewards {
                    debug!("🗃️ Referral #{referral_id} could not be claimed. The reward cap of {max_rewards} is reached");
                    ClaimResult::CapReached
                } else {
                    let last_payout = if in_flight { now } else { last_payout.unwrap_or(now) };
                    debug!("🗃️ Referral #{referral_id} could not be claimed. Last payout at {last_payout} is in cooldown");
                    ClaimResult::CooldownActive { last_payout }
                }
            },
            (false, _) => ClaimResult::NotClaimable(referral),
        };
        Ok(result)
    }

    async fn release_payout_claim(&self, referral_id: i64) -> Result<(), ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        if referrals::release_payout_claim(referral_id, Utc::now(), &mut conn).await? {
            debug!("🗃️ Payout claim on referral #{referral_id} released");
        }
        Ok(())
    }

    async fn commit_reward(
        &self,
        referral_id: i64,
        reward: RewardRecord,
    ) -> Result<TransitionResult, ReferralStoreError> {
        let mut tx = self.pool.begin().await?;
        // The first statement is a write, so the transaction takes the write lock straight away
        let changed = referrals::mark_rewarded(referral_id, &reward, &mut tx).await?;
        let referral = referrals::fetch_existing_referral(referral_id, &mut tx).await?;
        if !changed {
            tx.rollback().await?;
            trace!("🗃️ Referral #{referral_id} is {} and was not rewarded", referral.status);
            return Ok(TransitionResult::Unchanged(referral));
        }
        let pid = referral.professional_id;
        if !parties::increment_successful_referrals(pid, reward.payout_date, &mut tx).await? {
            tx.rollback().await?;
            return Err(ReferralStoreError::ProfessionalNotFound(pid));
        }
        tx.commit().await?;
        debug!(
            "🗃️ Referral #{referral_id} rewarded with {} (payment {}). Professional #{pid} stats updated",
            reward.amount, reward.payment_id
        );
        Ok(TransitionResult::Applied(referral))
    }

    async fn reject_referral(&self, referral_id: i64, reason: &str) -> Result<TransitionResult, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        let changed = referrals::mark_rejected(referral_id, reason, Utc::now(), &mut conn).await?;
        let referral = referrals::fetch_existing_referral(referral_id, &mut conn).await?;
        if changed {
            debug!("🗃️ Referral #{referral_id} rejected");
            Ok(TransitionResult::Applied(referral))
        } else {
            Ok(TransitionResult::Unchanged(referral))
        }
    }

    async fn record_event(&self, event: NewReferralEvent) -> Result<i64, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        let event_type = event.event_type.clone();
        let id = referral_events::insert_event(event, Utc::now(), &mut conn).await?;
        trace!("🗃️ Event '{event_type}' recorded with id {id}");
        Ok(id)
    }

    async fn insert_professional(&self, professional: NewProfessional) -> Result<Professional, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        let professional = parties::insert_professional(professional, &mut conn).await?;
        debug!("🗃️ Professional #{} ({}) added", professional.id, professional.email);
        Ok(professional)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate, ReferralStoreError> {
        let mut conn = self.pool.acquire().await?;
        let candidate = parties::insert_candidate(candidate, &mut conn).await?;
        debug!("🗃️ Candidate #{} ({}) added", candidate.id, candidate.email);
        Ok(candidate)
    }

    async fn close(&mut self) -> Result<(), ReferralStoreError> {
        self.pool.close().await;
        Ok(())
    }
}
