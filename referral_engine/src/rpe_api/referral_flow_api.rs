use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db_types::{
        Candidate,
        NewCandidate,
        NewProfessional,
        NewReferral,
        NewReferralEvent,
        Professional,
        Referral,
        ReferralStatus,
        ReferralType,
        VerificationDetails,
    },
    events::EventProducers,
    helpers::{parse_referral_email, ParsedReferralEmail},
    mail_types::{InboundEmail, MailEvent, TrackingEvent},
    rpe_api::{
        eligibility::Eligibility,
        errors::ReferralFlowError,
        payout::{PayoutExecutor, PayoutOutcome},
        policy::ReferralPolicy,
    },
    traits::{
        NotificationSink,
        NotificationType,
        PaymentTransfer,
        ReferralGatewayDatabase,
        TransitionResult,
    },
};

/// The result of a verify request: the referral as it stands afterwards, and what happened to its payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub referral: Referral,
    pub payout: PayoutOutcome,
}

/// What became of a single inbound mail event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InboundOutcome {
    /// A delivery-tracking event. It was added to the audit trail.
    Tracked { event: String },
    /// Not a referral email (the platform was not CC'd, or the addresses are unusable).
    Ignored,
    /// A referral email whose sender or candidate is not known to the platform.
    Unmatched { reason: String },
    Processed {
        referral_id: i64,
        status: ReferralStatus,
        /// False if this email had been received before
        new_referral: bool,
        payout: Option<PayoutOutcome>,
        payout_error: Option<String>,
    },
    /// Processing failed. The event is acknowledged anyway.
    Failed { reason: String },
}

/// `ReferralFlowApi` is the referral state machine. It handles referral reports from professionals, inbound mail
/// events, and the admin actions that move a referral through its lifecycle:
///
/// ```text
///   pending ──verify──> verified ──payout──> rewarded
///      │                   │
///      └─────reject────────┴──> rejected
/// ```
///
/// Every transition is applied by the storage backend as a conditional update, so the API can be called concurrently
/// for the same referral. Payouts are idempotent, and repeating any call on a referral that has moved on is a no-op that
/// reports the current state.
pub struct ReferralFlowApi<B, P, N = EventProducers> {
    db: B,
    payments: P,
    notifier: N,
    policy: ReferralPolicy,
}

impl<B, P, N> Debug for ReferralFlowApi<B, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReferralFlowApi ({:?})", self.policy)
    }
}

impl<B, P, N> ReferralFlowApi<B, P, N> {
    pub fn new(db: B, payments: P, notifier: N, policy: ReferralPolicy) -> Self {
        Self { db, payments, notifier, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn payments(&self) -> &P {
        &self.payments
    }

    pub fn policy(&self) -> &ReferralPolicy {
        &self.policy
    }
}

impl<B, P, N> ReferralFlowApi<B, P, N>
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
    N: NotificationSink,
{
    fn executor(&self) -> PayoutExecutor<'_, B, P, N> {
        PayoutExecutor::new(&self.db, &self.payments, &self.notifier, &self.policy)
    }

    /// A professional reports that they referred the candidate with the given email address. The referral is created
    /// as `pending` and waits for an admin to verify it.
    pub async fn create_referral(
        &self,
        professional_id: i64,
        candidate_email: &str,
        referral_type: ReferralType,
    ) -> Result<Referral, ReferralFlowError> {
        self.db
            .fetch_professional(professional_id)
            .await?
            .ok_or(ReferralFlowError::ProfessionalNotFound(professional_id))?;
        let candidate = self
            .db
            .fetch_candidate_by_email(candidate_email)
            .await?
            .ok_or_else(|| ReferralFlowError::CandidateNotFound(candidate_email.to_string()))?;
        let new_referral = NewReferral::new(professional_id, candidate.id, referral_type);
        let referral = self.db.insert_referral(new_referral).await?.into_referral();
        info!(
            "🔄️ Referral #{} ({referral_type}) reported by professional #{professional_id} for candidate #{}",
            referral.id, candidate.id
        );
        self.notify_received(&referral).await;
        Ok(referral)
    }

    /// Handles all the events from one mail-provider webhook call. Failures are logged and reported per event; this
    /// method never fails, since the provider must always receive an acknowledgement.
    pub async fn process_mail_events(&self, events: Vec<MailEvent>) -> Vec<InboundOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let outcome = match event {
                MailEvent::Tracking(ev) => self.process_tracking_event(ev).await,
                MailEvent::Inbound(email) => self.process_inbound_email(&email).await,
            };
            let outcome = outcome.unwrap_or_else(|e| {
                error!("🔄️📧️ Could not process mail event. {e}");
                InboundOutcome::Failed { reason: e.to_string() }
            });
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn process_tracking_event(&self, event: TrackingEvent) -> Result<InboundOutcome, ReferralFlowError> {
        trace!("🔄️📧️ Tracking event '{}' for {:?}", event.event, event.email);
        let data = serde_json::to_value(&event).unwrap_or_default();
        self.db.record_event(NewReferralEvent::new(event.event.clone(), data)).await?;
        Ok(InboundOutcome::Tracked { event: event.event })
    }

    /// Handles an email received on the platform mailbox.
    ///
    /// If it is a referral email from a known professional about a known candidate, a referral is created (or, for a
    /// redelivered email, found) and advanced as far as it can go: automatic verification when the sender and recipient
    /// domains match, followed by the eligibility check and payout.
    pub async fn process_inbound_email(&self, email: &InboundEmail) -> Result<InboundOutcome, ReferralFlowError> {
        let data = serde_json::to_value(email).unwrap_or_default();
        let Some(parsed) = parse_referral_email(email, &self.policy.platform_email) else {
            debug!("🔄️📧️ Inbound email is not a referral email. Ignoring it.");
            self.db.record_event(NewReferralEvent::new("inbound", data)).await?;
            return Ok(InboundOutcome::Ignored);
        };
        let sender = parsed.details.sender_email.clone();
        let Some(professional) = self.db.fetch_professional_by_email(&sender).await? else {
            info!("🔄️📧️ Referral email from {sender}, who is not a registered professional. Ignoring it.");
            self.db.record_event(NewReferralEvent::new("inbound", data)).await?;
            return Ok(InboundOutcome::Unmatched { reason: format!("Unknown professional: {sender}") });
        };
        let Some(candidate_id) = self.resolve_candidate(&parsed).await? else {
            info!("🔄️📧️ Referral email from professional #{} does not name a registered candidate.", professional.id);
            self.db.record_event(NewReferralEvent::new("inbound", data)).await?;
            return Ok(InboundOutcome::Unmatched { reason: "Unknown candidate".to_string() });
        };
        let domains_match = parsed.domains_match;
        let new_referral =
            NewReferral::new(professional.id, candidate_id, ReferralType::Email).with_email_details(parsed.details);
        let inserted = self.db.insert_referral(new_referral).await?;
        let new_referral = inserted.is_new();
        let referral = inserted.into_referral();
        self.db.record_event(NewReferralEvent::new("inbound", data).for_referral(Some(referral.id))).await?;
        if new_referral {
            info!(
                "🔄️📧️ Referral #{} created from email. Professional #{} referred candidate #{candidate_id}",
                referral.id, professional.id
            );
            self.notify_received(&referral).await;
        } else {
            debug!("🔄️📧️ Email for referral #{} was delivered again", referral.id);
        }
        let referral = if domains_match && referral.status == ReferralStatus::Pending {
            self.verify(referral.id, VerificationDetails::automatic()).await?
        } else {
            if !domains_match {
                debug!("🔄️📧️ Referral #{} email domains do not match. It needs manual review", referral.id);
            }
            referral
        };
        let (payout, payout_error) = if referral.is_verified_unpaid() {
            match self.evaluate_and_pay(&referral).await {
                Ok(outcome) => (Some(outcome), None),
                Err(e) => {
                    warn!("🔄️📧️ Referral #{} is verified but the payout did not complete. {e}", referral.id);
                    (None, Some(e.to_string()))
                },
            }
        } else {
            (None, None)
        };
        let status = self.db.fetch_referral(referral.id).await?.map(|r| r.status).unwrap_or(referral.status);
        Ok(InboundOutcome::Processed { referral_id: referral.id, status, new_referral, payout, payout_error })
    }

    /// The candidate is the first CC'd address (other than the platform) that belongs to a registered candidate. If
    /// there is none, the recipient is tried.
    async fn resolve_candidate(&self, parsed: &ParsedReferralEmail) -> Result<Option<i64>, ReferralFlowError> {
        let recipient = std::iter::once(&parsed.details.recipient_email);
        for address in parsed.other_cc.iter().chain(recipient) {
            if let Some(candidate) = self.db.fetch_candidate_by_email(address).await? {
                return Ok(Some(candidate.id));
            }
        }
        Ok(None)
    }

    /// An admin verifies the referral. A verified referral is then checked for eligibility and paid out if eligible.
    ///
    /// Verifying a referral that is already verified does not redo the verification, but does retry the payout.
    /// Verifying a rewarded referral returns the original payout.
    pub async fn verify_referral(&self, id: i64, admin_id: &str) -> Result<VerificationOutcome, ReferralFlowError> {
        let referral = self.fetch_referral(id).await?;
        let referral = match referral.status {
            ReferralStatus::Pending => self.verify(id, VerificationDetails::manual(admin_id)).await?,
            ReferralStatus::Verified => {
                debug!("🔄️ Referral #{id} is already verified. Proceeding to payout");
                referral
            },
            ReferralStatus::Rewarded => referral,
            status @ ReferralStatus::Rejected => {
                return Err(ReferralFlowError::InvalidTransition { id, action: "verified", status });
            },
        };
        if referral.status == ReferralStatus::Rejected {
            return Err(ReferralFlowError::InvalidTransition { id, action: "verified", status: referral.status });
        }
        let payout = self.evaluate_and_pay(&referral).await?;
        let referral = self.fetch_referral(id).await?;
        Ok(VerificationOutcome { referral, payout })
    }

    /// Applies the verification transition. If a concurrent request got there first, the current record is returned.
    async fn verify(&self, id: i64, details: VerificationDetails) -> Result<Referral, ReferralFlowError> {
        let method = details.verification_method.clone();
        match self.db.mark_verified(id, details).await? {
            TransitionResult::Applied(referral) => {
                info!("🔄️✅️ Referral #{id} verified ({method})");
                let payload = json!({ "referralId": id, "verificationMethod": method });
                self.notifier.notify(referral.professional_id, NotificationType::ReferralVerified, payload).await;
                Ok(referral)
            },
            TransitionResult::Unchanged(referral) => {
                debug!("🔄️✅️ Referral #{id} was not verified, because it is {}", referral.status);
                Ok(referral)
            },
        }
    }

    /// Re-triggers the payout of a verified referral, e.g. after a failed transfer. Idempotent: a rewarded referral
    /// returns its original payout.
    pub async fn process_referral_payout(&self, id: i64) -> Result<PayoutOutcome, ReferralFlowError> {
        let referral = self.fetch_referral(id).await?;
        match referral.status {
            ReferralStatus::Verified | ReferralStatus::Rewarded => self.evaluate_and_pay(&referral).await,
            status => Err(ReferralFlowError::InvalidTransition { id, action: "paid out", status }),
        }
    }

    /// Checks the professional's eligibility and, if eligible, pays out the referral.
    async fn evaluate_and_pay(&self, referral: &Referral) -> Result<PayoutOutcome, ReferralFlowError> {
        if !referral.is_rewarded() {
            let eligibility = self.evaluate_eligibility(referral.professional_id).await?;
            if let Some(reason) = eligibility.reason.filter(|_| !eligibility.eligible) {
                info!("🔄️💸️ Referral #{} is verified but not eligible for a reward. {reason}", referral.id);
                return Ok(PayoutOutcome::Ineligible { reason });
            }
        }
        Ok(self.executor().payout(referral).await?)
    }

    /// Evaluates whether the professional may receive another reward right now.
    pub async fn evaluate_eligibility(&self, professional_id: i64) -> Result<Eligibility, ReferralFlowError> {
        let history = self.db.fetch_reward_history(professional_id).await?;
        Ok(self.policy.evaluator().evaluate(&history, Utc::now()))
    }

    /// An admin rejects the referral. Referrals that are rewarded, or that have a payout in progress, cannot be
    /// rejected. Rejecting a rejected referral is a no-op.
    pub async fn reject_referral(&self, id: i64, reason: &str) -> Result<Referral, ReferralFlowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReferralFlowError::MissingRejectionReason);
        }
        match self.db.reject_referral(id, reason).await? {
            TransitionResult::Applied(referral) => {
                info!("🔄️❌️ Referral #{id} rejected. {reason}");
                let payload = json!({ "referralId": id, "reason": reason });
                self.notifier.notify(referral.professional_id, NotificationType::ReferralRejected, payload).await;
                Ok(referral)
            },
            TransitionResult::Unchanged(referral) => match referral.status {
                ReferralStatus::Rejected => Ok(referral),
                ReferralStatus::Pending | ReferralStatus::Verified => Err(ReferralFlowError::PayoutInProgress(id)),
                status => Err(ReferralFlowError::InvalidTransition { id, action: "rejected", status }),
            },
        }
    }

    async fn fetch_referral(&self, id: i64) -> Result<Referral, ReferralFlowError> {
        self.db.fetch_referral(id).await?.ok_or(ReferralFlowError::ReferralNotFound(id))
    }

    async fn notify_received(&self, referral: &Referral) {
        let payload = json!({
            "referralId": referral.id,
            "candidateId": referral.candidate_id,
            "referralType": referral.referral_type,
        });
        self.notifier.notify(referral.professional_id, NotificationType::ReferralReceived, payload).await;
    }
}

impl<B, P, N> ReferralFlowApi<B, P, N>
where B: ReferralGatewayDatabase
{
    /// Registers a professional in the directory. Used by operators and test fixtures.
    pub async fn register_professional(&self, professional: NewProfessional) -> Result<Professional, ReferralFlowError> {
        Ok(self.db.insert_professional(professional).await?)
    }

    /// Registers a candidate in the directory. Used by operators and test fixtures.
    pub async fn register_candidate(&self, candidate: NewCandidate) -> Result<Candidate, ReferralFlowError> {
        Ok(self.db.insert_candidate(candidate).await?)
    }
}
