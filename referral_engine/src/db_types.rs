//! Data types shared by the storage backends and the public API of the referral engine.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use referral_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------    ReferralType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReferralType {
    /// Evidence is an introduction email with the platform mailbox in CC
    Email,
    /// Reported by the professional after sharing a referral link
    Link,
    Other,
}

impl Display for ReferralType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferralType::Email => write!(f, "email"),
            ReferralType::Link => write!(f, "link"),
            ReferralType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for ReferralType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "link" => Ok(Self::Link),
            "other" => Ok(Self::Other),
            _ => Err(ConversionError::new("referral type", s)),
        }
    }
}

//--------------------------------------   ReferralStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    /// The referral has been reported, but not verified yet.
    Pending,
    /// The referral has been verified, automatically or by an admin. It may or may not be eligible for a reward yet.
    Verified,
    /// An admin rejected the referral. Terminal.
    Rejected,
    /// The reward has been paid out. Terminal.
    Rewarded,
}

impl ReferralStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Rewarded)
    }
}

impl Display for ReferralStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferralStatus::Pending => write!(f, "pending"),
            ReferralStatus::Verified => write!(f, "verified"),
            ReferralStatus::Rejected => write!(f, "rejected"),
            ReferralStatus::Rewarded => write!(f, "rewarded"),
        }
    }
}

impl FromStr for ReferralStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            "rewarded" => Ok(Self::Rewarded),
            s => Err(ConversionError::new("referral status", s)),
        }
    }
}

impl From<String> for ReferralStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid referral status: {value}. But this conversion cannot fail. Defaulting to pending");
            ReferralStatus::Pending
        })
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    /// A payout has been claimed and the transfer is in flight.
    Processing,
    Paid,
    /// Flagged by an operator after a transfer was reversed or needs attention. Payouts may be re-attempted.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Processing => write!(f, "processing"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError::new("payment status", s)),
        }
    }
}

//--------------------------------------    EmailDetails       ---------------------------------------------------------
/// The structured evidence extracted from a referral email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDetails {
    pub sender_email: String,
    pub sender_domain: String,
    pub recipient_email: String,
    pub recipient_domain: String,
    pub cc_emails: Vec<String>,
    pub subject: Option<String>,
    pub referral_email_id: String,
    pub timestamp: DateTime<Utc>,
}

impl EmailDetails {
    pub fn domains_match(&self) -> bool {
        self.sender_domain == self.recipient_domain
    }
}

//-------------------------------------- VerificationDetails  ---------------------------------------------------------
pub const AUTOMATIC_DOMAIN_MATCH: &str = "automatic-domain-match";
pub const MANUAL_REVIEW: &str = "manual-review";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDetails {
    pub verified_at: DateTime<Utc>,
    pub verification_method: String,
    /// `None` for automatic (system) verification, otherwise the admin that verified the referral.
    pub verified_by: Option<String>,
}

impl VerificationDetails {
    pub fn automatic() -> Self {
        Self { verified_at: Utc::now(), verification_method: AUTOMATIC_DOMAIN_MATCH.to_string(), verified_by: None }
    }

    pub fn manual<S: Into<String>>(admin: S) -> Self {
        Self {
            verified_at: Utc::now(),
            verification_method: MANUAL_REVIEW.to_string(),
            verified_by: Some(admin.into()),
        }
    }

    pub fn is_automatic(&self) -> bool {
        self.verified_by.is_none()
    }
}

//--------------------------------------      Referral         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    pub professional_id: i64,
    pub candidate_id: i64,
    pub referral_type: ReferralType,
    pub status: ReferralStatus,
    pub email_details: Option<EmailDetails>,
    pub email_domain_verified: bool,
    pub verification_details: Option<VerificationDetails>,
    pub rejection_reason: Option<String>,
    pub reward_amount: Option<Cents>,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub payout_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn is_rewarded(&self) -> bool {
        self.status == ReferralStatus::Rewarded
    }

    /// A verified referral that has not been paid. This is a stable resting state, e.g. when the professional was not
    /// eligible at verification time, or the payout failed.
    pub fn is_verified_unpaid(&self) -> bool {
        self.status == ReferralStatus::Verified && self.payment_status != PaymentStatus::Paid
    }

    pub fn domains_match(&self) -> bool {
        self.email_details.as_ref().map(EmailDetails::domains_match).unwrap_or(false)
    }

    /// The idempotency key used for the payout transfer of this referral. Deterministic, so that any number of retries
    /// collapse into a single transfer at the payment provider.
    pub fn idempotency_key(&self) -> String {
        idempotency_key_for(self.id)
    }
}

pub fn idempotency_key_for(referral_id: i64) -> String {
    format!("referral-{referral_id}")
}

impl Display for Referral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Referral #{} ({}) professional: #{} candidate: #{} status: {} payment: {}",
            self.id,
            self.referral_type,
            self.professional_id,
            self.candidate_id,
            self.status,
            self.payment_status
        )
    }
}

/// The flat table representation of a referral.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReferralRow {
    pub id: i64,
    pub professional_id: i64,
    pub candidate_id: i64,
    pub referral_type: ReferralType,
    pub status: ReferralStatus,
    pub sender_email: Option<String>,
    pub sender_domain: Option<String>,
    pub recipient_email: Option<String>,
    pub recipient_domain: Option<String>,
    pub cc_emails: Option<String>,
    pub subject: Option<String>,
    pub referral_email_id: Option<String>,
    pub email_timestamp: Option<DateTime<Utc>>,
    pub email_domain_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_method: Option<String>,
    pub verified_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub reward_amount: Option<Cents>,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub payout_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReferralRow> for Referral {
    fn from(row: ReferralRow) -> Self {
        let email_details = match (row.sender_email, row.recipient_email, row.referral_email_id) {
            (Some(sender_email), Some(recipient_email), Some(referral_email_id)) => Some(EmailDetails {
                sender_email,
                sender_domain: row.sender_domain.unwrap_or_default(),
                recipient_email,
                recipient_domain: row.recipient_domain.unwrap_or_default(),
                cc_emails: split_cc_list(row.cc_emails.as_deref()),
                subject: row.subject,
                referral_email_id,
                timestamp: row.email_timestamp.unwrap_or(row.created_at),
            }),
            _ => None,
        };
        let verification_details = match (row.verified_at, row.verification_method) {
            (Some(verified_at), Some(verification_method)) => {
                Some(VerificationDetails { verified_at, verification_method, verified_by: row.verified_by })
            },
            _ => None,
        };
        Self {
            id: row.id,
            professional_id: row.professional_id,
            candidate_id: row.candidate_id,
            referral_type: row.referral_type,
            status: row.status,
            email_details,
            email_domain_verified: row.email_domain_verified,
            verification_details,
            rejection_reason: row.rejection_reason,
            reward_amount: row.reward_amount,
            payment_status: row.payment_status,
            payment_id: row.payment_id,
            payout_date: row.payout_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) fn join_cc_list(cc: &[String]) -> String {
    cc.join(",")
}

pub(crate) fn split_cc_list(cc: Option<&str>) -> Vec<String> {
    cc.map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()).unwrap_or_default()
}

//--------------------------------------     NewReferral       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReferral {
    pub professional_id: i64,
    pub candidate_id: i64,
    pub referral_type: ReferralType,
    pub email_details: Option<EmailDetails>,
}

impl NewReferral {
    pub fn new(professional_id: i64, candidate_id: i64, referral_type: ReferralType) -> Self {
        Self { professional_id, candidate_id, referral_type, email_details: None }
    }

    pub fn with_email_details(mut self, details: EmailDetails) -> Self {
        self.referral_type = ReferralType::Email;
        self.email_details = Some(details);
        self
    }
}

//--------------------------------------    RewardRecord       ---------------------------------------------------------
/// The values written by the reward transition. All of them are applied together, or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRecord {
    pub payment_id: String,
    pub amount: Cents,
    pub payout_date: DateTime<Utc>,
}

//--------------------------------------    RewardHistory      ---------------------------------------------------------
/// A professional's reward history, as needed for eligibility decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardHistory {
    pub rewarded_count: u64,
    pub last_payout_date: Option<DateTime<Utc>>,
}

//--------------------------------------    ReferralEvent      ---------------------------------------------------------
/// An entry in the append-only audit trail of inbound events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralEvent {
    pub id: i64,
    pub referral_id: Option<i64>,
    pub event_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReferralEvent {
    pub referral_id: Option<i64>,
    pub event_type: String,
    pub data: serde_json::Value,
}

impl NewReferralEvent {
    pub fn new<S: Into<String>>(event_type: S, data: serde_json::Value) -> Self {
        Self { referral_id: None, event_type: event_type.into(), data }
    }

    pub fn for_referral(mut self, referral_id: Option<i64>) -> Self {
        self.referral_id = referral_id;
        self
    }
}

//--------------------------------------  Professional, Candidate  -----------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Professional {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// The connected payout destination at the payment provider, if the professional has completed onboarding.
    pub payout_account_id: Option<String>,
    pub successful_referrals: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfessional {
    pub email: String,
    pub name: String,
    pub payout_account_id: Option<String>,
}

impl NewProfessional {
    pub fn new<S: Into<String>>(email: S, name: S) -> Self {
        Self { email: email.into(), name: name.into(), payout_account_id: None }
    }

    pub fn with_payout_account<S: Into<String>>(mut self, account_id: S) -> Self {
        self.payout_account_id = Some(account_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub email: String,
    pub name: String,
}

impl NewCandidate {
    pub fn new<S: Into<String>>(email: S, name: S) -> Self {
        Self { email: email.into(), name: name.into() }
    }
}
