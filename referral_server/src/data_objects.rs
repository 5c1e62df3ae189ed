use std::fmt::Display;

use referral_engine::{db_types::ReferralType, InboundOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReferralRequest {
    pub professional_id: i64,
    pub candidate_email: String,
    #[serde(default = "default_referral_type")]
    pub referral_type: ReferralType,
}

fn default_referral_type() -> ReferralType {
    ReferralType::Other
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// The acknowledgement for a mail webhook call, with what became of each event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailWebhookResponse {
    pub success: bool,
    pub outcomes: Vec<InboundOutcome>,
}

/// A meeting-provider webhook event. Only the URL-validation challenge is acted upon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingEvent {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub event_ts: Option<i64>,
}

pub const URL_VALIDATION_EVENT: &str = "endpoint.url_validation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlValidationPayload {
    pub plain_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlValidationResponse {
    pub plain_token: String,
    pub encrypted_token: String,
}
