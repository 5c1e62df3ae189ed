use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ReferralReceived,
    ReferralVerified,
    ReferralRewarded,
    ReferralRejected,
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::ReferralReceived => write!(f, "referral_received"),
            NotificationType::ReferralVerified => write!(f, "referral_verified"),
            NotificationType::ReferralRewarded => write!(f, "referral_rewarded"),
            NotificationType::ReferralRejected => write!(f, "referral_rejected"),
        }
    }
}

/// A fire-and-forget sink for user notifications. Delivery failures are the sink's problem and are never reported back
/// to the referral pipeline.
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    async fn notify(&self, user_id: i64, kind: NotificationType, payload: serde_json::Value);
}
