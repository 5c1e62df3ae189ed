use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::NotificationType;

/// A notification for a user (usually the professional that owns a referral), published whenever a referral changes
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: i64,
    pub kind: NotificationType,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(user_id: i64, kind: NotificationType, payload: serde_json::Value) -> Self {
        Self { user_id, kind, payload, timestamp: Utc::now() }
    }
}
