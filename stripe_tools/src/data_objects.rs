use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The parameters of `POST /v1/transfers`. Stripe takes these as a form body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTransfer {
    /// Minor units of `currency`
    pub amount: i64,
    pub currency: String,
    /// The connected account id (`acct_...`)
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_group: Option<String>,
}

impl NewTransfer {
    pub fn new<S: Into<String>>(amount: i64, currency: S, destination: S) -> Self {
        Self {
            amount,
            currency: currency.into().to_lowercase(),
            destination: destination.into(),
            description: None,
            transfer_group: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_transfer_group<S: Into<String>>(mut self, group: S) -> Self {
        self.transfer_group = Some(group.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub destination: Option<String>,
    /// Unix timestamp
    pub created: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reversed: bool,
}

impl Transfer {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StripeErrorBody {
    /// A one-line summary of Stripe's error payload. Falls back to the raw body if it is not an error object.
    pub fn summarize(raw: &str) -> String {
        match serde_json::from_str::<StripeErrorBody>(raw) {
            Ok(body) => {
                let e = body.error;
                let kind = e.error_type.unwrap_or_else(|| "unknown_error".to_string());
                let code = e.code.map(|c| format!(" ({c})")).unwrap_or_default();
                let message = e.message.unwrap_or_default();
                format!("{kind}{code}: {message}")
            },
            Err(_) => raw.to_string(),
        }
    }
}
