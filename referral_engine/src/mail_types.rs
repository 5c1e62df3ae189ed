//! Types for the payloads delivered by the mail provider's event webhook.
//!
//! The provider posts a JSON array of events per call. Inbound-parse events carry the headers and body of an email that
//! was received on the platform mailbox; tracking events report on outbound mail (delivered, opened, bounced, ...).
//! Address fields are loosely typed on the wire, so they are modelled with untagged enums and normalised on access.
use serde::{Deserialize, Serialize};

/// An email address as it may appear in the `from` or `to` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    /// `"Jane Doe <jane@acme.com>"` or `"jane@acme.com"`
    Text(String),
    /// `{"email": "jane@acme.com", "name": "Jane Doe"}`
    Object {
        email: String,
        #[serde(default)]
        name: Option<String>,
    },
    /// Some payloads wrap a single address in a list
    List(Vec<AddressField>),
}

impl AddressField {
    /// The raw address text, before the display name is stripped. Lists yield their first element.
    pub fn raw(&self) -> Option<&str> {
        match self {
            AddressField::Text(s) => Some(s.as_str()),
            AddressField::Object { email, .. } => Some(email.as_str()),
            AddressField::List(list) => list.first().and_then(AddressField::raw),
        }
    }
}

impl From<&str> for AddressField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The CC header: either a comma-separated string, or a list of address fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CcField {
    Text(String),
    List(Vec<AddressField>),
}

impl CcField {
    /// Splits the field into the raw address texts it contains.
    pub fn entries(&self) -> Vec<String> {
        match self {
            CcField::Text(s) => s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            CcField::List(list) => list.iter().filter_map(AddressField::raw).map(String::from).collect(),
        }
    }
}

impl Default for CcField {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for CcField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// An email received on the platform mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEmail {
    pub from: Option<AddressField>,
    pub to: Option<AddressField>,
    #[serde(default)]
    pub cc: Option<CcField>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default, alias = "message_id", alias = "Message-ID")]
    pub message_id: Option<String>,
}

impl InboundEmail {
    pub fn new(from: &str, to: &str, cc: &str) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            cc: Some(cc.into()),
            subject: None,
            text: None,
            html: None,
            message_id: None,
        }
    }

    pub fn with_subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_message_id<S: Into<String>>(mut self, message_id: S) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// A delivery-tracking event for outbound mail. These are recorded in the audit trail and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sg_message_id: Option<String>,
    #[serde(default)]
    pub category: Option<serde_json::Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub asm_group_id: Option<i64>,
}

/// A single entry of a mail-provider webhook call.
///
/// Tracking events are tried first since they are identified by the mandatory `event` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MailEvent {
    Tracking(TrackingEvent),
    Inbound(InboundEmail),
}

impl MailEvent {
    pub fn event_type(&self) -> String {
        match self {
            MailEvent::Tracking(ev) => ev.event.clone(),
            MailEvent::Inbound(_) => "inbound".to_string(),
        }
    }
}

/// Parses the body of a mail webhook call. The provider sends a JSON array, but a single bare event is accepted too.
pub fn parse_mail_events(body: &[u8]) -> Result<Vec<MailEvent>, serde_json::Error> {
    match serde_json::from_slice::<Vec<MailEvent>>(body) {
        Ok(events) => Ok(events),
        Err(e) => serde_json::from_slice::<MailEvent>(body).map(|ev| vec![ev]).map_err(|_| e),
    }
}
