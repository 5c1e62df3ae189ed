//! Webhook signature schemes.
//!
//! Both providers sign their webhook calls with HMAC-SHA256 over a shared secret. They differ only in how the signed
//! message is assembled and how the digest is encoded:
//!
//! * The mail provider signs `timestamp + token + body` and sends the base64-encoded digest in `X-Mail-Signature`,
//!   along with `X-Mail-Timestamp` and `X-Mail-Token`.
//! * The meeting provider signs `"v0:" + timestamp + ":" + body` and sends `"v0=" + hex(digest)` in `x-zm-signature`,
//!   along with `x-zm-request-timestamp`.
//!
//! In both cases the timestamp (Unix seconds) must be within the configured tolerance of the server clock, and the
//! signatures are compared in constant time. Anything missing (secret, headers, body) fails closed.
use std::fmt::Display;

use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const MAIL_SIGNATURE_HEADER: &str = "X-Mail-Signature";
pub const MAIL_TIMESTAMP_HEADER: &str = "X-Mail-Timestamp";
pub const MAIL_TOKEN_HEADER: &str = "X-Mail-Token";
pub const MEETING_SIGNATURE_HEADER: &str = "x-zm-signature";
pub const MEETING_TIMESTAMP_HEADER: &str = "x-zm-request-timestamp";

const MEETING_SIGNATURE_VERSION: &str = "v0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signing secret has been configured for {0} webhooks.")]
    MissingSecret(SignatureScheme),
    #[error("The request is missing the {0} header.")]
    MissingHeader(&'static str),
    #[error("The request body is empty.")]
    MissingBody,
    #[error("The signature timestamp is not a valid Unix timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("The signature timestamp is {skew}s away from the server clock, which exceeds the {tolerance}s tolerance.")]
    StaleTimestamp { skew: u64, tolerance: u64 },
    #[error("The signature does not match the request.")]
    Mismatch,
    #[error("Could not initialise the HMAC. {0}")]
    InvalidKey(String),
}

/// The signature scheme used by a webhook provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Mail,
    Meeting,
}

impl Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureScheme::Mail => write!(f, "mail"),
            SignatureScheme::Meeting => write!(f, "meeting"),
        }
    }
}

/// The signature material a webhook call carries in its headers.
#[derive(Debug, Clone, Default)]
pub struct SignatureHeaders {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    /// Only used by the mail scheme
    pub token: Option<String>,
}

impl SignatureHeaders {
    pub fn new<S: Into<String>>(signature: S, timestamp: S) -> Self {
        Self { signature: Some(signature.into()), timestamp: Some(timestamp.into()), token: None }
    }

    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl SignatureScheme {
    pub fn signature_header(&self) -> &'static str {
        match self {
            SignatureScheme::Mail => MAIL_SIGNATURE_HEADER,
            SignatureScheme::Meeting => MEETING_SIGNATURE_HEADER,
        }
    }

    pub fn timestamp_header(&self) -> &'static str {
        match self {
            SignatureScheme::Mail => MAIL_TIMESTAMP_HEADER,
            SignatureScheme::Meeting => MEETING_TIMESTAMP_HEADER,
        }
    }

    /// The header carrying the per-request token, if the scheme uses one.
    pub fn token_header(&self) -> Option<&'static str> {
        match self {
            SignatureScheme::Mail => Some(MAIL_TOKEN_HEADER),
            SignatureScheme::Meeting => None,
        }
    }

    /// Calculates the signature the provider would send for the given request.
    pub fn sign(&self, secret: &str, timestamp: &str, token: &str, body: &[u8]) -> Result<String, SignatureError> {
        match self {
            SignatureScheme::Mail => {
                let digest = hmac_sha256(secret, &[timestamp.as_bytes(), token.as_bytes(), body])?;
                Ok(base64::encode(digest))
            },
            SignatureScheme::Meeting => {
                let prefix = format!("{MEETING_SIGNATURE_VERSION}:{timestamp}:");
                let digest = hmac_sha256(secret, &[prefix.as_bytes(), body])?;
                Ok(format!("{MEETING_SIGNATURE_VERSION}={}", hex::encode(digest)))
            },
        }
    }

    /// Checks a webhook call against this scheme, using the current time as the reference clock.
    pub fn verify(
        &self,
        secret: &str,
        headers: &SignatureHeaders,
        body: &[u8],
        tolerance_secs: i64,
    ) -> Result<(), SignatureError> {
        self.verify_at(secret, headers, body, tolerance_secs, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        secret: &str,
        headers: &SignatureHeaders,
        body: &[u8],
        tolerance_secs: i64,
        now: i64,
    ) -> Result<(), SignatureError> {
        if secret.trim().is_empty() {
            return Err(SignatureError::MissingSecret(*self));
        }
        let signature = non_empty(headers.signature.as_deref(), self.signature_header())?;
        let timestamp = non_empty(headers.timestamp.as_deref(), self.timestamp_header())?;
        let token = match self.token_header() {
            Some(name) => non_empty(headers.token.as_deref(), name)?,
            None => "",
        };
        if body.is_empty() {
            return Err(SignatureError::MissingBody);
        }
        let ts = timestamp.trim().parse::<i64>().map_err(|_| SignatureError::InvalidTimestamp(timestamp.into()))?;
        // abs_diff cannot overflow, even for a timestamp of i64::MIN
        let skew = now.abs_diff(ts);
        let tolerance = u64::try_from(tolerance_secs).unwrap_or_default();
        if skew > tolerance {
            return Err(SignatureError::StaleTimestamp { skew, tolerance });
        }
        let expected = self.sign(secret, timestamp, token, body)?;
        if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            trace!("🔐️ {self} signature verified");
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// The response token for the meeting provider's endpoint URL validation challenge: `hex(HMAC(secret, plainToken))`.
pub fn url_validation_token(secret: &str, plain_token: &str) -> Result<String, SignatureError> {
    if secret.trim().is_empty() {
        return Err(SignatureError::MissingSecret(SignatureScheme::Meeting));
    }
    let digest = hmac_sha256(secret, &[plain_token.as_bytes()])?;
    Ok(hex::encode(digest))
}

/// Byte-wise comparison that does not short-circuit. Inputs of different lengths are never equal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn hmac_sha256(secret: &str, parts: &[&[u8]]) -> Result<Vec<u8>, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

fn non_empty<'a>(value: Option<&'a str>, header: &'static str) -> Result<&'a str, SignatureError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SignatureError::MissingHeader(header)),
    }
}
