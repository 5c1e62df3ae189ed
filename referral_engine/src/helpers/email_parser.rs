//! # Referral email parser
//!
//! Professionals report a referral by sending an introduction email to the candidate's hiring contact with the
//! platform mailbox in CC. The mail provider forwards that copy to us as an inbound-parse event. This module turns the
//! loosely-typed event into structured evidence.
//!
//! The platform address in CC is the anti-spoofing gate: any email without it is not a referral and is discarded.
//! A sender/recipient domain mismatch is *not* a parse failure; it is reported via `domains_match` and decides whether
//! the referral can be verified automatically.
use std::sync::OnceLock;

use chrono::Utc;
use log::*;
use regex::Regex;

use crate::{
    db_types::EmailDetails,
    mail_types::{AddressField, InboundEmail},
};

const ANGLE_ADDRESS: &str = r"<\s*([^<>\s@]+@[^<>\s@]+)\s*>";
const BARE_ADDRESS: &str = r"^[^<>\s@]+@[^<>\s@]+$";

fn angle_address() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANGLE_ADDRESS).expect("ANGLE_ADDRESS is a valid pattern"))
}

fn bare_address() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BARE_ADDRESS).expect("BARE_ADDRESS is a valid pattern"))
}

/// The result of parsing an inbound email that passed the platform-CC gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReferralEmail {
    pub details: EmailDetails,
    pub domains_match: bool,
    /// The CC'd addresses, excluding the platform mailbox.
    pub other_cc: Vec<String>,
}

/// Normalises `"Name <addr>"` or `"addr"` to a lower-case bare address. Returns `None` if no address can be found.
pub fn normalize_address(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some(caps) = angle_address().captures(raw) {
        return caps.get(1).map(|m| m.as_str().to_lowercase());
    }
    if bare_address().is_match(raw) {
        return Some(raw.to_lowercase());
    }
    None
}

/// Extracts the lower-cased domain from a bare address.
pub fn extract_domain(address: &str) -> Option<String> {
    let (local, domain) = address.rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('>').to_lowercase();
    if local.trim().is_empty() || domain.is_empty() {
        return None;
    }
    Some(domain)
}

fn address_from_field(field: Option<&AddressField>) -> Option<String> {
    field.and_then(AddressField::raw).and_then(normalize_address)
}

fn generated_email_id() -> String {
    format!("generated-{:016x}", rand::random::<u64>())
}

/// Parses an inbound email into referral evidence.
///
/// Returns `None` when the platform mailbox is not among the CC'd addresses, or when the sender or recipient address
/// cannot be parsed. Never fails on other malformed fields.
pub fn parse_referral_email(email: &InboundEmail, platform_email: &str) -> Option<ParsedReferralEmail> {
    let platform = platform_email.trim().to_lowercase();
    let cc_emails = email
        .cc
        .as_ref()
        .map(|cc| cc.entries().iter().filter_map(|e| normalize_address(e)).collect::<Vec<String>>())
        .unwrap_or_default();
    if platform.is_empty() || !cc_emails.iter().any(|cc| *cc == platform) {
        trace!("📧️ Email from {:?} does not CC the platform mailbox. Ignoring it.", email.from);
        return None;
    }
    let Some(sender_email) = address_from_field(email.from.as_ref()) else {
        debug!("📧️ Could not parse the sender address of a platform-CC'd email: {:?}", email.from);
        return None;
    };
    let Some(recipient_email) = address_from_field(email.to.as_ref()) else {
        debug!("📧️ Could not parse the recipient address of a platform-CC'd email: {:?}", email.to);
        return None;
    };
    let sender_domain = extract_domain(&sender_email)?;
    let recipient_domain = extract_domain(&recipient_email)?;
    let other_cc = cc_emails.iter().filter(|cc| **cc != platform).cloned().collect();
    let referral_email_id = email
        .message_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(generated_email_id);
    let domains_match = sender_domain == recipient_domain;
    let details = EmailDetails {
        sender_email,
        sender_domain,
        recipient_email,
        recipient_domain,
        cc_emails,
        subject: email.subject.clone(),
        referral_email_id,
        timestamp: Utc::now(),
    };
    Some(ParsedReferralEmail { details, domains_match, other_cc })
}
