mod email_parser;

pub use email_parser::{extract_domain, normalize_address, parse_referral_email, ParsedReferralEmail};
