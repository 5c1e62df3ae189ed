//! The public API of the referral engine.
//!
//! * [`referral_flow_api::ReferralFlowApi`] is the referral state machine: reports, inbound mail, verification,
//!   payout and rejection.
//! * [`referral_api::ReferralApi`] answers queries.
//! * [`eligibility`] and [`payout`] hold the business rules and the payout executor used by the state machine.
pub mod eligibility;
pub mod errors;
pub mod payout;
pub mod policy;
pub mod referral_api;
pub mod referral_flow_api;
