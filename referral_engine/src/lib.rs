//! Referral Engine
//!
//! The referral engine decides whether a professional's referral of a candidate is genuine, whether it is eligible for a
//! reward, and pays the reward out exactly once. It is provider-agnostic: the mail provider, the payment provider and
//! the notification system are all reached through traits.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. Callers should not need to touch
//!    the database directly; the data types it stores are public in [`db_types`].
//! 2. The contracts that backends and external capabilities implement ([`traits`]).
//! 3. The public API ([`mod@rpe_api`]): the referral state machine, queries, eligibility rules and the payout executor.
//! 4. Inbound email parsing ([`helpers`]) for the mail provider's events ([`mail_types`]).
//!
//! The engine also publishes notifications on a simple async hook system ([`events`]), so that other parts of a
//! deployment can react to referral state changes.
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod mail_types;
pub mod rpe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError, DEFAULT_SQLITE_DB_URL};
pub use rpe_api::{
    eligibility::{Eligibility, EligibilityEvaluator},
    errors::{PayoutError, ReferralFlowError},
    payout::{PayoutOutcome, PayoutResult},
    policy::ReferralPolicy,
    referral_api::ReferralApi,
    referral_flow_api::{InboundOutcome, ReferralFlowApi, VerificationOutcome},
};
pub use traits::{NotificationSink, PaymentTransfer, ReferralGatewayDatabase, ReferralManagement};
