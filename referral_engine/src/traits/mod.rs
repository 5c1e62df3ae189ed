//! # Interface contracts of the referral engine
//!
//! The engine is provider-agnostic. Everything it needs from the outside world is expressed as a trait here:
//!
//! * [`ReferralManagement`] provides read-only queries over referrals, parties and the audit trail.
//! * [`ReferralGatewayDatabase`] defines the atomic state transitions that storage backends must provide.
//! * [`PaymentTransfer`] is the capability to make an idempotent transfer to a connected payout account.
//! * [`NotificationSink`] receives fire-and-forget notifications for users.
mod data_objects;
mod notification_sink;
mod payment_transfer;
mod referral_gateway_database;
mod referral_management;

pub use data_objects::{ClaimResult, InsertReferralResult, TransferReceipt, TransferRequest, TransitionResult};
pub use notification_sink::{NotificationSink, NotificationType};
pub use payment_transfer::{PaymentTransfer, TransferError};
pub use referral_gateway_database::ReferralGatewayDatabase;
pub use referral_management::{ReferralManagement, ReferralStoreError};
