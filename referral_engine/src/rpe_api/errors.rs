use thiserror::Error;

use crate::{
    db_types::ReferralStatus,
    traits::{ReferralStoreError, TransferError},
};

#[derive(Debug, Clone, Error)]
pub enum PayoutError {
    #[error("{0}")]
    StoreError(#[from] ReferralStoreError),
    #[error("Referral #{id} is {status}. Only verified referrals can be paid out")]
    NotVerified { id: i64, status: ReferralStatus },
    #[error("Referral #{0} is verified, but its email domain verification flag is not set")]
    NotDomainVerified(i64),
    #[error("Professional #{0} does not exist")]
    ProfessionalNotFound(i64),
    #[error("Professional #{0} has not connected a payout account")]
    MissingPayoutAccount(i64),
    #[error("The transfer for referral #{referral_id} (professional #{professional_id}) failed. {source}")]
    TransferFailed { referral_id: i64, professional_id: i64, source: TransferError },
    #[error(
        "Transfer {transfer_id} for referral #{referral_id} succeeded, but the referral could not be marked as \
         rewarded. It must be reconciled manually"
    )]
    UnrecordedTransfer { referral_id: i64, transfer_id: String },
    #[error("Referral #{0} is rewarded, but its payout details are incomplete")]
    IncompletePayoutRecord(i64),
}

impl PayoutError {
    /// True if the failure happened at the payment provider, as opposed to a problem with the referral or the store.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, PayoutError::TransferFailed { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReferralFlowError {
    #[error("{0}")]
    StoreError(#[from] ReferralStoreError),
    #[error("{0}")]
    PayoutError(#[from] PayoutError),
    #[error("Referral #{0} does not exist")]
    ReferralNotFound(i64),
    #[error("Professional #{0} does not exist")]
    ProfessionalNotFound(i64),
    #[error("No candidate is registered with the email address {0}")]
    CandidateNotFound(String),
    #[error("Referral #{id} cannot be {action} while it is {status}")]
    InvalidTransition { id: i64, action: &'static str, status: ReferralStatus },
    #[error("Referral #{0} has a payout in progress and cannot be rejected now")]
    PayoutInProgress(i64),
    #[error("A reason must be given when rejecting a referral")]
    MissingRejectionReason,
}
