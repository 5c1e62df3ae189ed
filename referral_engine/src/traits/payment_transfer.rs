use thiserror::Error;

use crate::traits::{TransferReceipt, TransferRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("The payment provider rejected the transfer. {0}")]
    Rejected(String),
    #[error("Could not reach the payment provider. {0}")]
    Unavailable(String),
    #[error("The payment provider returned an unexpected response. {0}")]
    InvalidResponse(String),
}

/// The capability to move money to a professional's connected payout account.
///
/// Implementations must honour the idempotency key: any number of calls with the same key result in at most one
/// transfer, and every call returns the id of that same transfer.
#[allow(async_fn_in_trait)]
pub trait PaymentTransfer {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, TransferError>;
}
