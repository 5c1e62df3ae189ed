//! Stripe Connect payouts.
//!
//! Rewards are paid as Stripe transfers from the platform balance to the professional's connected account. The
//! referral's idempotency key is passed through as Stripe's `Idempotency-Key`, which is what makes retried payouts safe.
use log::*;
use referral_engine::traits::{PaymentTransfer, TransferError, TransferReceipt, TransferRequest};
use stripe_tools::{NewTransfer, StripeApi, StripeApiError, StripeConfig};

#[derive(Clone)]
pub struct StripePayouts {
    api: StripeApi,
}

impl StripePayouts {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        if config.secret_key.is_empty() {
            warn!("💸️ No Stripe secret key is configured. Every payout will be rejected.");
        }
        let api = StripeApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentTransfer for StripePayouts {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, TransferError> {
        let transfer = NewTransfer::new(request.amount, request.currency.as_str(), request.destination.as_str())
            .with_description(request.description)
            .with_transfer_group(request.idempotency_key.as_str());
        match self.api.create_transfer(&transfer, &request.idempotency_key).await {
            Ok(t) => {
                debug!("💸️ Stripe transfer {} created for {}", t.id, request.idempotency_key);
                Ok(TransferReceipt::new(t.id))
            },
            Err(e) => {
                warn!("💸️ Stripe transfer for {} failed. {e}", request.idempotency_key);
                Err(transfer_error(e))
            },
        }
    }
}

fn transfer_error(e: StripeApiError) -> TransferError {
    match e {
        StripeApiError::JsonError(msg) => TransferError::InvalidResponse(msg),
        e if e.is_retryable() => TransferError::Unavailable(e.to_string()),
        e => TransferError::Rejected(e.to_string()),
    }
}
