//! An in-memory payment provider that behaves like a real one where it matters: transfers with the same idempotency key
//! are only made once, and return the same transfer id.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use referral_engine::traits::{PaymentTransfer, TransferError, TransferReceipt, TransferRequest};

#[derive(Debug, Default)]
struct Ledger {
    transfers: HashMap<String, TransferReceipt>,
    calls: Vec<TransferRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePayments {
    ledger: Arc<Mutex<Ledger>>,
    failures_remaining: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl FakePayments {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` calls fail with [`TransferError::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Every call waits this long before answering, which widens race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every request received, including failed ones and repeats.
    pub fn calls(&self) -> Vec<TransferRequest> {
        self.ledger.lock().map(|l| l.calls.clone()).unwrap_or_default()
    }

    /// The number of distinct transfers actually made.
    pub fn transfer_count(&self) -> usize {
        self.ledger.lock().map(|l| l.transfers.len()).unwrap_or_default()
    }
}

impl PaymentTransfer for FakePayments {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, TransferError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut ledger = self.ledger.lock().map_err(|e| TransferError::Unavailable(e.to_string()))?;
        ledger.calls.push(request.clone());
        let failing = self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(TransferError::Unavailable("the fake provider is down".to_string()));
        }
        let next_id = format!("tr_fake_{:04}", ledger.transfers.len() + 1);
        let receipt = ledger.transfers.entry(request.idempotency_key).or_insert_with(|| TransferReceipt::new(next_id));
        Ok(receipt.clone())
    }
}
