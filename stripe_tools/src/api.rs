use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::StripeConfig,
    data_objects::{NewTransfer, StripeErrorBody, Transfer},
    StripeApiError,
};

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Sends a request with a form-encoded body, which is what the Stripe API expects for writes.
    pub async fn form_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending Stripe request: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.form(body);
        }
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Stripe request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let raw = response.text().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message: StripeErrorBody::summarize(&raw) })
        }
    }

    /// Moves funds from the platform balance to a connected account.
    ///
    /// Stripe stores the result of the first request made with a given idempotency key, and replays it for every
    /// repeat. Callers that reuse the key for retries of the same logical transfer can never transfer twice.
    pub async fn create_transfer(
        &self,
        transfer: &NewTransfer,
        idempotency_key: &str,
    ) -> Result<Transfer, StripeApiError> {
        debug!(
            "Creating transfer of {} {} to {} (key {idempotency_key})",
            transfer.amount, transfer.currency, transfer.destination
        );
        let result =
            self.form_query::<Transfer, NewTransfer>(Method::POST, "/transfers", Some(transfer), Some(idempotency_key));
        let transfer = result.await?;
        info!("Transfer {} of {} {} created", transfer.id, transfer.amount, transfer.currency);
        Ok(transfer)
    }

    pub async fn get_transfer(&self, transfer_id: &str) -> Result<Transfer, StripeApiError> {
        let path = format!("/transfers/{transfer_id}");
        self.form_query::<Transfer, ()>(Method::GET, &path, None, None).await
    }
}
