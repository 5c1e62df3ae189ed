use log::*;
use referral_common::Secret;

pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    /// Base URL of the API, without the version path. Tests point this at a local stub.
    pub api_url: String,
    pub secret_key: Secret<String>,
}

impl StripeConfig {
    pub fn new<S: Into<String>>(api_url: S, secret_key: Secret<String>) -> Self {
        Self { api_url: api_url.into(), secret_key }
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("RPS_STRIPE_API_URL").unwrap_or_else(|_| {
            debug!("RPS_STRIPE_API_URL not set, using {DEFAULT_STRIPE_API_URL}");
            DEFAULT_STRIPE_API_URL.to_string()
        });
        let secret_key = Secret::new(std::env::var("RPS_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("RPS_STRIPE_SECRET_KEY not set. Payouts will be rejected by Stripe");
            String::default()
        }));
        Self { api_url, secret_key }
    }
}
