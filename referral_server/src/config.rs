//! Server configuration
//!
//! The server is configured with environment variables, optionally loaded from a `.env` file. Invalid values are
//! logged and replaced with their defaults, so that a typo does not prevent the server from starting. Missing secrets
//! are logged as errors: the server will start, but requests that depend on them will be rejected.
//!
//! | Variable                          | Default                  |
//! |-----------------------------------|--------------------------|
//! | `RPS_HOST`                        | `127.0.0.1`              |
//! | `RPS_PORT`                        | `8370`                   |
//! | `RPS_DATABASE_URL`                | `sqlite://data/referrals.db` |
//! | `RPS_PLATFORM_EMAIL`              | (required)               |
//! | `RPS_REWARD_AMOUNT`               | `5000` (minor units)     |
//! | `RPS_REWARD_CURRENCY`             | `usd`                    |
//! | `RPS_MAX_REWARD_PER_PROFESSIONAL` | `0` (unlimited)          |
//! | `RPS_COOLDOWN_DAYS`               | `0` (no cooldown)        |
//! | `RPS_MAIL_WEBHOOK_SECRET`         | (required)               |
//! | `RPS_MEETING_WEBHOOK_SECRET`      | (required)               |
//! | `RPS_SIGNATURE_TOLERANCE`         | `300` (seconds)          |
//! | `RPS_WEBHOOK_SIGNATURE_CHECKS`    | `true`                   |
//! | `RPS_ADMIN_API_KEY`               | (required)               |
//! | `RPS_STRIPE_SECRET_KEY`           | (required)               |
//! | `RPS_STRIPE_API_URL`              | `https://api.stripe.com` |
//! | `RPS_EVENT_BUFFER_SIZE`           | `50`                     |
use std::{env, fmt::Display, str::FromStr};

use log::*;
use referral_common::{parse_boolean_flag, parse_env_value, Cents, Secret, DEFAULT_CURRENCY_CODE};
use referral_engine::{ReferralPolicy, DEFAULT_SQLITE_DB_URL};
use stripe_tools::StripeConfig;

const DEFAULT_RPS_HOST: &str = "127.0.0.1";
const DEFAULT_RPS_PORT: u16 = 8370;
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 50;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub policy: ReferralPolicy,
    pub webhooks: WebhookConfig,
    /// The shared key that admin API callers must present in the `X-Admin-Key` header
    pub admin_api_key: Secret<String>,
    pub stripe: StripeConfig,
    /// Capacity of the notification event channel
    pub event_buffer_size: usize,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub mail_secret: Secret<String>,
    pub meeting_secret: Secret<String>,
    /// The maximum age (and clock skew) of a signed webhook timestamp, in seconds
    pub tolerance_secs: i64,
    /// If false, webhook signatures are not checked at all. **DANGER**: only for local testing.
    pub signature_checks: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            mail_secret: Secret::default(),
            meeting_secret: Secret::default(),
            tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
            signature_checks: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPS_HOST.to_string(),
            port: DEFAULT_RPS_PORT,
            database_url: DEFAULT_SQLITE_DB_URL.to_string(),
            policy: ReferralPolicy::default(),
            webhooks: WebhookConfig::default(),
            admin_api_key: Secret::default(),
            stripe: StripeConfig::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RPS_HOST").ok().unwrap_or_else(|| DEFAULT_RPS_HOST.into());
        let port = env_or_default("RPS_PORT", DEFAULT_RPS_PORT);
        let database_url = env::var("RPS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ RPS_DATABASE_URL is not set. Using the default, {DEFAULT_SQLITE_DB_URL}.");
            DEFAULT_SQLITE_DB_URL.to_string()
        });
        let policy = policy_from_env();
        let webhooks = WebhookConfig::from_env_or_default();
        let admin_api_key = required_secret("RPS_ADMIN_API_KEY", "the admin API will reject every request");
        let stripe = StripeConfig::new_from_env_or_default();
        let event_buffer_size = env_or_default("RPS_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE).max(1);
        Self { host, port, database_url, policy, webhooks, admin_api_key, stripe, event_buffer_size }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let mail_secret = required_secret("RPS_MAIL_WEBHOOK_SECRET", "mail webhook calls will be rejected");
        let meeting_secret = required_secret("RPS_MEETING_WEBHOOK_SECRET", "meeting webhook calls will be rejected");
        let tolerance_secs = env_or_default("RPS_SIGNATURE_TOLERANCE", DEFAULT_SIGNATURE_TOLERANCE_SECS);
        let tolerance_secs = if tolerance_secs <= 0 {
            warn!("🪛️ RPS_SIGNATURE_TOLERANCE must be positive. Using {DEFAULT_SIGNATURE_TOLERANCE_SECS}s.");
            DEFAULT_SIGNATURE_TOLERANCE_SECS
        } else {
            tolerance_secs
        };
        let signature_checks = parse_boolean_flag(env::var("RPS_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can post events to this server.");
        }
        Self { mail_secret, meeting_secret, tolerance_secs, signature_checks }
    }
}

fn policy_from_env() -> ReferralPolicy {
    let platform_email = env::var("RPS_PLATFORM_EMAIL").ok().map(|s| s.trim().to_lowercase()).unwrap_or_else(|| {
        error!("🪛️ RPS_PLATFORM_EMAIL is not set. No inbound email will be recognised as a referral.");
        String::default()
    });
    let default_policy = ReferralPolicy::default();
    let reward_amount = env_or_default::<Cents>("RPS_REWARD_AMOUNT", default_policy.reward_amount);
    let currency = env::var("RPS_REWARD_CURRENCY")
        .ok()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
    let max_rewards = env_or_default("RPS_MAX_REWARD_PER_PROFESSIONAL", 0u64);
    let cooldown_days = env_or_default("RPS_COOLDOWN_DAYS", 0u64);
    info!(
        "🪛️ Referral policy: {reward_amount} {currency} per referral, max rewards per professional: {}, cooldown: {} \
         days",
        if max_rewards == 0 { "unlimited".to_string() } else { max_rewards.to_string() },
        cooldown_days
    );
    ReferralPolicy { currency, ..default_policy }
        .with_platform_email(platform_email)
        .with_reward_amount(reward_amount)
        .with_max_rewards(max_rewards)
        .with_cooldown_days(cooldown_days)
}

fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match parse_env_value::<T>(env::var(name).ok()) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for {name}. {e} Using the default, {default}, instead.");
            default
        },
    }
}

fn required_secret(name: &str, consequence: &str) -> Secret<String> {
    let value = env::var(name).ok().unwrap_or_default();
    if value.trim().is_empty() {
        error!("🪛️ {name} is not set, so {consequence}.");
    }
    Secret::new(value)
}
