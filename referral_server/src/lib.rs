//! # Referral payout server
//! The HTTP front end of the referral engine. It is responsible for:
//! * Receiving signed webhook calls from the mail provider, and handing referral emails to the referral state machine.
//! * Answering the meeting provider's webhook URL validation challenge.
//! * The admin API, used to report, verify, reject and pay out referrals.
//! * Paying rewards through Stripe Connect.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/mail`, `/webhook/meeting`: Provider webhooks. Calls with an invalid signature get a 401.
//! * `/api/referrals/...`: The admin API. Requires the `X-Admin-Id` and `X-Admin-Key` headers.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod signatures;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
