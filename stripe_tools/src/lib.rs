mod api;
mod config;
mod data_objects;
mod error;

pub use api::StripeApi;
pub use config::{StripeConfig, DEFAULT_STRIPE_API_URL};
pub use data_objects::{NewTransfer, StripeErrorBody, StripeErrorDetail, Transfer};
pub use error::StripeApiError;
