use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach Stripe: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Stripe rejected the request. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl StripeApiError {
    /// Whether the same request could succeed if it is sent again later. Stripe asks clients to retry on rate limits
    /// and server errors, and on connection failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            StripeApiError::RequestError(_) => true,
            StripeApiError::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
