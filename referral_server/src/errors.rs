use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use referral_engine::{traits::ReferralStoreError, PayoutError, ReferralFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the referral. {0}")]
    Conflict(String),
    #[error("The payment provider could not complete the payout. {0}")]
    PaymentProviderError(String),
    #[error("Unauthorized. {0}")]
    Unauthorized(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<ReferralStoreError> for ServerError {
    fn from(e: ReferralStoreError) -> Self {
        match e {
            ReferralStoreError::ReferralNotFound(_)
            | ReferralStoreError::ProfessionalNotFound(_)
            | ReferralStoreError::CandidateNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReferralStoreError::AlreadyExists(_) => Self::Conflict(e.to_string()),
            ReferralStoreError::DatabaseError(_) | ReferralStoreError::InconsistentData(_) => {
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<PayoutError> for ServerError {
    fn from(e: PayoutError) -> Self {
        match e {
            PayoutError::StoreError(e) => e.into(),
            e if e.is_provider_failure() => Self::PaymentProviderError(e.to_string()),
            PayoutError::ProfessionalNotFound(_) => Self::NoRecordFound(e.to_string()),
            PayoutError::NotVerified { .. } | PayoutError::NotDomainVerified(_) | PayoutError::MissingPayoutAccount(_) => {
                Self::Conflict(e.to_string())
            },
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ReferralFlowError> for ServerError {
    fn from(e: ReferralFlowError) -> Self {
        match e {
            ReferralFlowError::StoreError(e) => e.into(),
            ReferralFlowError::PayoutError(e) => e.into(),
            ReferralFlowError::ReferralNotFound(_)
            | ReferralFlowError::ProfessionalNotFound(_)
            | ReferralFlowError::CandidateNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReferralFlowError::InvalidTransition { .. } | ReferralFlowError::PayoutInProgress(_) => {
                Self::Conflict(e.to_string())
            },
            ReferralFlowError::MissingRejectionReason => Self::InvalidRequestBody(e.to_string()),
        }
    }
}
