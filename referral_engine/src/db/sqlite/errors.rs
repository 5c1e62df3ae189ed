use thiserror::Error;

use crate::traits::ReferralStoreError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Referral #{0} does not exist")]
    ReferralNotFound(i64),
    #[error("Referral #{0} was written, but could not be read back")]
    ReferralDisappeared(i64),
}

impl From<SqliteDatabaseError> for ReferralStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DriverError(e) => ReferralStoreError::from(e),
            SqliteDatabaseError::MigrationError(e) => ReferralStoreError::DatabaseError(e.to_string()),
            SqliteDatabaseError::ReferralNotFound(id) => ReferralStoreError::ReferralNotFound(id),
            SqliteDatabaseError::ReferralDisappeared(id) => {
                ReferralStoreError::InconsistentData(format!("Referral #{id} disappeared after a write"))
            },
        }
    }
}
