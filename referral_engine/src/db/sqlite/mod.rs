pub mod db;
mod errors;

pub mod parties;
pub mod referral_events;
pub mod referrals;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub const DEFAULT_SQLITE_DB_URL: &str = "sqlite://data/referrals.db";

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    info!("🗃️ Opening database pool at {url} with {max_connections} connections");
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
