//! Queries on the `professionals` and `candidates` tables.
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Candidate, NewCandidate, NewProfessional, Professional},
};

const PROFESSIONAL_COLUMNS: &str = "id, email, name, payout_account_id, successful_referrals";

pub async fn insert_professional(
    professional: NewProfessional,
    conn: &mut SqliteConnection,
) -> Result<Professional, SqliteDatabaseError> {
    let sql = format!(
        "INSERT INTO professionals (email, name, payout_account_id) VALUES ($1, $2, $3) RETURNING \
         {PROFESSIONAL_COLUMNS}"
    );
    let result = sqlx::query_as::<_, Professional>(&sql)
        .bind(professional.email.trim())
        .bind(professional.name)
        .bind(professional.payout_account_id)
        .fetch_one(conn)
        .await?;
    Ok(result)
}

pub async fn fetch_professional(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Professional>, SqliteDatabaseError> {
    let sql = format!("SELECT {PROFESSIONAL_COLUMNS} FROM professionals WHERE id = $1");
    let result = sqlx::query_as::<_, Professional>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(result)
}

/// The email column is declared `COLLATE NOCASE`, so this lookup is case-insensitive.
pub async fn fetch_professional_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Professional>, SqliteDatabaseError> {
    let sql = format!("SELECT {PROFESSIONAL_COLUMNS} FROM professionals WHERE email = $1");
    let result = sqlx::query_as::<_, Professional>(&sql).bind(email.trim()).fetch_optional(conn).await?;
    Ok(result)
}

/// Adds one to the professional's successful referral counter. Returns true if the professional exists.
pub async fn increment_successful_referrals(
    professional_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE professionals SET successful_referrals = successful_referrals + 1, updated_at = $1 WHERE id = $2",
    )
    .bind(now)
    .bind(professional_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn insert_candidate(
    candidate: NewCandidate,
    conn: &mut SqliteConnection,
) -> Result<Candidate, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Candidate>(
        "INSERT INTO candidates (email, name) VALUES ($1, $2) RETURNING id, email, name",
    )
    .bind(candidate.email.trim())
    .bind(candidate.name)
    .fetch_one(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_candidate(id: i64, conn: &mut SqliteConnection) -> Result<Option<Candidate>, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Candidate>("SELECT id, email, name FROM candidates WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(result)
}

pub async fn fetch_candidate_by_email(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Candidate>, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Candidate>("SELECT id, email, name FROM candidates WHERE email = $1")
        .bind(email.trim())
        .fetch_optional(conn)
        .await?;
    Ok(result)
}
