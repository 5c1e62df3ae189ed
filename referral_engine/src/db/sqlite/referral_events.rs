//! The append-only audit trail of inbound events.
use chrono::{DateTime, Utc};
use log::*;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewReferralEvent, ReferralEvent},
};

#[derive(Debug, FromRow)]
struct ReferralEventRow {
    id: i64,
    referral_id: Option<i64>,
    event_type: String,
    data: String,
    created_at: DateTime<Utc>,
}

impl From<ReferralEventRow> for ReferralEvent {
    fn from(row: ReferralEventRow) -> Self {
        let data = match serde_json::from_str(&row.data) {
            Ok(v) => v,
            Err(e) => {
                warn!("🗃️ Event #{} has a payload that is not valid JSON. {e}", row.id);
                serde_json::Value::String(row.data)
            },
        };
        Self { id: row.id, referral_id: row.referral_id, event_type: row.event_type, data, created_at: row.created_at }
    }
}

pub async fn insert_event(
    event: NewReferralEvent,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO referral_events (referral_id, event_type, data, created_at) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(event.referral_id)
    .bind(event.event_type)
    .bind(event.data.to_string())
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_events_for_referral(
    referral_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ReferralEvent>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, ReferralEventRow>(
        "SELECT id, referral_id, event_type, data, created_at FROM referral_events WHERE referral_id = $1 ORDER BY id",
    )
    .bind(referral_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(ReferralEvent::from).collect())
}
