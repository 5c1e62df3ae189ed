//! Row-level queries on the `referrals` table.
//!
//! None of these functions are atomic on their own account. Wrap calls in a transaction where atomicity across several
//! statements is needed, and pass `&mut *tx` as the connection argument. State transitions are expressed as single
//! conditional `UPDATE` statements and report whether a row was changed.
use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{
        join_cc_list,
        NewReferral,
        Referral,
        ReferralRow,
        RewardHistory,
        RewardRecord,
        VerificationDetails,
    },
};

/// Inserts the referral, unless it carries an inbound email id that is already stored. Returns the new row id, or
/// `None` if the email id was a duplicate.
pub async fn insert_referral(
    referral: NewReferral,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let details = referral.email_details;
    let id: Option<i64> = sqlx::query_scalar(
        r#"
            INSERT INTO referrals (
                professional_id,
                candidate_id,
                referral_type,
                sender_email,
                sender_domain,
                recipient_email,
                recipient_domain,
                cc_emails,
                subject,
                referral_email_id,
                email_timestamp,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            ON CONFLICT (referral_email_id) DO NOTHING
            RETURNING id;
        "#,
    )
    .bind(referral.professional_id)
    .bind(referral.candidate_id)
    .bind(referral.referral_type)
    .bind(details.as_ref().map(|d| d.sender_email.clone()))
    .bind(details.as_ref().map(|d| d.sender_domain.clone()))
    .bind(details.as_ref().map(|d| d.recipient_email.clone()))
    .bind(details.as_ref().map(|d| d.recipient_domain.clone()))
    .bind(details.as_ref().map(|d| join_cc_list(&d.cc_emails)))
    .bind(details.as_ref().and_then(|d| d.subject.clone()))
    .bind(details.as_ref().map(|d| d.referral_email_id.clone()))
    .bind(details.as_ref().map(|d| d.timestamp))
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_referral(id: i64, conn: &mut SqliteConnection) -> Result<Option<Referral>, SqliteDatabaseError> {
    let row = sqlx::query_as::<_, ReferralRow>("SELECT * FROM referrals WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Referral::from))
}

/// Like [`fetch_referral`], but a missing referral is an error.
pub async fn fetch_existing_referral(id: i64, conn: &mut SqliteConnection) -> Result<Referral, SqliteDatabaseError> {
    fetch_referral(id, conn).await?.ok_or(SqliteDatabaseError::ReferralNotFound(id))
}

pub async fn fetch_referral_by_email_id(
    referral_email_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Referral>, SqliteDatabaseError> {
    let row = sqlx::query_as::<_, ReferralRow>("SELECT * FROM referrals WHERE referral_email_id = $1")
        .bind(referral_email_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Referral::from))
}

pub async fn fetch_referrals_for_professional(
    professional_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Referral>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, ReferralRow>("SELECT * FROM referrals WHERE professional_id = $1 ORDER BY id ASC")
        .bind(professional_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Referral::from).collect())
}

pub async fn fetch_referrals_for_candidate(
    candidate_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Referral>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, ReferralRow>("SELECT * FROM referrals WHERE candidate_id = $1 ORDER BY id ASC")
        .bind(candidate_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Referral::from).collect())
}

pub async fn fetch_unpaid_verified(conn: &mut SqliteConnection) -> Result<Vec<Referral>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, ReferralRow>(
        "SELECT * FROM referrals WHERE status = 'verified' AND payment_status <> 'paid' ORDER BY id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Referral::from).collect())
}

pub async fn fetch_reward_history(
    professional_id: i64,
    conn: &mut SqliteConnection,
) -> Result<RewardHistory, SqliteDatabaseError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE professional_id = $1 AND status = 'rewarded'")
            .bind(professional_id)
            .fetch_one(&mut *conn)
            .await?;
    let last_payout_date: Option<DateTime<Utc>> = sqlx::query_scalar(
        r#"
            SELECT payout_date FROM referrals
            WHERE professional_id = $1 AND status = 'rewarded'
            ORDER BY payout_date DESC
            LIMIT 1
        "#,
    )
    .bind(professional_id)
    .fetch_optional(conn)
    .await?;
    let rewarded_count = u64::try_from(count).unwrap_or_default();
    Ok(RewardHistory { rewarded_count, last_payout_date })
}

/// `pending -> verified`. Returns true if the row was changed.
pub async fn mark_verified(
    id: i64,
    details: &VerificationDetails,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE referrals SET
                status = 'verified',
                email_domain_verified = 1,
                verified_at = $1,
                verification_method = $2,
                verified_by = $3,
                updated_at = $1
            WHERE id = $4 AND status = 'pending'
        "#,
    )
    .bind(details.verified_at)
    .bind(&details.verification_method)
    .bind(&details.verified_by)
    .bind(id)
    .execute(conn)
    .await?;
    trace!("🗃️ mark_verified on referral #{id} changed {} rows", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

/// Moves `payment_status` to `processing` if the referral is verified and unpaid, and the professional's payout limits
/// still allow it:
/// * the professional's other referrals in `processing` or `paid` are fewer than `max_rewards` (zero disables the cap),
/// * if `cooldown_start` is given, none of the professional's other referrals is `processing` or was paid after it.
pub async fn claim_payout(
    id: i64,
    max_rewards: i64,
    cooldown_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE referrals SET payment_status = 'processing', updated_at = $1
            WHERE id = $2
              AND status = 'verified'
              AND payment_status IN ('pending', 'processing', 'failed')
              AND (
                $3 = 0 OR (
                    SELECT COUNT(*) FROM referrals AS other
                    WHERE other.professional_id = referrals.professional_id
                      AND other.id <> referrals.id
                      AND other.payment_status IN ('processing', 'paid')
                ) < $3
              )
              AND (
                $4 IS NULL OR NOT EXISTS (
                    SELECT 1 FROM referrals AS other
                    WHERE other.professional_id = referrals.professional_id
                      AND other.id <> referrals.id
                      AND (
                        other.payment_status = 'processing'
                        OR (other.payment_status = 'paid' AND other.payout_date > $4)
                      )
                )
              )
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(max_rewards)
    .bind(cooldown_start)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// The payouts that count against a claim on referral `id`: the number of the professional's other referrals that are
/// `processing` or `paid`, whether any of them is `processing`, and the most recent payout date among them.
pub async fn fetch_claim_blockers(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<(i64, bool, Option<DateTime<Utc>>), SqliteDatabaseError> {
    let (count, in_flight): (i64, i64) = sqlx::query_as(
        r#"
            SELECT COUNT(*), COALESCE(SUM(other.payment_status = 'processing'), 0)
            FROM referrals AS other
            JOIN referrals AS this ON this.professional_id = other.professional_id
            WHERE this.id = $1 AND other.id <> this.id AND other.payment_status IN ('processing', 'paid')
        "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    let last_payout: Option<DateTime<Utc>> = sqlx::query_scalar(
        r#"
            SELECT other.payout_date FROM referrals AS other
            JOIN referrals AS this ON this.professional_id = other.professional_id
            WHERE this.id = $1 AND other.id <> this.id AND other.payment_status = 'paid'
            ORDER BY other.payout_date DESC
            LIMIT 1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .flatten();
    Ok((count, in_flight > 0, last_payout))
}

pub async fn release_payout_claim(
    id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE referrals SET payment_status = 'pending', updated_at = $1
            WHERE id = $2 AND status = 'verified' AND payment_status = 'processing'
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// `verified -> rewarded`. All four reward fields and the reward amount are written in one statement.
pub async fn mark_rewarded(
    id: i64,
    reward: &RewardRecord,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE referrals SET
                status = 'rewarded',
                payment_status = 'paid',
                payment_id = $1,
                payout_date = $2,
                reward_amount = $3,
                updated_at = $2
            WHERE id = $4 AND status = 'verified'
        "#,
    )
    .bind(&reward.payment_id)
    .bind(reward.payout_date)
    .bind(reward.amount)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// `pending|verified -> rejected`, unless a payout is in flight.
pub async fn mark_rejected(
    id: i64,
    reason: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE referrals SET
                status = 'rejected',
                email_domain_verified = 0,
                rejection_reason = $1,
                updated_at = $2
            WHERE id = $3 AND status IN ('pending', 'verified') AND payment_status <> 'processing'
        "#,
    )
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
