//! Durable session storage with sliding expiration.
//!
//! Sessions are keyed by their opaque token. Reads go through
//! [`get_session`], which refreshes the expiry in the same statement that
//! checks it, so concurrent reads of a live token can never observe a
//! stale deadline and an expired token can never be revived.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::Session;
use crate::models::user::UserRole;
use crate::utils::security::generate_token;

/// Number of random bytes backing a session token (hex-encoded on the wire).
const SESSION_TOKEN_BYTES: usize = 32;

const SESSION_COLUMNS: &str =
    "token, user_id, role, pending_mfa, created_at, last_accessed_at, expires_at";

pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    role: UserRole,
    pending_mfa: bool,
    idle_timeout: Duration,
) -> Result<Session, sqlx::Error> {
    let token = generate_token(SESSION_TOKEN_BYTES);
    let now = Utc::now();
    let expires_at = now + idle_timeout;

    sqlx::query_as::<_, Session>(&format!(
        r#"
        INSERT INTO sessions (token, user_id, role, pending_mfa, created_at, last_accessed_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $5, $6)
        RETURNING {SESSION_COLUMNS}
        "#,
    ))
    .bind(&token)
    .bind(user_id)
    .bind(role.as_str())
    .bind(pending_mfa)
    .bind(now)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Looks up a session and, when it is still live, touches it: the read and
/// the sliding-expiry extension are one conditional UPDATE. An expired or
/// unknown token yields `None`, and any leftover expired row is removed so
/// it is indistinguishable from a token that never existed.
pub async fn get_session(
    pool: &PgPool,
    token: &str,
    idle_timeout: Duration,
) -> Result<Option<Session>, sqlx::Error> {
    let now = Utc::now();
    let new_expiry = now + idle_timeout;

    let session = sqlx::query_as::<_, Session>(&format!(
        r#"
        UPDATE sessions
        SET last_accessed_at = $2, expires_at = $3
        WHERE token = $1 AND expires_at > $2
        RETURNING {SESSION_COLUMNS}
        "#,
    ))
    .bind(token)
    .bind(now)
    .bind(new_expiry)
    .fetch_optional(pool)
    .await?;

    if session.is_none() {
        sqlx::query("DELETE FROM sessions WHERE token = $1 AND expires_at <= $2")
            .bind(token)
            .bind(now)
            .execute(pool)
            .await?;
    }

    Ok(session)
}

/// Idempotent delete of a single session.
pub async fn destroy_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await
        .map(|_| ())
}

/// Deletes every session belonging to a user (forced logout on all devices).
pub async fn destroy_sessions_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes every session for a user except the one presented, used after a
/// password change so the acting device stays signed in.
pub async fn destroy_sessions_for_user_except(
    pool: &PgPool,
    user_id: Uuid,
    keep_token: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token <> $2")
        .bind(user_id)
        .bind(keep_token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Clears the pending-code flag once the one-time code has been verified.
pub async fn promote_session(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sessions SET pending_mfa = FALSE WHERE token = $1 AND expires_at > $2",
    )
    .bind(token)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes every session whose deadline has passed; run from the periodic
/// maintenance sweep so abandoned sessions do not accumulate.
pub async fn cleanup_expired_sessions(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
