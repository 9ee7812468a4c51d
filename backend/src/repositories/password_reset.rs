//! Storage for single-use, hashed, time-boxed password reset tokens.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::password_reset::PasswordReset;
use crate::utils::security::{generate_token, hash_token};

/// Number of random bytes backing a reset token.
const RESET_TOKEN_BYTES: usize = 32;

/// Issues a fresh reset token for a user and returns the raw token for
/// out-of-band delivery. Any prior unissued tokens are dropped in the same
/// transaction, keeping at most one redeemable token per user.
pub async fn issue_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, sqlx::Error> {
    let token = generate_token(RESET_TOKEN_BYTES);
    let token_hash = hash_token(&token);
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM password_resets WHERE user_id = $1 AND used_at IS NULL")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO password_resets (id, user_id, token_hash, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&token_hash)
    .bind(now + ttl)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(token)
}

pub async fn find_valid_reset_by_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<PasswordReset>, sqlx::Error> {
    let token_hash = hash_token(token);

    sqlx::query_as::<_, PasswordReset>(
        r#"
        SELECT id, user_id, token_hash, expires_at, created_at, used_at
        FROM password_resets
        WHERE token_hash = $1
        AND expires_at > $2
        AND used_at IS NULL
        "#,
    )
    .bind(&token_hash)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

/// Redeems a reset token: flips it to used, stores the new password hash,
/// and destroys every session of the owning user, all in one transaction.
///
/// The used flip is a single conditional UPDATE, so when two redemptions
/// race only one of them gets the row back; the loser sees `None` and
/// nothing else it did is kept.
pub async fn redeem_reset_token(
    pool: &PgPool,
    token: &str,
    new_password_hash: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let token_hash = hash_token(token);
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE password_resets
        SET used_at = $1
        WHERE token_hash = $2 AND used_at IS NULL AND expires_at > $1
        RETURNING user_id
        "#,
    )
    .bind(now)
    .bind(&token_hash)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((user_id,)) = row else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(new_password_hash)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(user_id))
}

pub async fn delete_expired_tokens(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM password_resets WHERE expires_at < $1")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
