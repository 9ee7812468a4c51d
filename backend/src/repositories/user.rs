use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{User, UserRole};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, mfa_enabled, \
     security_question, security_answer_hash, oauth_provider, oauth_subject, \
     created_at, updated_at";

pub async fn insert_user(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users
            (id, email, password_hash, full_name, role, mfa_enabled,
             security_question, security_answer_hash, oauth_provider, oauth_subject,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.role.as_str())
    .bind(user.mfa_enabled)
    .bind(&user.security_question)
    .bind(&user.security_answer_hash)
    .bind(&user.oauth_provider)
    .bind(&user.oauth_subject)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_mfa_enabled(
    pool: &PgPool,
    user_id: Uuid,
    enabled: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET mfa_enabled = $1, updated_at = $2 WHERE id = $3")
        .bind(enabled)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await
        .map(|_| ())
}

pub async fn update_user_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await
        .map(|_| ())
}

/// Finds or creates the account matching an identity asserted by an OAuth
/// provider. Returning users get their name refreshed; the account is keyed
/// on (provider, subject), never on the email alone.
pub async fn upsert_oauth_user(
    pool: &PgPool,
    provider: &str,
    subject: &str,
    email: &str,
    full_name: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users
            (id, email, full_name, role, oauth_provider, oauth_subject, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (oauth_provider, oauth_subject)
        DO UPDATE SET full_name = EXCLUDED.full_name, updated_at = EXCLUDED.updated_at
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .bind(UserRole::Customer.as_str())
    .bind(provider)
    .bind(subject)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn list_users(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
