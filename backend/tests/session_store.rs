use chrono::{Duration, Utc};
use shiptrace_backend::{models::user::UserRole, repositories::session as session_repo};

mod support;

macro_rules! require_pool {
    () => {
        match support::try_test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping");
                return;
            }
        }
    };
}

#[tokio::test]
async fn create_and_get_returns_live_session() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let created = session_repo::create_session(
        &pool,
        user.id,
        user.role,
        false,
        Duration::minutes(60),
    )
    .await
    .expect("create session");

    assert_eq!(created.token.len(), 64);
    assert_eq!(created.user_id, user.id);
    assert!(!created.pending_mfa);
    assert!(created.expires_at > Utc::now());

    let fetched = session_repo::get_session(&pool, &created.token, Duration::minutes(60))
        .await
        .expect("get session")
        .expect("session should exist");

    assert_eq!(fetched.token, created.token);
    assert_eq!(fetched.user_id, user.id);
}

#[tokio::test]
async fn get_slides_the_expiry_forward() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let created =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create session");

    // Pretend the session was created a while ago, then read it.
    sqlx::query(
        "UPDATE sessions SET last_accessed_at = $2, expires_at = $3 WHERE token = $1",
    )
    .bind(&created.token)
    .bind(Utc::now() - Duration::minutes(59))
    .bind(Utc::now() + Duration::minutes(1))
    .execute(&pool)
    .await
    .expect("age session");

    let touched = session_repo::get_session(&pool, &created.token, Duration::minutes(60))
        .await
        .expect("get session")
        .expect("session should still be live");

    assert!(touched.expires_at > Utc::now() + Duration::minutes(59));
    assert!(touched.last_accessed_at > Utc::now() - Duration::seconds(5));
    assert!(touched.expires_at >= touched.last_accessed_at + Duration::minutes(60));
}

#[tokio::test]
async fn expired_session_reads_as_missing_and_is_deleted() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let created =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create session");

    sqlx::query("UPDATE sessions SET expires_at = $2 WHERE token = $1")
        .bind(&created.token)
        .bind(Utc::now() - Duration::minutes(1))
        .execute(&pool)
        .await
        .expect("expire session");

    let fetched = session_repo::get_session(&pool, &created.token, Duration::minutes(60))
        .await
        .expect("get session");
    assert!(fetched.is_none());

    // The stale row is gone, not merely flagged.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = $1")
        .bind(&created.token)
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn expired_session_cannot_be_revived_by_concurrent_reads() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let created =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create session");

    sqlx::query("UPDATE sessions SET expires_at = $2 WHERE token = $1")
        .bind(&created.token)
        .bind(Utc::now() - Duration::seconds(1))
        .execute(&pool)
        .await
        .expect("expire session");

    let (a, b) = tokio::join!(
        session_repo::get_session(&pool, &created.token, Duration::minutes(60)),
        session_repo::get_session(&pool, &created.token, Duration::minutes(60)),
    );
    assert!(a.expect("get").is_none());
    assert!(b.expect("get").is_none());
}

#[tokio::test]
async fn destroy_session_is_idempotent() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let created =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create session");

    session_repo::destroy_session(&pool, &created.token)
        .await
        .expect("destroy");
    session_repo::destroy_session(&pool, &created.token)
        .await
        .expect("destroy again");

    let fetched = session_repo::get_session(&pool, &created.token, Duration::minutes(60))
        .await
        .expect("get session");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn destroy_sessions_for_user_signs_out_every_device() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;
    let other = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let s1 = session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
        .await
        .expect("create s1");
    let s2 = session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
        .await
        .expect("create s2");
    let keep =
        session_repo::create_session(&pool, other.id, other.role, false, Duration::minutes(60))
            .await
            .expect("create keep");

    let revoked = session_repo::destroy_sessions_for_user(&pool, user.id)
        .await
        .expect("destroy for user");
    assert_eq!(revoked, 2);

    for token in [&s1.token, &s2.token] {
        assert!(session_repo::get_session(&pool, token, Duration::minutes(60))
            .await
            .expect("get")
            .is_none());
    }
    assert!(session_repo::get_session(&pool, &keep.token, Duration::minutes(60))
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn destroy_sessions_for_user_except_keeps_the_acting_device() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let current =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create current");
    let other =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create other");

    let revoked =
        session_repo::destroy_sessions_for_user_except(&pool, user.id, &current.token)
            .await
            .expect("destroy except");
    assert_eq!(revoked, 1);

    assert!(session_repo::get_session(&pool, &current.token, Duration::minutes(60))
        .await
        .expect("get")
        .is_some());
    assert!(session_repo::get_session(&pool, &other.token, Duration::minutes(60))
        .await
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn cleanup_removes_only_expired_sessions() {
    let pool = require_pool!();
    let user = support::seed_user(&pool, UserRole::Customer, "correct-horse-7").await;

    let live =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create live");
    let dead =
        session_repo::create_session(&pool, user.id, user.role, false, Duration::minutes(60))
            .await
            .expect("create dead");

    sqlx::query("UPDATE sessions SET expires_at = $2 WHERE token = $1")
        .bind(&dead.token)
        .bind(Utc::now() - Duration::minutes(5))
        .execute(&pool)
        .await
        .expect("expire session");

    let removed = session_repo::cleanup_expired_sessions(&pool)
        .await
        .expect("cleanup");
    assert!(removed >= 1);

    assert!(session_repo::get_session(&pool, &live.token, Duration::minutes(60))
        .await
        .expect("get")
        .is_some());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = $1")
        .bind(&dead.token)
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn promote_session_clears_the_pending_flag() {
    let pool = require_pool!();
    let user = support::seed_user_with_mfa(&pool, UserRole::Customer, "correct-horse-7").await;

    let session =
        session_repo::create_session(&pool, user.id, user.role, true, Duration::minutes(60))
            .await
            .expect("create pending session");
    assert!(session.pending_mfa);

    assert!(session_repo::promote_session(&pool, &session.token)
        .await
        .expect("promote"));

    let fetched = session_repo::get_session(&pool, &session.token, Duration::minutes(60))
        .await
        .expect("get")
        .expect("session live");
    assert!(!fetched.pending_mfa);
}
