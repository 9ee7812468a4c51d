//! Password reset issuance and redemption.
//!
//! Two front doors (emailed link, security-question check) share one token
//! model and one redemption path; only the way a token is handed out
//! differs.

use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use crate::repositories::{password_reset as password_reset_repo, user as user_repo};
use crate::utils::email::EmailService;
use crate::utils::password::{hash_password, verify_security_answer};
use crate::validation::rules::validate_password_strength;

#[derive(Debug, Error)]
pub enum ResetError {
    /// The single client-visible failure for redemption: a policy-failing
    /// password, an unknown, expired, or already-used token all look alike.
    #[error("Invalid or expired reset token")]
    Invalid,
    #[error("database error")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Outcome of the security-question front door.
pub enum SecurityQuestionOutcome {
    /// Answer verified; the raw token is returned to the caller directly.
    Token(String),
    /// The account exists but its role is administered centrally; policy
    /// deliberately discloses this so the user contacts an administrator.
    RestrictedRole,
    /// Unknown account, no question on file, or wrong answer; callers must
    /// not distinguish these.
    Rejected,
}

/// Handles a forgot-password request. Always completes without telling the
/// caller whether the account exists; when it does exist, prior unused
/// tokens are invalidated, a fresh one is issued, and the email is
/// dispatched in the background so delivery failures cannot leak into the
/// response either.
pub async fn request_reset(
    pool: &PgPool,
    mailer: Arc<EmailService>,
    ttl: Duration,
    email: &str,
) -> Result<(), ResetError> {
    let Some(user) = user_repo::find_user_by_email(pool, email).await? else {
        tracing::debug!("Password reset requested for unknown account");
        return Ok(());
    };

    let token = password_reset_repo::issue_reset_token(pool, user.id, ttl).await?;

    let recipient = user.email.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_password_reset_email(&recipient, &token).await {
            tracing::warn!(error = ?err, "Failed to dispatch password reset email");
        }
    });

    Ok(())
}

/// Security-question front door: verifies the stored answer and, on
/// success, issues a token through the same machinery as the email flow.
pub async fn issue_via_security_question(
    pool: &PgPool,
    ttl: Duration,
    email: &str,
    answer: &str,
) -> Result<SecurityQuestionOutcome, ResetError> {
    let Some(user) = user_repo::find_user_by_email(pool, email).await? else {
        return Ok(SecurityQuestionOutcome::Rejected);
    };

    if user.is_restricted_role() {
        return Ok(SecurityQuestionOutcome::RestrictedRole);
    }

    let Some(answer_hash) = user.security_answer_hash.as_deref() else {
        return Ok(SecurityQuestionOutcome::Rejected);
    };

    if !verify_security_answer(answer, answer_hash)? {
        return Ok(SecurityQuestionOutcome::Rejected);
    }

    let token = password_reset_repo::issue_reset_token(pool, user.id, ttl).await?;
    Ok(SecurityQuestionOutcome::Token(token))
}

/// Redeems a token and installs the new password. The used flip, the
/// password update, and the destruction of the user's sessions happen in
/// one transaction; a concurrent redemption of the same token has exactly
/// one winner.
pub async fn redeem(pool: &PgPool, token: &str, new_password: &str) -> Result<(), ResetError> {
    if validate_password_strength(new_password).is_err() {
        return Err(ResetError::Invalid);
    }

    let new_hash = hash_password(new_password)?;

    match password_reset_repo::redeem_reset_token(pool, token, &new_hash).await? {
        Some(user_id) => {
            tracing::info!(%user_id, "Password reset redeemed, all sessions invalidated");
            Ok(())
        }
        None => Err(ResetError::Invalid),
    }
}
