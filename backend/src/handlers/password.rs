use axum::{extract::State, Json};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    models::password_reset::{ForgotPasswordPayload, ResetPasswordPayload, SecurityQuestionPayload},
    services::password_reset::{self, SecurityQuestionOutcome},
    state::AppState,
};

/// The acknowledgment is identical whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    password_reset::request_reset(
        &state.pool,
        state.email.clone(),
        state.config.reset_token_ttl(),
        &payload.email,
    )
    .await?;

    Ok(Json(json!({
        "message": "If that account exists, a password reset email is on its way"
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<Value>, AppError> {
    // A malformed token gets the same answer as an unknown one.
    if payload.validate().is_err() {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    password_reset::redeem(&state.pool, &payload.token, &payload.new_password).await?;
    Ok(Json(json!({"message": "Password updated"})))
}

/// Security-question front door for accounts without email access. The
/// response shape does not reveal whether the account exists or what went
/// wrong, except for the deliberate administrator-managed-account branch.
pub async fn security_question_reset(
    State(state): State<AppState>,
    Json(payload): Json<SecurityQuestionPayload>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let outcome = password_reset::issue_via_security_question(
        &state.pool,
        state.config.reset_token_ttl(),
        &payload.email,
        &payload.answer,
    )
    .await?;

    match outcome {
        SecurityQuestionOutcome::Token(token) => Ok(Json(json!({
            "reset_token": token,
            "expires_in_minutes": state.config.reset_token_ttl_minutes,
        }))),
        SecurityQuestionOutcome::RestrictedRole => Err(AppError::Forbidden(
            "Password resets for this account are handled by an administrator".into(),
        )),
        SecurityQuestionOutcome::Rejected => Err(AppError::BadRequest(
            "Unable to verify account details".into(),
        )),
    }
}
