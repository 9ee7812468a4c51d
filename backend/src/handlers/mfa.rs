use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{session::Session, user::User},
    repositories::session as session_repo,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
/// Response to a challenge initiation.
pub struct MfaInitiateResponse {
    pub success: bool,
    /// The generated code, echoed only outside production so local clients
    /// can complete the flow without a mailbox.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Payload carrying the submitted one-time code.
pub struct MfaVerifyRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MfaVerifyResponse {
    pub success: bool,
}

/// Issues a one-time code for the signed-in user. The identity comes from
/// the session resolved by the auth middleware; nothing in the request body
/// can pick a different target.
pub async fn initiate(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(session): Extension<Session>,
) -> Result<Json<MfaInitiateResponse>, AppError> {
    if !session.pending_mfa {
        return Err(AppError::BadRequest("No verification pending".into()));
    }

    let code = state.mfa.initiate(user.id);

    let mailer = state.email.clone();
    let recipient = user.email.clone();
    let emailed_code = code.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_mfa_code_email(&recipient, &emailed_code).await {
            tracing::warn!(error = ?err, "Failed to dispatch verification code email");
        }
    });

    let dev_code = (!state.config.production_mode).then_some(code);
    Ok(Json(MfaInitiateResponse {
        success: true,
        dev_code,
    }))
}

/// Verifies the submitted code and promotes the session. Failures do not
/// say whether the code was wrong, expired, or out of attempts.
pub async fn verify(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<MfaVerifyRequest>,
) -> Result<Json<MfaVerifyResponse>, AppError> {
    if !session.pending_mfa {
        return Err(AppError::BadRequest("No verification pending".into()));
    }

    if !state.mfa.verify(session.user_id, &payload.code) {
        return Err(AppError::Unauthorized("Invalid code".into()));
    }

    let promoted = session_repo::promote_session(&state.pool, &session.token).await?;
    if !promoted {
        // The session expired between the code check and the promotion.
        return Err(AppError::Unauthorized("Authentication required".into()));
    }

    Ok(Json(MfaVerifyResponse { success: true }))
}
