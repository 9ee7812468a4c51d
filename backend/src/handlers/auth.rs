use axum::{
    extract::{Extension, State},
    http::header,
    response::AppendHeaders,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration as StdDuration;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        session::Session,
        user::{
            ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UpdateMfaRequest,
            User, UserResponse, UserRole,
        },
    },
    repositories::{session as session_repo, user as user_repo},
    state::AppState,
    utils::{
        cookies::{build_clear_session_cookie, build_session_cookie},
        password::{hash_password, hash_security_answer, verify_password},
    },
    validation::rules::{validate_full_name, validate_password_strength},
};

pub(crate) type SetCookie = AppendHeaders<[(header::HeaderName, String); 1]>;

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(SetCookie, Json<LoginResponse>), AppError> {
    payload.validate()?;
    validate_full_name(&payload.full_name)
        .map_err(|_| AppError::BadRequest("Full name is required".into()))?;
    validate_password_strength(&payload.password).map_err(|_| {
        AppError::BadRequest(
            "Password must be at least 12 characters and include a letter and a digit".into(),
        )
    })?;
    if payload.security_question.is_some() != payload.security_answer.is_some() {
        return Err(AppError::BadRequest(
            "Security question and answer must be provided together".into(),
        ));
    }

    if user_repo::find_user_by_email(&state.pool, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let mut user = User::new(
        payload.email.trim().to_lowercase(),
        password_hash,
        payload.full_name.trim().to_string(),
        UserRole::Customer,
    );
    if let (Some(question), Some(answer)) = (&payload.security_question, &payload.security_answer)
    {
        user.security_question = Some(question.trim().to_string());
        user.security_answer_hash = Some(hash_security_answer(answer)?);
    }

    match user_repo::insert_user(&state.pool, &user).await {
        Ok(()) => {}
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(err) => return Err(err.into()),
    }

    let session = session_repo::create_session(
        &state.pool,
        user.id,
        user.role,
        false,
        state.config.session_idle(),
    )
    .await?;

    Ok((
        session_cookie_header(&state, &session.token),
        Json(LoginResponse {
            user: user.into(),
            mfa_required: false,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(SetCookie, Json<LoginResponse>), AppError> {
    let user = user_repo::find_user_by_email(&state.pool, &payload.email)
        .await
        .map_err(|err| {
            tracing::warn!(error = ?err, "User lookup failed during login");
            invalid_credentials()
        })?
        .ok_or_else(invalid_credentials)?;

    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(invalid_credentials());
    };

    let matches = verify_password(&payload.password, password_hash)
        .map_err(AppError::InternalServerError)?;
    if !matches {
        return Err(invalid_credentials());
    }

    // A session for an MFA-enabled account starts out unpromoted; the
    // one-time code endpoints finish the sign-in.
    let session = session_repo::create_session(
        &state.pool,
        user.id,
        user.role,
        user.mfa_enabled,
        state.config.session_idle(),
    )
    .await
    .map_err(|err| {
        tracing::warn!(error = ?err, "Session creation failed during login");
        invalid_credentials()
    })?;

    let mfa_required = session.pending_mfa;
    Ok((
        session_cookie_header(&state, &session.token),
        Json(LoginResponse {
            user: user.into(),
            mfa_required,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<(SetCookie, Json<Value>), AppError> {
    session_repo::destroy_session(&state.pool, &session.token).await?;
    state.mfa.discard(session.user_id);

    let cookie = build_clear_session_cookie(state.config.cookie_options());
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({"message": "Logged out"})),
    ))
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    validate_password_strength(&payload.new_password).map_err(|_| {
        AppError::BadRequest(
            "Password must be at least 12 characters and include a letter and a digit".into(),
        )
    })?;
    if payload.new_password == payload.current_password {
        return Err(AppError::BadRequest(
            "New password must differ from current password".into(),
        ));
    }

    let Some(current_hash) = user.password_hash.as_deref() else {
        return Err(AppError::BadRequest(
            "Password sign-in is not enabled for this account".into(),
        ));
    };
    let matches = verify_password(&payload.current_password, current_hash)
        .map_err(AppError::InternalServerError)?;
    if !matches {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    user_repo::update_user_password(&state.pool, user.id, &new_hash).await?;

    // Other devices are signed out; the acting session stays.
    session_repo::destroy_sessions_for_user_except(&state.pool, user.id, &session.token).await?;

    let mailer = state.email.clone();
    let recipient = user.email.clone();
    let full_name = user.full_name.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer
            .send_password_changed_notification(&recipient, &full_name)
            .await
        {
            tracing::warn!(error = ?err, "Failed to dispatch password change notification");
        }
    });

    Ok(Json(json!({"message": "Password updated successfully"})))
}

pub async fn update_mfa(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateMfaRequest>,
) -> Result<Json<Value>, AppError> {
    user_repo::update_mfa_enabled(&state.pool, user.id, payload.enabled).await?;
    if !payload.enabled {
        state.mfa.discard(user.id);
    }

    let message = if payload.enabled {
        "MFA enabled"
    } else {
        "MFA disabled"
    };
    Ok(Json(json!({"message": message})))
}

#[derive(Debug, Serialize, ToSchema)]
/// Response carrying a fresh anti-forgery token.
pub struct CsrfTokenResponse {
    pub csrf_token: String,
    pub expires_in_seconds: u64,
}

pub async fn csrf_token(
    State(state): State<AppState>,
) -> Result<Json<CsrfTokenResponse>, AppError> {
    let token = state.csrf.issue().await.map_err(AppError::InternalServerError)?;
    Ok(Json(CsrfTokenResponse {
        csrf_token: token,
        expires_in_seconds: state.csrf.ttl().num_seconds().max(0) as u64,
    }))
}

pub(crate) fn session_cookie_header(state: &AppState, token: &str) -> SetCookie {
    let max_age = StdDuration::from_secs((state.config.session_idle_minutes.max(0) as u64) * 60);
    let cookie = build_session_cookie(token, max_age, state.config.cookie_options());
    AppendHeaders([(header::SET_COOKIE, cookie)])
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".into())
}
