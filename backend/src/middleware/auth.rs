use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    repositories::{session as session_repo, user as user_repo},
    state::AppState,
    utils::cookies::{extract_cookie_value, SESSION_COOKIE_NAME},
};

/// Requires a fully authenticated session: a valid cookie, a live session
/// row, and no outstanding one-time code.
pub async fn auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate_request(state, request, next, false).await
}

/// Same as [`auth`] but accepts sessions that still owe a one-time code;
/// used for the code endpoints themselves and for logout.
pub async fn auth_allow_pending(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate_request(state, request, next, true).await
}

async fn authenticate_request(
    state: AppState,
    mut request: Request,
    next: Next,
    allow_pending: bool,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, SESSION_COOKIE_NAME))
        .ok_or_else(unauthorized)?;

    // Reading the session also slides its expiry. A store failure is
    // treated as "signed out", never as "signed in".
    let session = match session_repo::get_session(&state.pool, &token, state.config.session_idle())
        .await
    {
        Ok(Some(session)) => session,
        Ok(None) => return Err(unauthorized()),
        Err(err) => {
            tracing::warn!(error = ?err, "Session lookup failed, treating request as signed out");
            return Err(unauthorized());
        }
    };

    if session.pending_mfa && !allow_pending {
        return Err(AppError::Unauthorized("Verification code required".into()));
    }

    let user = match user_repo::find_user_by_id(&state.pool, session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Account deleted underneath a live session; drop the session.
            let _ = session_repo::destroy_session(&state.pool, &token).await;
            return Err(unauthorized());
        }
        Err(err) => {
            tracing::warn!(error = ?err, "User lookup failed, treating request as signed out");
            return Err(unauthorized());
        }
    };

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Authentication required".into())
}
