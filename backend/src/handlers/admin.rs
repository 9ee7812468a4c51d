use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::UserResponse,
    repositories::{session as session_repo, user as user_repo},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, IntoParams)]
/// Query parameters for the paginated user listing.
pub struct UserListQuery {
    /// Maximum number of records to return (default: 50, max: 500).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of records to skip (default: 0).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let users = user_repo::list_users(&state.pool, limit, offset).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Destroys every session a user holds, forcing a fresh sign-in on all of
/// their devices. Any outstanding one-time code is dropped with them.
pub async fn force_logout(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user = user_repo::find_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let revoked = session_repo::destroy_sessions_for_user(&state.pool, user.id).await?;
    state.mfa.discard(user.id);

    Ok(Json(json!({
        "message": "Sessions revoked",
        "revoked_sessions": revoked,
    })))
}
