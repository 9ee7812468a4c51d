//! Models for server-side login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::user::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a login session.
///
/// The row is keyed by the opaque token handed to the client; a session
/// that can no longer be read back is indistinguishable from one that
/// never existed.
pub struct Session {
    /// Opaque random token; also the primary key.
    pub token: String,
    /// User the session belongs to.
    pub user_id: Uuid,
    /// Role captured at session creation.
    pub role: UserRole,
    /// True while a one-time code is still required to finish signing in.
    pub pending_mfa: bool,
    /// Timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent authenticated read.
    pub last_accessed_at: DateTime<Utc>,
    /// Timestamp when the session expires unless touched again.
    pub expires_at: DateTime<Utc>,
}
