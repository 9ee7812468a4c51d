//! Models for password reset functionality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a password reset token.
pub struct PasswordReset {
    /// Unique identifier for the password reset record.
    pub id: Uuid,
    /// User ID associated with this reset token.
    pub user_id: Uuid,
    /// SHA-256 hash of the reset token; the raw token is never stored.
    pub token_hash: String,
    /// Timestamp when this token expires.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Timestamp when this token was redeemed (null if not yet used).
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for requesting a password reset link by email.
pub struct ForgotPasswordPayload {
    /// Email address of the account requesting a reset.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for redeeming a reset token.
pub struct ResetPasswordPayload {
    /// Raw password reset token from the email or question flow.
    #[validate(length(min = 32, message = "Invalid reset token"))]
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for the security-question reset front door.
pub struct SecurityQuestionPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Answer to the account's security question.
    pub answer: String,
}
