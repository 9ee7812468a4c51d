//! Models that represent user accounts, authentication payloads, and role
//! metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a user account.
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,
    /// Email address used as the login identity.
    pub email: String,
    /// Argon2 hash of the user's password. Absent for accounts created
    /// through an OAuth provider.
    pub password_hash: Option<String>,
    /// Human-readable full name.
    pub full_name: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    /// Whether a one-time code is required to finish signing in.
    pub mfa_enabled: bool,
    /// Security question chosen by the user, if any.
    pub security_question: Option<String>,
    /// Argon2 hash of the normalized security answer.
    pub security_answer_hash: Option<String>,
    /// OAuth provider name for externally created accounts.
    pub oauth_provider: Option<String>,
    /// Stable subject identifier at the OAuth provider.
    pub oauth_subject: Option<String>,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Full administrative access.
    Admin,
    /// Franchise operator with access to franchise-level reporting.
    Franchisee,
    /// Depot staff handling shipments.
    Staff,
    /// Standard customer role.
    #[default]
    Customer,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Franchisee => "franchisee",
            UserRole::Staff => "staff",
            UserRole::Customer => "customer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "franchisee" => Some(UserRole::Franchisee),
            "staff" => Some(UserRole::Staff),
            "customer" | "user" => Some(UserRole::Customer),
            _ => None,
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UserRole::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(&s, &["admin", "franchisee", "staff", "customer"])
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for creating a new account.
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    pub full_name: String,
    /// Optional security question and answer for the question-based reset
    /// flow.
    #[serde(default)]
    pub security_question: Option<String>,
    #[serde(default)]
    pub security_answer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Payload submitted when a user requests to change their password.
pub struct ChangePasswordRequest {
    /// Existing password that will be verified before applying the change.
    pub current_password: String,
    /// Replacement password that will be stored if verification succeeds.
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Payload toggling the one-time-code requirement for the current account.
pub struct UpdateMfaRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Response returned after a successful login or registration.
pub struct LoginResponse {
    pub user: UserResponse,
    /// True when a one-time code must be verified before the session is
    /// accepted on protected routes.
    pub mfa_required: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Public-facing representation of a user returned by the API.
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub mfa_enabled: bool,
}

impl From<User> for UserResponse {
    /// Converts the persistent user model into the API response DTO.
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role.as_str().to_string(),
            mfa_enabled: user.mfa_enabled,
        }
    }
}

impl User {
    /// Constructs a new password-backed user with a freshly generated id.
    pub fn new(email: String, password_hash: String, full_name: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash: Some(password_hash),
            full_name,
            role,
            mfa_enabled: false,
            security_question: None,
            security_answer_hash: None,
            oauth_provider: None,
            oauth_subject: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the user holds the `Admin` role.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// Roles whose password resets are handled by an administrator rather
    /// than the self-service question flow.
    pub fn is_restricted_role(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Franchisee)
    }
}
