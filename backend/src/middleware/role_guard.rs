//! Per-resource access control.
//!
//! Every protected resource names the roles allowed to reach it in one
//! table. A resource that is not listed here does not exist, so adding a
//! route without deciding who may call it is a compile-time hole, not a
//! silent allow.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::models::user::{User, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Shipment records; shared by every signed-in role.
    Shipments,
    /// Tracking events for a shipment.
    Tracking,
    /// Franchise-level reporting.
    FranchiseReports,
    /// User administration.
    AdminUsers,
}

impl Resource {
    /// The explicit allow-list for each resource.
    pub fn allowed_roles(&self) -> &'static [UserRole] {
        match self {
            Resource::Shipments | Resource::Tracking => &[
                UserRole::Admin,
                UserRole::Franchisee,
                UserRole::Staff,
                UserRole::Customer,
            ],
            Resource::FranchiseReports => &[UserRole::Admin, UserRole::Franchisee],
            Resource::AdminUsers => &[UserRole::Admin],
        }
    }

    pub fn allows(&self, role: UserRole) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Where each role lands after signing in; returned with denials so the
/// client can redirect instead of guessing.
pub fn landing_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "/admin",
        UserRole::Franchisee => "/franchise",
        UserRole::Staff => "/depot",
        UserRole::Customer => "/dashboard",
    }
}

/// Middleware enforcing the allow-list for one resource. Must run after
/// session authentication so the caller's identity is already resolved.
pub async fn require_resource(
    State(resource): State<Resource>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(user) = request.extensions().get::<User>() else {
        return Err(AppError::Unauthorized("Authentication required".into()).into_response());
    };

    if resource.allows(user.role) {
        return Ok(next.run(request).await);
    }

    let body = json!({
        "error": "Forbidden",
        "code": "FORBIDDEN",
        "role": user.role.as_str(),
        "landing": landing_path(user.role),
    });
    Err((StatusCode::FORBIDDEN, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_resources_admit_only_admins() {
        assert!(Resource::AdminUsers.allows(UserRole::Admin));
        assert!(!Resource::AdminUsers.allows(UserRole::Franchisee));
        assert!(!Resource::AdminUsers.allows(UserRole::Staff));
        assert!(!Resource::AdminUsers.allows(UserRole::Customer));
    }

    #[test]
    fn franchise_reports_admit_admin_and_franchisee() {
        assert!(Resource::FranchiseReports.allows(UserRole::Admin));
        assert!(Resource::FranchiseReports.allows(UserRole::Franchisee));
        assert!(!Resource::FranchiseReports.allows(UserRole::Staff));
        assert!(!Resource::FranchiseReports.allows(UserRole::Customer));
    }

    #[test]
    fn shared_resources_admit_every_role() {
        for role in [
            UserRole::Admin,
            UserRole::Franchisee,
            UserRole::Staff,
            UserRole::Customer,
        ] {
            assert!(Resource::Shipments.allows(role));
            assert!(Resource::Tracking.allows(role));
        }
    }

    #[test]
    fn each_role_has_a_landing_path() {
        assert_eq!(landing_path(UserRole::Admin), "/admin");
        assert_eq!(landing_path(UserRole::Franchisee), "/franchise");
        assert_eq!(landing_path(UserRole::Staff), "/depot");
        assert_eq!(landing_path(UserRole::Customer), "/dashboard");
    }
}
