//! Authorization for the platform
//!
//! Identity is established upstream by the identity gateway, which forwards
//! the caller as `X-User-Id` / `X-User-Role` headers. This module turns that
//! identity into an [`AuthContext`] and checks it against [`AuthPolicy`]s.
//!
//! Three kinds of callers exist:
//! - tourists, who own bookings, reviews, wishlists and conversations
//! - hotel admins, who manage the single hotel whose `admin_id` they are
//! - super admins, who approve hotels and manage the catalog

use crate::core::error::{AuthError, DerlgError, DerlgResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The role of an authenticated user, mirroring `users.user_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tourist,
    /// Hotel administrator
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tourist => "tourist",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DerlgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tourist" => Ok(Role::Tourist),
            "admin" | "hotel_admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(AuthError::InvalidToken {
                message: format!("unknown role '{}'", other),
            }
            .into()),
        }
    }
}

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    /// Authenticated user
    User { user_id: Uuid, role: Role },

    /// Internal callers such as the escrow scheduler
    Service { service_name: String },

    /// No authentication (public access)
    Anonymous,
}

impl AuthContext {
    pub fn user(user_id: Uuid, role: Role) -> Self {
        AuthContext::User { user_id, role }
    }

    pub fn service(name: &str) -> Self {
        AuthContext::Service {
            service_name: name.to_string(),
        }
    }

    /// Get user_id if available
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AuthContext::User { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    pub fn is_hotel_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_service(&self) -> bool {
        matches!(self, AuthContext::Service { .. })
    }

    /// Super admins and internal services bypass tenant checks
    pub fn is_system(&self) -> bool {
        self.is_super_admin() || self.is_service()
    }

    /// The authenticated user id, or 401
    pub fn require_user(&self) -> DerlgResult<Uuid> {
        self.user_id().ok_or_else(|| {
            AuthError::Unauthenticated {
                message: "authentication required".to_string(),
            }
            .into()
        })
    }

    /// Short label for logs
    pub fn actor(&self) -> String {
        match self {
            AuthContext::User { user_id, role } => format!("{}:{}", role, user_id),
            AuthContext::Service { service_name } => format!("service:{}", service_name),
            AuthContext::Anonymous => "anonymous".to_string(),
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<Role>),

    /// Super admin (or an internal service)
    AdminOnly,

    /// Combination of policies (AND)
    And(Vec<AuthPolicy>),

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),

    /// Custom policy function
    Custom(fn(&AuthContext) -> bool),
}

impl AuthPolicy {
    /// Hotel admins and super admins
    pub fn staff() -> Self {
        AuthPolicy::HasRole(vec![Role::Admin, Role::SuperAdmin])
    }

    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,

            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),

            AuthPolicy::HasRole(roles) => context.role().is_some_and(|r| roles.contains(&r)),

            AuthPolicy::AdminOnly => context.is_system(),

            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(context)),

            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),

            AuthPolicy::Custom(f) => f(context),
        }
    }

    /// Like [`check`](Self::check), but yields 401 for anonymous callers
    /// and 403 for authenticated callers that fail the policy.
    pub fn enforce(&self, context: &AuthContext) -> DerlgResult<()> {
        if self.check(context) {
            return Ok(());
        }
        match context {
            AuthContext::Anonymous => Err(AuthError::Unauthenticated {
                message: "authentication required".to_string(),
            }
            .into()),
            _ => Err(AuthError::forbidden("insufficient permissions").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tourist() -> AuthContext {
        AuthContext::user(Uuid::new_v4(), Role::Tourist)
    }

    #[test]
    fn test_policy_check() {
        let ctx = AuthContext::user(Uuid::new_v4(), Role::Admin);

        assert!(AuthPolicy::Authenticated.check(&ctx));
        assert!(AuthPolicy::staff().check(&ctx));
        assert!(!AuthPolicy::AdminOnly.check(&ctx));

        let anon = AuthContext::Anonymous;
        assert!(AuthPolicy::Public.check(&anon));
        assert!(!AuthPolicy::Authenticated.check(&anon));
    }

    #[test]
    fn test_service_counts_as_system() {
        let ctx = AuthContext::service("escrow-scheduler");
        assert!(AuthPolicy::AdminOnly.check(&ctx));
        assert!(ctx.user_id().is_none());
        assert!(ctx.require_user().is_err());
    }

    #[test]
    fn test_policy_check_and_one_fails() {
        let policy = AuthPolicy::And(vec![
            AuthPolicy::Authenticated,
            AuthPolicy::HasRole(vec![Role::SuperAdmin]),
        ]);
        assert!(!policy.check(&tourist()));
    }

    #[test]
    fn test_policy_check_or_and_custom() {
        let policy = AuthPolicy::Or(vec![
            AuthPolicy::AdminOnly,
            AuthPolicy::Custom(|ctx| ctx.has_role(Role::Tourist)),
        ]);
        assert!(policy.check(&tourist()));
        assert!(!policy.check(&AuthContext::Anonymous));
    }

    #[test]
    fn test_enforce_distinguishes_401_and_403() {
        let err = AuthPolicy::AdminOnly
            .enforce(&AuthContext::Anonymous)
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1005");

        let err = AuthPolicy::AdminOnly.enforce(&tourist()).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1006");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }
}
