use crate::domains::permission::has_permission::ReportRole;
use serde::Serialize;

/// Outcome of resolving a user's role on a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleResolution {
    pub role: ReportRole,
    /// True only for external advisors
    pub permission_gated: bool,
    /// False when the user had no relationship to the report
    pub resolved: bool,
}

impl RoleResolution {
    fn resolved(role: ReportRole) -> Self {
        Self {
            role,
            permission_gated: role.is_permission_gated(),
            resolved: true,
        }
    }

    /// Maximally restrictive fallback for users with no relationship.
    /// Callers pair it with an all-false permission vector.
    pub fn unresolved() -> Self {
        Self {
            role: ReportRole::ExternalAdvisor,
            permission_gated: true,
            resolved: false,
        }
    }
}

/// Everything known about a user's relationship to one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRelationship {
    pub is_admin: bool,
    pub is_designated_manager: bool,
    /// Membership recorded for the user on this report, if any
    pub membership: Option<ReportRole>,
}

/// Admins and the designated manager always resolve to `Manager`, ahead of
/// any recorded membership.
pub fn resolve_role(relationship: ReportRelationship) -> RoleResolution {
    if relationship.is_admin || relationship.is_designated_manager {
        return RoleResolution::resolved(ReportRole::Manager);
    }
    match relationship.membership {
        Some(role) => RoleResolution::resolved(role),
        None => {
            log::warn!("No relationship to report; falling back to restricted advisor view");
            RoleResolution::unresolved()
        }
    }
}
