use uuid::Uuid;
use crate::types::{UserRole, ReportRole, ReportCapability};
use crate::errors::ServiceError;

/// Represents the authentication context for the current operation.
///
/// Authentication itself happens outside this crate; the context arrives
/// already verified.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The ID of the authenticated user
    pub user_id: Uuid,

    /// Application-wide role of the authenticated user
    pub role: UserRole,

    /// The ID of the current device
    pub device_id: String,

    /// Whether or not the app is currently in offline mode
    pub offline_mode: bool,
}

impl AuthContext {
    /// Create a new authentication context
    pub fn new(user_id: Uuid, role: UserRole, device_id: String, offline_mode: bool) -> Self {
        Self {
            user_id,
            role,
            device_id,
            offline_mode,
        }
    }

    /// Create a new authentication context for internal system operations
    pub fn internal_system_context() -> Self {
        Self {
            user_id: Uuid::nil(),
            role: UserRole::Admin,
            device_id: "system".to_string(),
            offline_mode: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Authorize a capability for the role this user holds on a report
    pub fn authorize_report(&self, report_role: ReportRole, capability: ReportCapability) -> Result<(), ServiceError> {
        if report_role.has_capability(capability) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "Role '{}' does not have capability: {}",
                report_role.as_str(),
                capability.as_str()
            )))
        }
    }

    /// Verify user is an admin
    pub fn authorize_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(
                "This action requires administrator privileges".to_string()
            ))
        }
    }

    /// Check if feature is available offline when in offline mode
    pub fn check_offline_feature(&self, feature_name: &str, available_offline: bool) -> Result<(), ServiceError> {
        if self.offline_mode && !available_offline {
            Err(ServiceError::OfflineFeatureUnavailable(feature_name.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_authorization() {
        let auth = AuthContext::new(Uuid::new_v4(), UserRole::Member, "device".to_string(), false);
        assert!(auth.authorize_report(ReportRole::Manager, ReportCapability::ManagePermissions).is_ok());
        assert!(matches!(
            auth.authorize_report(ReportRole::Consultant, ReportCapability::ManagePermissions),
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(auth.authorize_admin().is_err());
        assert!(AuthContext::internal_system_context().authorize_admin().is_ok());
    }

    #[test]
    fn test_offline_gate() {
        let auth = AuthContext::new(Uuid::new_v4(), UserRole::Member, "device".to_string(), true);
        assert!(auth.check_offline_feature("save_permissions", false).is_err());
        assert!(auth.check_offline_feature("navigation", true).is_ok());
    }
}
