use crate::auth::AuthContext;
use crate::domains::permission::codec::PermissionVector;
use crate::domains::permission::editor::{PermissionEditor, PermissionWriter};
use crate::domains::permission::navigation::{build_navigation, NavigationView};
use crate::domains::permission::role::{resolve_role, ReportRelationship, RoleResolution};
use crate::domains::permission::visibility::{NavigationState, VisibilityEvaluator};
use crate::domains::report::repository::{ReportMembershipRepository, ReportRepository};
use crate::domains::report::types::{Report, UpdateReportPermissions};
use crate::errors::{ServiceError, ServiceResult};
use crate::types::ReportCapability;
use crate::validation::Validate;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Trait defining report permission operations
#[async_trait]
pub trait ReportPermissionService: Send + Sync {
    async fn resolve_role(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<RoleResolution>;

    /// Navigation view for the caller, with `current` repaired when it is no longer visible
    async fn get_navigation(
        &self,
        report_id: Uuid,
        current: Option<NavigationState>,
        auth: &AuthContext,
    ) -> ServiceResult<NavigationView>;

    async fn open_editor(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<PermissionEditor>;

    async fn save_permissions(&self, report_id: Uuid, value: i64, auth: &AuthContext) -> ServiceResult<Report>;

    /// Section ids currently granted to external advisors
    async fn get_granted_sections(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<Vec<&'static str>>;
}

/// Implementation of the report permission service
#[derive(Clone)]
pub struct ReportPermissionServiceImpl {
    report_repo: Arc<dyn ReportRepository>,
    membership_repo: Arc<dyn ReportMembershipRepository>,
}

impl ReportPermissionServiceImpl {
    pub fn new(
        report_repo: Arc<dyn ReportRepository>,
        membership_repo: Arc<dyn ReportMembershipRepository>,
    ) -> Self {
        Self { report_repo, membership_repo }
    }

    async fn resolve_for(&self, report: &Report, auth: &AuthContext) -> ServiceResult<RoleResolution> {
        let membership = self.membership_repo.find_relationship(report.id, auth.user_id).await?;
        Ok(resolve_role(ReportRelationship {
            is_admin: auth.is_admin(),
            is_designated_manager: report.is_managed_by(&auth.user_id),
            membership,
        }))
    }

    /// Evaluator for the caller. Unresolved users and undecodable fields see nothing.
    fn evaluator_for(report: &Report, resolution: &RoleResolution) -> VisibilityEvaluator {
        let vector = if resolution.resolved {
            report.permission_vector().unwrap_or_else(|e| {
                log::warn!("Report {} has an unreadable permission field: {}", report.id, e);
                PermissionVector::none()
            })
        } else {
            PermissionVector::none()
        };
        VisibilityEvaluator::new(resolution.role, vector, report.read_only)
    }

    /// Load the report and make sure the caller may manage its permissions
    async fn authorize_manage(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<Report> {
        let report = self.report_repo.find_by_id(report_id).await?;
        let resolution = self.resolve_for(&report, auth).await?;
        auth.authorize_report(resolution.role, ReportCapability::ManagePermissions)?;
        Ok(report)
    }
}

#[async_trait]
impl ReportPermissionService for ReportPermissionServiceImpl {
    async fn resolve_role(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<RoleResolution> {
        let report = self.report_repo.find_by_id(report_id).await?;
        self.resolve_for(&report, auth).await
    }

    async fn get_navigation(
        &self,
        report_id: Uuid,
        current: Option<NavigationState>,
        auth: &AuthContext,
    ) -> ServiceResult<NavigationView> {
        let report = self.report_repo.find_by_id(report_id).await?;
        let resolution = self.resolve_for(&report, auth).await?;
        let evaluator = Self::evaluator_for(&report, &resolution);
        Ok(build_navigation(&evaluator, current.as_ref()))
    }

    async fn open_editor(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<PermissionEditor> {
        let report = self.authorize_manage(report_id, auth).await?;
        Ok(PermissionEditor::from_value(report.id, report.permissions)?)
    }

    async fn save_permissions(&self, report_id: Uuid, value: i64, auth: &AuthContext) -> ServiceResult<Report> {
        auth.check_offline_feature("save_permissions", false)?;
        let update = UpdateReportPermissions { permissions: value };
        update.validate()?;

        self.authorize_manage(report_id, auth).await?;
        let report = self
            .report_repo
            .update_permissions(report_id, update.permissions, auth)
            .await?;
        log::info!("User {} set permissions of report {} to {}", auth.user_id, report_id, report.permissions);
        Ok(report)
    }

    async fn get_granted_sections(&self, report_id: Uuid, auth: &AuthContext) -> ServiceResult<Vec<&'static str>> {
        let report = self.report_repo.find_by_id(report_id).await?;
        let resolution = self.resolve_for(&report, auth).await?;
        if !resolution.resolved {
            return Err(ServiceError::PermissionDenied(format!(
                "User {} has no relationship to report {}",
                auth.user_id, report_id
            )));
        }
        Ok(report.permission_vector()?.granted_section_ids())
    }
}

#[async_trait]
impl PermissionWriter for ReportPermissionServiceImpl {
    async fn write_permissions(&self, report_id: Uuid, value: i64, auth: &AuthContext) -> ServiceResult<i64> {
        let report = self.save_permissions(report_id, value, auth).await?;
        Ok(report.permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::permission::registry::Part;
    use crate::domains::permission::visibility::Resolution;
    use crate::domains::report::repository::{test_pool, SqliteReportMembershipRepository, SqliteReportRepository};
    use crate::domains::report::types::NewReport;
    use crate::errors::DomainError;
    use crate::types::{ReportRole, UserRole};

    struct Fixture {
        service: ReportPermissionServiceImpl,
        members: Arc<SqliteReportMembershipRepository>,
        report: Report,
        manager: AuthContext,
    }

    fn member_auth() -> AuthContext {
        AuthContext::new(Uuid::new_v4(), UserRole::Member, "test-device".to_string(), false)
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let reports = Arc::new(SqliteReportRepository::new(pool.clone()));
        let members = Arc::new(SqliteReportMembershipRepository::new(pool));
        let manager = member_auth();
        let report = reports
            .create(
                NewReport { name: "FY2026".to_string(), manager_id: Some(manager.user_id), read_only: false },
                &AuthContext::internal_system_context(),
            )
            .await
            .unwrap();
        let service = ReportPermissionServiceImpl::new(reports, members.clone());
        Fixture { service, members, report, manager }
    }

    async fn advisor(fixture: &Fixture) -> AuthContext {
        let auth = member_auth();
        fixture
            .members
            .add_member(fixture.report.id, auth.user_id, ReportRole::ExternalAdvisor)
            .await
            .unwrap();
        auth
    }

    #[tokio::test]
    async fn test_role_resolution() {
        let f = fixture().await;
        let resolution = f.service.resolve_role(f.report.id, &f.manager).await.unwrap();
        assert_eq!(resolution.role, ReportRole::Manager);

        let admin = AuthContext::new(Uuid::new_v4(), UserRole::Admin, "d".to_string(), false);
        assert_eq!(f.service.resolve_role(f.report.id, &admin).await.unwrap().role, ReportRole::Manager);

        let stranger = member_auth();
        let resolution = f.service.resolve_role(f.report.id, &stranger).await.unwrap();
        assert!(!resolution.resolved);
        assert!(resolution.permission_gated);
    }

    #[tokio::test]
    async fn test_advisor_without_grants_sees_nothing() {
        let f = fixture().await;
        let auth = advisor(&f).await;
        let view = f.service.get_navigation(f.report.id, None, &auth).await.unwrap();
        assert_eq!(view.active, Resolution::NoAccessibleContent);
        assert!(view.parts.iter().all(|p| !p.visible));
    }

    #[tokio::test]
    async fn test_saved_grants_drive_advisor_navigation() {
        let f = fixture().await;
        let auth = advisor(&f).await;

        // cover
        f.service.save_permissions(f.report.id, 1 << 21, &f.manager).await.unwrap();
        let view = f
            .service
            .get_navigation(f.report.id, Some(NavigationState::new(Part::Understanding, "mission")), &auth)
            .await
            .unwrap();
        assert_eq!(view.active, Resolution::Selected(NavigationState::new(Part::Communication, "cover")));
        assert_eq!(f.service.get_granted_sections(f.report.id, &auth).await.unwrap(), vec!["cover"]);
    }

    #[tokio::test]
    async fn test_stranger_gets_restricted_view() {
        let f = fixture().await;
        f.service.save_permissions(f.report.id, 1 << 21, &f.manager).await.unwrap();

        let stranger = member_auth();
        let view = f.service.get_navigation(f.report.id, None, &stranger).await.unwrap();
        assert_eq!(view.active, Resolution::NoAccessibleContent);
        assert!(matches!(
            f.service.get_granted_sections(f.report.id, &stranger).await,
            Err(ServiceError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_only_managers_edit() {
        let f = fixture().await;
        let consultant = member_auth();
        f.members.add_member(f.report.id, consultant.user_id, ReportRole::Consultant).await.unwrap();
        let advisor = advisor(&f).await;

        for auth in [&consultant, &advisor] {
            assert!(matches!(
                f.service.open_editor(f.report.id, auth).await,
                Err(ServiceError::PermissionDenied(_))
            ));
            assert!(matches!(
                f.service.save_permissions(f.report.id, 1, auth).await,
                Err(ServiceError::PermissionDenied(_))
            ));
        }
        assert!(f.service.open_editor(f.report.id, &f.manager).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_rejects_bad_values_and_offline_mode() {
        let f = fixture().await;
        assert!(matches!(
            f.service.save_permissions(f.report.id, 1 << 31, &f.manager).await,
            Err(ServiceError::Domain(DomainError::InvalidPermissionValue(_)))
        ));

        let mut offline = f.manager.clone();
        offline.offline_mode = true;
        assert!(matches!(
            f.service.save_permissions(f.report.id, 1, &offline).await,
            Err(ServiceError::OfflineFeatureUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_editor_round_trip_through_service() {
        let f = fixture().await;
        let mut editor = f.service.open_editor(f.report.id, &f.manager).await.unwrap();
        editor.toggle_part(Part::Understanding);
        editor.toggle_section("cover").unwrap();

        let stored = editor.save(&f.service, &f.manager).await.unwrap();
        assert_eq!(stored, 0b11111 | (1 << 21));

        let reopened = f.service.open_editor(f.report.id, &f.manager).await.unwrap();
        assert_eq!(reopened.encoded(), stored);
    }

    #[tokio::test]
    async fn test_failed_editor_save_restores_stored_value() {
        let f = fixture().await;
        f.service.save_permissions(f.report.id, 1, &f.manager).await.unwrap();
        let mut editor = f.service.open_editor(f.report.id, &f.manager).await.unwrap();
        editor.toggle_part(Part::Communication);

        let mut offline = f.manager.clone();
        offline.offline_mode = true;
        assert!(editor.save(&f.service, &offline).await.is_err());
        assert_eq!(editor.encoded(), 1);

        let reopened = f.service.open_editor(f.report.id, &f.manager).await.unwrap();
        assert_eq!(reopened.encoded(), 1);
    }
}
