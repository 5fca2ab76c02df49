use crate::auth::AuthContext;
use crate::domains::report::types::{NewReport, Report, ReportMember, ReportMemberRow, ReportRow};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::ReportRole;
use crate::validation::Validate;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};
use uuid::Uuid;

/// Report-update collaborator: reads reports and writes their permission field
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Report>;

    /// Create a report; advisors are granted nothing until edited
    async fn create(&self, report: NewReport, auth: &AuthContext) -> DomainResult<Report>;

    /// Overwrite the permission field in a single write.
    ///
    /// No version check is made: concurrent editors of the same report
    /// resolve as last-write-wins.
    async fn update_permissions(&self, id: Uuid, permissions: i64, auth: &AuthContext) -> DomainResult<Report>;
}

/// Role/membership collaborator
#[async_trait]
pub trait ReportMembershipRepository: Send + Sync {
    /// Recorded relationship of a user to a report, `None` when there is none
    async fn find_relationship(&self, report_id: Uuid, user_id: Uuid) -> DomainResult<Option<ReportRole>>;

    async fn add_member(&self, report_id: Uuid, user_id: Uuid, relationship: ReportRole) -> DomainResult<ReportMember>;

    async fn find_members(&self, report_id: Uuid) -> DomainResult<Vec<ReportMember>>;
}

/// SQLite implementation of ReportRepository
pub struct SqliteReportRepository {
    pool: SqlitePool,
}

impl SqliteReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn entity_name(&self) -> &'static str {
        "reports"
    }
}

#[async_trait]
impl ReportRepository for SqliteReportRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Report> {
        let row = query_as::<_, ReportRow>("SELECT * FROM reports WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Report".to_string(), id))?;

        row.into_entity()
    }

    async fn create(&self, report: NewReport, _auth: &AuthContext) -> DomainResult<Report> {
        report.validate()?;
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO reports (id, name, manager_id, permissions, read_only, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(report.name.trim())
        .bind(report.manager_id.map(|m| m.to_string()))
        .bind(report.read_only as i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        self.find_by_id(id).await
    }

    async fn update_permissions(&self, id: Uuid, permissions: i64, auth: &AuthContext) -> DomainResult<Report> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(|e| DomainError::Database(DbError::from(e)))?;

        let previous: Option<i64> = sqlx::query_scalar("SELECT permissions FROM reports WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;
        let previous = previous.ok_or_else(|| DomainError::EntityNotFound("Report".to_string(), id))?;

        query("UPDATE reports SET permissions = ?, updated_at = ? WHERE id = ?")
            .bind(permissions)
            .bind(&now)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let details = serde_json::json!({ "old": previous, "new": permissions }).to_string();
        query(
            "INSERT INTO audit_logs (id, user_id, action, entity_table, entity_id, details, timestamp, device_id)
             VALUES (?, ?, 'update_permissions', ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(auth.user_id.to_string())
        .bind(self.entity_name())
        .bind(id.to_string())
        .bind(details)
        .bind(&now)
        .bind(&auth.device_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        tx.commit().await.map_err(|e| DomainError::Database(DbError::Transaction(e.to_string())))?;

        self.find_by_id(id).await
    }
}

/// SQLite implementation of ReportMembershipRepository
pub struct SqliteReportMembershipRepository {
    pool: SqlitePool,
}

impl SqliteReportMembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportMembershipRepository for SqliteReportMembershipRepository {
    async fn find_relationship(&self, report_id: Uuid, user_id: Uuid) -> DomainResult<Option<ReportRole>> {
        let row = query_as::<_, ReportMemberRow>(
            "SELECT * FROM report_members WHERE report_id = ? AND user_id = ?",
        )
        .bind(report_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        match row {
            Some(row) => Ok(Some(row.into_entity()?.relationship)),
            None => Ok(None),
        }
    }

    async fn add_member(&self, report_id: Uuid, user_id: Uuid, relationship: ReportRole) -> DomainResult<ReportMember> {
        let now = Utc::now().to_rfc3339();
        query(
            "INSERT INTO report_members (report_id, user_id, relationship, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(report_id, user_id) DO UPDATE SET relationship = excluded.relationship",
        )
        .bind(report_id.to_string())
        .bind(user_id.to_string())
        .bind(relationship.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        Ok(ReportMember {
            report_id,
            user_id,
            relationship,
            created_at: Utc::now(),
        })
    }

    async fn find_members(&self, report_id: Uuid) -> DomainResult<Vec<ReportMember>> {
        let rows = query_as::<_, ReportMemberRow>(
            "SELECT * FROM report_members WHERE report_id = ? ORDER BY created_at",
        )
        .bind(report_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter().map(|row| row.into_entity()).collect()
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db_migration::apply_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_report_grants_nothing() {
        let pool = test_pool().await;
        let repo = SqliteReportRepository::new(pool);
        let auth = AuthContext::internal_system_context();
        let report = repo
            .create(NewReport { name: "FY2026".to_string(), manager_id: None, read_only: false }, &auth)
            .await
            .unwrap();
        assert_eq!(report.permissions, 0);
        assert!(report.permission_vector().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let pool = test_pool().await;
        let repo = SqliteReportRepository::new(pool.clone());
        let auth = AuthContext::internal_system_context();
        let result = repo
            .create(NewReport { name: "   ".to_string(), manager_id: None, read_only: false }, &auth)
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn test_update_permissions_writes_field_and_audit_log() {
        let pool = test_pool().await;
        let repo = SqliteReportRepository::new(pool.clone());
        let auth = AuthContext::internal_system_context();
        let report = repo
            .create(NewReport { name: "FY2026".to_string(), manager_id: None, read_only: false }, &auth)
            .await
            .unwrap();

        let updated = repo.update_permissions(report.id, 1 << 21, &auth).await.unwrap();
        assert_eq!(updated.permissions, 1 << 21);

        // last write wins
        let updated = repo.update_permissions(report.id, 3, &auth).await.unwrap();
        assert_eq!(updated.permissions, 3);

        let logged: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM audit_logs WHERE entity_id = ? AND action = 'update_permissions'",
        )
        .bind(report.id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(logged, 2);
    }

    #[tokio::test]
    async fn test_storage_rejects_out_of_range_values() {
        let pool = test_pool().await;
        let repo = SqliteReportRepository::new(pool);
        let auth = AuthContext::internal_system_context();
        let report = repo
            .create(NewReport { name: "FY2026".to_string(), manager_id: None, read_only: false }, &auth)
            .await
            .unwrap();

        assert!(repo.update_permissions(report.id, -1, &auth).await.is_err());
        assert_eq!(repo.find_by_id(report.id).await.unwrap().permissions, 0);
    }

    #[tokio::test]
    async fn test_missing_report() {
        let pool = test_pool().await;
        let repo = SqliteReportRepository::new(pool);
        let auth = AuthContext::internal_system_context();
        let id = Uuid::new_v4();
        assert!(matches!(repo.find_by_id(id).await, Err(DomainError::EntityNotFound(_, found)) if found == id));
        assert!(matches!(
            repo.update_permissions(id, 1, &auth).await,
            Err(DomainError::EntityNotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_memberships() {
        let pool = test_pool().await;
        let reports = SqliteReportRepository::new(pool.clone());
        let members = SqliteReportMembershipRepository::new(pool);
        let auth = AuthContext::internal_system_context();
        let report = reports
            .create(NewReport { name: "FY2026".to_string(), manager_id: None, read_only: false }, &auth)
            .await
            .unwrap();
        let user = Uuid::new_v4();

        assert_eq!(members.find_relationship(report.id, user).await.unwrap(), None);

        members.add_member(report.id, user, ReportRole::Consultant).await.unwrap();
        assert_eq!(members.find_relationship(report.id, user).await.unwrap(), Some(ReportRole::Consultant));

        members.add_member(report.id, user, ReportRole::ExternalAdvisor).await.unwrap();
        assert_eq!(
            members.find_relationship(report.id, user).await.unwrap(),
            Some(ReportRole::ExternalAdvisor)
        );
        assert_eq!(members.find_members(report.id).await.unwrap().len(), 1);
    }
}
