use crate::domains::permission::codec::{decode, PermissionVector, MAX_PERMISSION_VALUE};
use crate::domains::permission::registry::Part;
use crate::domains::permission::visibility::NavigationState;
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::types::ReportRole;
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Core Report entity, reduced to what the permission model reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub name: String,
    /// Designated managing editor
    pub manager_id: Option<Uuid>,
    /// Encoded permission field (0 to 2^31 - 1)
    pub permissions: i64,
    /// Published or locked reports cannot be published again
    pub read_only: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn permission_vector(&self) -> DomainResult<PermissionVector> {
        decode(self.permissions)
    }

    pub fn is_managed_by(&self, user_id: &Uuid) -> bool {
        self.manager_id.as_ref() == Some(user_id)
    }
}

/// NewReport DTO - used when creating a new report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
    pub name: String,
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub read_only: bool,
}

impl Validate for NewReport {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.trim().to_string()))
            .required()
            .max_length(200)
            .validate()?;
        Ok(())
    }
}

/// Partial update carrying only the permission field
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateReportPermissions {
    pub permissions: i64,
}

impl Validate for UpdateReportPermissions {
    fn validate(&self) -> DomainResult<()> {
        if !(0..=MAX_PERMISSION_VALUE).contains(&self.permissions) {
            return Err(DomainError::InvalidPermissionValue(self.permissions));
        }
        Ok(())
    }
}

/// Membership of a user on a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMember {
    pub report_id: Uuid,
    pub user_id: Uuid,
    pub relationship: ReportRole,
    pub created_at: DateTime<Utc>,
}

/// Navigation request coming from the shell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub part: u8,
    pub section: String,
    #[serde(default)]
    pub subsection: Option<String>,
}

impl Validate for NavigationRequest {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("part", Some(self.part))
            .range(1, 5)
            .validate()?;
        ValidationBuilder::new("section", Some(self.section.clone()))
            .required()
            .section_id()
            .validate()?;
        ValidationBuilder::new("subsection", self.subsection.clone())
            .section_id()
            .validate()?;
        Ok(())
    }
}

impl NavigationRequest {
    /// Convert to a navigation state; malformed requests yield `None` so the
    /// evaluator falls back to the first visible section
    pub fn into_state(self) -> Option<NavigationState> {
        if self.validate().is_err() {
            log::debug!("Ignoring malformed navigation request: part {} section '{}'", self.part, self.section);
            return None;
        }
        Part::from_number(self.part).map(|part| NavigationState {
            part,
            section: self.section,
            subsection: self.subsection,
        })
    }
}

/// ReportRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub id: String,
    pub name: String,
    pub manager_id: Option<String>,
    pub permissions: i64,
    pub read_only: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn parse_datetime(value: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::Internal(format!("Invalid date format: {}", value)))
}

impl ReportRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Report> {
        let manager_id = match &self.manager_id {
            Some(id) => Some(Uuid::parse_str(id).map_err(|_| DomainError::InvalidUuid(id.clone()))?),
            None => None,
        };

        Ok(Report {
            id: Uuid::parse_str(&self.id)
                .map_err(|_| DomainError::InvalidUuid(self.id.clone()))?,
            name: self.name,
            manager_id,
            permissions: self.permissions,
            read_only: self.read_only != 0,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// ReportMemberRow - SQLite row representation for report_members
#[derive(Debug, Clone, FromRow)]
pub struct ReportMemberRow {
    pub report_id: String,
    pub user_id: String,
    pub relationship: String,
    pub created_at: String,
}

impl ReportMemberRow {
    pub fn into_entity(self) -> DomainResult<ReportMember> {
        Ok(ReportMember {
            report_id: Uuid::parse_str(&self.report_id)
                .map_err(|_| DomainError::InvalidUuid(self.report_id.clone()))?,
            user_id: Uuid::parse_str(&self.user_id)
                .map_err(|_| DomainError::InvalidUuid(self.user_id.clone()))?,
            relationship: ReportRole::from_str(&self.relationship).ok_or_else(|| {
                DomainError::Validation(ValidationError::invalid_value(
                    "relationship",
                    &format!("unknown relationship '{}'", self.relationship),
                ))
            })?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}
