use serde::{Deserialize, Serialize};

// --- Application Role Definition ---

/// Application-wide role of an authenticated user.
///
/// Orthogonal to the per-report role: an admin behaves like the report manager
/// on every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Member => "member",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "member" => Some(UserRole::Member),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

// --- Report Role Definition ---

/// Role a user holds on one particular report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRole {
    /// Owning/managing editor, full access including the permission editor
    Manager,
    /// Read-only team member, sees everything
    Consultant,
    /// Restricted collaborator, sees only what the report's permission field grants
    ExternalAdvisor,
}

/// Actions a report role may take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCapability {
    ViewAllSections,
    EditContent,
    ManagePermissions,
    Publish,
}

impl ReportRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportRole::Manager => "manager",
            ReportRole::Consultant => "consultant",
            ReportRole::ExternalAdvisor => "external_advisor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manager" => Some(ReportRole::Manager),
            "consultant" => Some(ReportRole::Consultant),
            "external_advisor" => Some(ReportRole::ExternalAdvisor),
            _ => None,
        }
    }

    /// Only external advisors are filtered through the permission field
    pub fn is_permission_gated(&self) -> bool {
        !self.has_capability(ReportCapability::ViewAllSections)
    }

    pub fn has_capability(&self, capability: ReportCapability) -> bool {
        match self {
            ReportRole::Manager => true,
            ReportRole::Consultant => match capability {
                ReportCapability::ViewAllSections => true,
                ReportCapability::EditContent
                | ReportCapability::ManagePermissions
                | ReportCapability::Publish => false,
            },
            // Advisors only see what the bitmask grants, section by section
            ReportRole::ExternalAdvisor => false,
        }
    }

    pub fn has_capabilities(&self, capabilities: &[ReportCapability]) -> bool {
        capabilities.iter().all(|c| self.has_capability(*c))
    }
}

impl ReportCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCapability::ViewAllSections => "view_all_sections",
            ReportCapability::EditContent => "edit_content",
            ReportCapability::ManagePermissions => "manage_permissions",
            ReportCapability::Publish => "publish",
        }
    }

    pub fn all() -> Vec<ReportCapability> {
        vec![
            ReportCapability::ViewAllSections,
            ReportCapability::EditContent,
            ReportCapability::ManagePermissions,
            ReportCapability::Publish,
        ]
    }
}
