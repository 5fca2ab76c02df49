pub mod repository;
pub mod service;
pub mod types;

pub use repository::{ReportMembershipRepository, ReportRepository, SqliteReportMembershipRepository, SqliteReportRepository};
pub use service::{ReportPermissionService, ReportPermissionServiceImpl};
pub use types::{NavigationRequest, NewReport, Report, ReportMember, UpdateReportPermissions};
