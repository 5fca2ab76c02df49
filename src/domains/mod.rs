pub mod permission;
pub mod report;

pub use report::{ReportPermissionService, ReportPermissionServiceImpl};
