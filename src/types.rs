// Re-export the role and capability types from the permission module
pub use crate::domains::permission::{UserRole, ReportRole, ReportCapability};
