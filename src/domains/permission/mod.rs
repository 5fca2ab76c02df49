pub mod codec;
pub mod editor;
pub mod has_permission;
pub mod navigation;
pub mod registry;
pub mod role;
pub mod visibility;

pub use codec::{decode, encode, PermissionVector, MAX_PERMISSION_VALUE};
pub use editor::{CheckState, EditorStatus, PermissionEditor, PermissionWriter};
pub use has_permission::{ReportCapability, ReportRole, UserRole};
pub use navigation::{build_navigation, NavigationEntry, NavigationView};
pub use registry::{BitBinding, Part, SectionDescriptor, PERMISSION_BITS};
pub use role::{resolve_role, ReportRelationship, RoleResolution};
pub use visibility::{NavigationState, Resolution, VisibilityEvaluator};
