use crate::domains::permission::codec::PermissionVector;
use crate::domains::permission::has_permission::{ReportCapability, ReportRole};
use crate::domains::permission::registry::{self, BitBinding, Part, SectionDescriptor, DIAGNOSTIC_GROUP_ID};
use log::debug;
use serde::{Deserialize, Serialize};

/// Active part and section of a navigation session.
///
/// Inside part 2 the diagnostic tab is addressed as section `diagnostic` with
/// the sub-tab id in `subsection`. A bare sub-tab id, or a `diagnostic-*` section
/// id with a matching sub-tab, is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub part: Part,
    pub section: String,
    /// Active diagnostic sub-tab, only meaningful inside part 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
}

impl NavigationState {
    pub fn new(part: Part, section: &str) -> Self {
        Self { part, section: section.to_string(), subsection: None }
    }

    pub fn with_subsection(mut self, subsection: &str) -> Self {
        self.subsection = Some(subsection.to_string());
        self
    }

    /// Diagnostic sections select the folded tab, the way the shell lists them
    fn from_descriptor(section: &SectionDescriptor) -> Self {
        match registry::diagnostic_subsection_for(section) {
            Some(sub) => Self::new(Part::Priorities, DIAGNOSTIC_GROUP_ID).with_subsection(sub.id),
            None => Self::new(section.part, section.id),
        }
    }
}

/// Result of repairing or choosing an active selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "selection", rename_all = "snake_case")]
pub enum Resolution {
    Selected(NavigationState),
    /// Nothing is visible; the caller renders an explicit empty state
    NoAccessibleContent,
}

impl Resolution {
    pub fn selection(&self) -> Option<&NavigationState> {
        match self {
            Resolution::Selected(state) => Some(state),
            Resolution::NoAccessibleContent => None,
        }
    }
}

/// Decides what a role may see for a given permission vector.
///
/// Every query is pure; unknown ids evaluate to not visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvaluator {
    role: ReportRole,
    vector: PermissionVector,
    read_only: bool,
}

impl VisibilityEvaluator {
    pub fn new(role: ReportRole, vector: PermissionVector, read_only: bool) -> Self {
        Self { role, vector, read_only }
    }

    pub fn role(&self) -> ReportRole {
        self.role
    }

    pub fn vector(&self) -> &PermissionVector {
        &self.vector
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn gated(&self) -> bool {
        self.role.is_permission_gated()
    }

    /// Per-node test shared by sections, sub-sections and impact items
    pub fn is_binding_visible(&self, binding: BitBinding) -> bool {
        match binding {
            BitBinding::Bound(bit) => !self.gated() || self.vector.get(bit as usize),
            BitBinding::ManagerOnly => self.role.has_capability(ReportCapability::Publish) && !self.read_only,
        }
    }

    /// A part is visible to an advisor when any bit in its range is granted
    pub fn is_part_visible(&self, part: Part) -> bool {
        !self.gated() || self.vector.any_in(part.descriptor().bits())
    }

    pub fn is_part_number_visible(&self, number: u8) -> bool {
        Part::from_number(number).is_some_and(|part| self.is_part_visible(part))
    }

    /// Content of a report can be changed by this role
    pub fn can_edit_content(&self) -> bool {
        self.role.has_capability(ReportCapability::EditContent) && !self.read_only
    }

    /// Accepts registry section ids, the diagnostic group id and diagnostic sub-tab ids
    pub fn is_section_visible(&self, part: Part, section_id: &str) -> bool {
        match registry::section(section_id) {
            Some(section) if section.part == part => {
                return self.is_part_visible(part) && self.is_binding_visible(section.binding);
            }
            None if part == Part::Priorities && section_id == DIAGNOSTIC_GROUP_ID => {
                return self.is_diagnostic_group_visible();
            }
            None if part == Part::Priorities && registry::diagnostic_subsection(section_id).is_some() => {
                return self.is_subsection_visible(section_id);
            }
            _ => {}
        }
        debug!("Section '{}' is not in part {}; treating as not visible", section_id, part.number());
        false
    }

    /// The folded diagnostic tab is shown when any sub-tab is
    pub fn is_diagnostic_group_visible(&self) -> bool {
        registry::diagnostic_subsections()
            .iter()
            .any(|sub| self.is_subsection_visible(sub.id))
    }

    /// Visibility of a diagnostic sub-tab of part 2
    pub fn is_subsection_visible(&self, subsection_id: &str) -> bool {
        match registry::diagnostic_subsection(subsection_id) {
            Some(sub) => self.is_part_visible(Part::Priorities) && self.is_binding_visible(sub.binding),
            None => false,
        }
    }

    /// Visibility of an item under the impacts sub-tab
    pub fn is_impact_item_visible(&self, item_id: &str) -> bool {
        match registry::impact_item(item_id) {
            Some(item) => self.is_part_visible(Part::Priorities) && self.is_binding_visible(item.binding),
            None => false,
        }
    }

    pub fn visible_parts(&self) -> Vec<Part> {
        Part::ALL.into_iter().filter(|part| self.is_part_visible(*part)).collect()
    }

    pub fn visible_sections(&self, part: Part) -> Vec<&'static SectionDescriptor> {
        if !self.is_part_visible(part) {
            return Vec::new();
        }
        registry::navigable_sections_for_part(part)
            .into_iter()
            .filter(|section| self.is_binding_visible(section.binding))
            .collect()
    }

    /// First visible section of one part, in registry order
    pub fn first_visible_in_part(&self, part: Part) -> Resolution {
        match self.visible_sections(part).first() {
            Some(section) => Resolution::Selected(NavigationState::from_descriptor(section)),
            None => Resolution::NoAccessibleContent,
        }
    }

    /// First section of the first visible part
    pub fn first_visible(&self) -> Resolution {
        Part::ALL
            .into_iter()
            .map(|part| self.first_visible_in_part(part))
            .find(|resolution| matches!(resolution, Resolution::Selected(_)))
            .unwrap_or(Resolution::NoAccessibleContent)
    }

    /// A selected sub-tab must belong to the selected diagnostic section
    pub fn is_selection_visible(&self, state: &NavigationState) -> bool {
        let sub_id = match state.subsection.as_deref() {
            Some(sub_id) => sub_id,
            None => return self.is_section_visible(state.part, &state.section),
        };
        let sub = match registry::diagnostic_subsection(sub_id) {
            Some(sub) if state.part == Part::Priorities => sub,
            _ => return false,
        };
        let belongs = state.section == DIAGNOSTIC_GROUP_ID
            || state.section == sub.id
            || registry::section(&state.section)
                .and_then(registry::diagnostic_subsection_for)
                .is_some_and(|owner| owner.id == sub.id);
        belongs && self.is_subsection_visible(sub.id)
    }

    /// Keep a still-visible selection untouched, otherwise fall back to [`first_visible`].
    ///
    /// [`first_visible`]: Self::first_visible
    pub fn resolve(&self, current: Option<&NavigationState>) -> Resolution {
        if let Some(state) = current {
            if self.is_selection_visible(state) {
                return Resolution::Selected(state.clone());
            }
            debug!(
                "Active section '{}' in part {} is no longer visible for {}",
                state.section,
                state.part.number(),
                self.role.as_str()
            );
        }
        self.first_visible()
    }
}
