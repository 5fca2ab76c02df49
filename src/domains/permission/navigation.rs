use crate::domains::permission::has_permission::ReportRole;
use crate::domains::permission::registry::{self, Part, SubsectionDescriptor, DIAGNOSTIC_GROUP_ID};
use crate::domains::permission::visibility::{NavigationState, Resolution, VisibilityEvaluator};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartVisibility {
    pub part: Part,
    pub number: u8,
    pub label: &'static str,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsectionVisibility {
    pub id: &'static str,
    pub label: &'static str,
    pub visible: bool,
    pub items: Vec<SubsectionVisibility>,
}

/// One row of the active part's section list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationEntry {
    Section {
        id: &'static str,
        label: &'static str,
        visible: bool,
    },
    /// The diagnostic tab of part 2; shown when any child is visible
    Group {
        id: &'static str,
        label: &'static str,
        visible: bool,
        children: Vec<SubsectionVisibility>,
    },
}

impl NavigationEntry {
    pub fn is_visible(&self) -> bool {
        match self {
            NavigationEntry::Section { visible, .. } | NavigationEntry::Group { visible, .. } => *visible,
        }
    }
}

/// Read-only snapshot handed to the navigation shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationView {
    pub role: ReportRole,
    /// Whether section content may be changed
    pub editable: bool,
    pub parts: Vec<PartVisibility>,
    pub active: Resolution,
    /// Section list of the active part; empty when nothing is accessible
    pub sections: Vec<NavigationEntry>,
}

pub fn part_visibility(evaluator: &VisibilityEvaluator) -> Vec<PartVisibility> {
    Part::ALL
        .into_iter()
        .map(|part| PartVisibility {
            part,
            number: part.number(),
            label: part.label(),
            visible: evaluator.is_part_visible(part),
        })
        .collect()
}

fn subsection_visibility(evaluator: &VisibilityEvaluator, sub: &SubsectionDescriptor) -> SubsectionVisibility {
    SubsectionVisibility {
        id: sub.id,
        label: sub.label,
        visible: evaluator.is_part_visible(Part::Priorities) && evaluator.is_binding_visible(sub.binding),
        items: sub.items.iter().map(|item| subsection_visibility(evaluator, item)).collect(),
    }
}

/// Section list of one part; part 2's diagnostic sections are folded under one group
pub fn section_visibility(evaluator: &VisibilityEvaluator, part: Part) -> Vec<NavigationEntry> {
    let part_visible = evaluator.is_part_visible(part);
    let mut entries = Vec::new();
    let mut group_emitted = false;

    for section in registry::navigable_sections_for_part(part) {
        if registry::is_diagnostic_section(section) {
            if !group_emitted {
                let children: Vec<SubsectionVisibility> = registry::diagnostic_subsections()
                    .iter()
                    .map(|sub| subsection_visibility(evaluator, sub))
                    .collect();
                entries.push(NavigationEntry::Group {
                    id: DIAGNOSTIC_GROUP_ID,
                    label: "Diagnostic",
                    visible: evaluator.is_diagnostic_group_visible(),
                    children,
                });
                group_emitted = true;
            }
            continue;
        }
        entries.push(NavigationEntry::Section {
            id: section.id,
            label: section.label,
            visible: part_visible && evaluator.is_binding_visible(section.binding),
        });
    }
    entries
}

/// Build the shell view, repairing the active selection when it is no longer visible
pub fn build_navigation(evaluator: &VisibilityEvaluator, current: Option<&NavigationState>) -> NavigationView {
    let active = evaluator.resolve(current);
    let sections = match &active {
        Resolution::Selected(state) => section_visibility(evaluator, state.part),
        Resolution::NoAccessibleContent => Vec::new(),
    };
    NavigationView {
        role: evaluator.role(),
        editable: evaluator.can_edit_content(),
        parts: part_visibility(evaluator),
        active,
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::permission::codec::PermissionVector;

    #[test]
    fn test_priorities_folds_diagnostic_group() {
        let manager = VisibilityEvaluator::new(ReportRole::Manager, PermissionVector::none(), false);
        let entries = section_visibility(&manager, Part::Priorities);
        assert_eq!(entries.len(), 4);
        match &entries[0] {
            NavigationEntry::Group { id, children, visible, .. } => {
                assert_eq!(*id, DIAGNOSTIC_GROUP_ID);
                assert!(*visible);
                assert_eq!(children.len(), 5);
                assert_eq!(children[2].items.len(), 5);
            }
            other => panic!("expected group, got {:?}", other),
        }
        assert!(entries.iter().all(|e| e.is_visible()));
    }

    #[test]
    fn test_advisor_view_with_one_impacts_bit() {
        let mut vector = PermissionVector::none();
        vector.set(7, true);
        let evaluator = VisibilityEvaluator::new(ReportRole::ExternalAdvisor, vector, false);
        let view = build_navigation(&evaluator, None);

        let visible_parts: Vec<u8> = view.parts.iter().filter(|p| p.visible).map(|p| p.number).collect();
        assert_eq!(visible_parts, vec![2]);
        assert_eq!(
            view.active,
            Resolution::Selected(NavigationState::new(Part::Priorities, DIAGNOSTIC_GROUP_ID).with_subsection("impacts"))
        );
        match &view.sections[0] {
            NavigationEntry::Group { children, .. } => {
                let shown: Vec<&str> = children.iter().filter(|c| c.visible).map(|c| c.id).collect();
                assert_eq!(shown, vec!["impacts"]);
                assert!(children[2].items.iter().all(|i| i.visible));
            }
            other => panic!("expected group, got {:?}", other),
        }
        assert!(view.sections[1..].iter().all(|e| !e.is_visible()));
        assert!(!view.editable);
    }

    #[test]
    fn test_offered_subtabs_round_trip() {
        let manager = VisibilityEvaluator::new(ReportRole::Manager, PermissionVector::all(), false);
        let view = build_navigation(&manager, Some(&NavigationState::new(Part::Priorities, "priority-topics")));
        assert!(view.editable);

        let children = match &view.sections[0] {
            NavigationEntry::Group { id, children, .. } => {
                assert_eq!(*id, DIAGNOSTIC_GROUP_ID);
                children.clone()
            }
            other => panic!("expected group, got {:?}", other),
        };
        for child in children {
            let picked = NavigationState::new(Part::Priorities, DIAGNOSTIC_GROUP_ID).with_subsection(child.id);
            let view = build_navigation(&manager, Some(&picked));
            assert_eq!(view.active, Resolution::Selected(picked), "{}", child.id);

            let bare = NavigationState::new(Part::Priorities, child.id);
            assert_eq!(manager.resolve(Some(&bare)), Resolution::Selected(bare.clone()));
        }
    }

    #[test]
    fn test_empty_view_for_locked_out_advisor() {
        let evaluator = VisibilityEvaluator::new(ReportRole::ExternalAdvisor, PermissionVector::none(), false);
        let view = build_navigation(&evaluator, None);
        assert_eq!(view.active, Resolution::NoAccessibleContent);
        assert!(view.sections.is_empty());
        assert!(view.parts.iter().all(|p| !p.visible));
    }

    #[test]
    fn test_manager_view_lists_publish() {
        let manager = VisibilityEvaluator::new(ReportRole::Manager, PermissionVector::none(), false);
        let current = NavigationState::new(Part::Communication, "awards");
        let view = build_navigation(&manager, Some(&current));
        assert_eq!(view.active, Resolution::Selected(current));
        assert!(matches!(
            view.sections.last(),
            Some(NavigationEntry::Section { id: "publish", visible: true, .. })
        ));
    }
}
