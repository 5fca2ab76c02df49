use crate::auth::AuthContext;
use crate::domains::permission::codec::{decode, PermissionVector};
use crate::domains::permission::registry::{self, BitBinding, Part};
use crate::errors::{DomainError, DomainResult, ServiceResult, ValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tri-state of a part-level checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Checked,
    Unchecked,
    Indeterminate,
}

/// Where the editor is relative to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorStatus {
    Clean,
    Dirty,
    /// A save is in flight; the edited vector is shown optimistically
    Saving,
}

/// Persists an encoded permission value for a report.
///
/// The whole integer is written as one field; concurrent editors of the same
/// report are not coordinated and the last write wins.
#[async_trait]
pub trait PermissionWriter: Send + Sync {
    /// Returns the value actually stored
    async fn write_permissions(&self, report_id: Uuid, value: i64, auth: &AuthContext) -> ServiceResult<i64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorSection {
    pub id: &'static str,
    pub label: &'static str,
    pub bit: u8,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorPart {
    pub part: Part,
    pub number: u8,
    pub label: &'static str,
    pub state: CheckState,
    pub sections: Vec<EditorSection>,
}

/// Manager-side editor of one report's permission field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionEditor {
    report_id: Uuid,
    persisted: PermissionVector,
    working: PermissionVector,
    status: EditorStatus,
}

impl PermissionEditor {
    pub fn new(report_id: Uuid, persisted: PermissionVector) -> Self {
        Self {
            report_id,
            persisted,
            working: persisted,
            status: EditorStatus::Clean,
        }
    }

    /// Open from the integer stored on a report
    pub fn from_value(report_id: Uuid, value: i64) -> DomainResult<Self> {
        Ok(Self::new(report_id, decode(value)?))
    }

    /// Rebuild an editor whose edits were held by the caller between calls
    pub fn resume(report_id: Uuid, persisted: i64, working: i64) -> DomainResult<Self> {
        let mut editor = Self::from_value(report_id, persisted)?;
        editor.working = decode(working)?;
        editor.mark_edited();
        Ok(editor)
    }

    pub fn report_id(&self) -> Uuid {
        self.report_id
    }

    /// Vector as currently displayed (edits included)
    pub fn vector(&self) -> &PermissionVector {
        &self.working
    }

    pub fn persisted(&self) -> &PermissionVector {
        &self.persisted
    }

    pub fn status(&self) -> EditorStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.persisted
    }

    pub fn encoded(&self) -> i64 {
        self.working.encode()
    }

    pub fn part_state(&self, part: Part) -> CheckState {
        let descriptor = part.descriptor();
        let granted = self.working.count_in(descriptor.bits());
        if granted == 0 {
            CheckState::Unchecked
        } else if granted == descriptor.len() {
            CheckState::Checked
        } else {
            CheckState::Indeterminate
        }
    }

    /// Checked parts clear every bit; unchecked or indeterminate parts set every bit
    pub fn toggle_part(&mut self, part: Part) {
        let grant = self.part_state(part) != CheckState::Checked;
        self.working.set_range(part.descriptor().bits(), grant);
        self.mark_edited();
    }

    /// Flip a single section bit, leaving its siblings untouched
    pub fn toggle_section(&mut self, section_id: &str) -> DomainResult<()> {
        let bit = Self::bit_for(section_id)?;
        self.working.toggle(bit as usize);
        self.mark_edited();
        Ok(())
    }

    pub fn set_section(&mut self, section_id: &str, granted: bool) -> DomainResult<()> {
        let bit = Self::bit_for(section_id)?;
        self.working.set(bit as usize, granted);
        self.mark_edited();
        Ok(())
    }

    fn bit_for(section_id: &str) -> DomainResult<u8> {
        let section = registry::section(section_id)
            .ok_or_else(|| DomainError::UnknownSection(section_id.to_string()))?;
        match section.binding {
            BitBinding::Bound(bit) => Ok(bit),
            BitBinding::ManagerOnly => Err(DomainError::Validation(ValidationError::invalid_value(
                "section",
                &format!("'{}' has no permission bit", section_id),
            ))),
        }
    }

    fn mark_edited(&mut self) {
        self.status = if self.is_dirty() { EditorStatus::Dirty } else { EditorStatus::Clean };
    }

    /// Checkable tree grouped by part
    pub fn tree(&self) -> Vec<EditorPart> {
        Part::ALL
            .into_iter()
            .map(|part| EditorPart {
                part,
                number: part.number(),
                label: part.label(),
                state: self.part_state(part),
                sections: registry::sections_for_part(part)
                    .into_iter()
                    .filter_map(|s| {
                        s.bit_index().map(|bit| EditorSection {
                            id: s.id,
                            label: s.label,
                            bit,
                            checked: self.working.get(bit as usize),
                        })
                    })
                    .collect(),
            })
            .collect()
    }

    /// Discard local edits without touching storage
    pub fn cancel(&mut self) {
        self.working = self.persisted;
        self.status = EditorStatus::Clean;
    }

    /// Mark the edited vector as pending and return the value to write
    pub fn begin_save(&mut self) -> i64 {
        self.status = EditorStatus::Saving;
        self.encoded()
    }

    /// Settle a save started with [`begin_save`]. On failure the last persisted
    /// vector is shown again and the error is handed back.
    ///
    /// [`begin_save`]: Self::begin_save
    pub fn finish_save(&mut self, outcome: ServiceResult<i64>) -> ServiceResult<i64> {
        let outcome = outcome.and_then(|stored| Ok((stored, decode(stored)?)));
        match outcome {
            Ok((stored, vector)) => {
                self.persisted = vector;
                self.working = vector;
                self.status = EditorStatus::Clean;
                log::info!("Saved permissions {} for report {}", stored, self.report_id);
                Ok(stored)
            }
            Err(e) => {
                log::error!("Failed to save permissions for report {}: {}", self.report_id, e);
                self.working = self.persisted;
                self.status = EditorStatus::Clean;
                Err(e)
            }
        }
    }

    /// Write the edited vector through `writer` in one round-trip
    pub async fn save(&mut self, writer: &dyn PermissionWriter, auth: &AuthContext) -> ServiceResult<i64> {
        let value = self.begin_save();
        let outcome = writer.write_permissions(self.report_id, value, auth).await;
        self.finish_save(outcome)
    }
}

#[cfg(test)]
pub(crate) struct MockPermissionWriter {
    pub fail_with: Option<crate::errors::ServiceError>,
    pub written: std::sync::Mutex<Vec<i64>>,
}

#[cfg(test)]
impl MockPermissionWriter {
    pub fn succeeding() -> Self {
        Self { fail_with: None, written: std::sync::Mutex::new(Vec::new()) }
    }

    pub fn failing(error: crate::errors::ServiceError) -> Self {
        Self { fail_with: Some(error), written: std::sync::Mutex::new(Vec::new()) }
    }
}

#[cfg(test)]
#[async_trait]
impl PermissionWriter for MockPermissionWriter {
    async fn write_permissions(&self, _report_id: Uuid, value: i64, _auth: &AuthContext) -> ServiceResult<i64> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.written.lock().unwrap().push(value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;

    fn editor() -> PermissionEditor {
        PermissionEditor::new(Uuid::new_v4(), PermissionVector::none())
    }

    #[test]
    fn test_tri_state_for_part_two() {
        let mut editor = editor();
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Unchecked);

        for id in ["diagnostic-context", "diagnostic-impacts", "materiality-matrix"] {
            editor.toggle_section(id).unwrap();
        }
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Indeterminate);

        for section in registry::sections_for_part(Part::Priorities) {
            editor.set_section(section.id, true).unwrap();
        }
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Checked);

        for section in registry::sections_for_part(Part::Priorities) {
            editor.set_section(section.id, false).unwrap();
        }
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Unchecked);
    }

    #[test]
    fn test_part_toggle_moves_to_pure_states() {
        let mut editor = editor();
        editor.toggle_section("materiality-analysis").unwrap();
        editor.toggle_part(Part::Priorities);
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Checked);
        assert_eq!(editor.vector().count_in(5..=12), 8);

        editor.toggle_part(Part::Priorities);
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Unchecked);

        editor.toggle_part(Part::Priorities);
        assert_eq!(editor.part_state(Part::Priorities), CheckState::Checked);
        // neighbours are untouched
        assert!(!editor.vector().any_in(0..=4));
        assert!(!editor.vector().any_in(13..=30));
    }

    #[test]
    fn test_section_toggle_leaves_siblings() {
        let mut editor = editor();
        editor.toggle_part(Part::Understanding);
        editor.toggle_section("values").unwrap();
        assert_eq!(editor.part_state(Part::Understanding), CheckState::Indeterminate);
        assert!(editor.vector().get(1));
        assert!(!editor.vector().get(2));
        assert!(editor.vector().get(3));
    }

    #[test]
    fn test_unbound_and_unknown_sections_are_rejected() {
        let mut editor = editor();
        assert!(matches!(editor.toggle_section("publish"), Err(DomainError::Validation(_))));
        assert!(matches!(editor.toggle_section("nope"), Err(DomainError::UnknownSection(_))));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_tree_lists_every_bound_section() {
        let mut editor = editor();
        editor.toggle_section("cover").unwrap();
        let tree = editor.tree();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.iter().map(|p| p.sections.len()).sum::<usize>(), 31);
        let part5 = &tree[4];
        assert_eq!(part5.state, CheckState::Indeterminate);
        assert!(part5.sections[0].checked);
        assert!(part5.sections.iter().all(|s| s.id != "publish"));
    }

    #[test]
    fn test_cancel_discards_edits() {
        let mut editor = PermissionEditor::from_value(Uuid::new_v4(), 0b101).unwrap();
        editor.toggle_part(Part::Communication);
        assert_eq!(editor.status(), EditorStatus::Dirty);
        editor.cancel();
        assert_eq!(editor.encoded(), 0b101);
        assert_eq!(editor.status(), EditorStatus::Clean);
    }

    #[test]
    fn test_opening_with_bad_value_fails() {
        assert!(matches!(
            PermissionEditor::from_value(Uuid::new_v4(), -5),
            Err(DomainError::InvalidPermissionValue(-5))
        ));
    }

    #[test]
    fn test_resume_keeps_caller_edits() {
        let id = Uuid::new_v4();
        let editor = PermissionEditor::resume(id, 1, 3).unwrap();
        assert_eq!(editor.status(), EditorStatus::Dirty);
        assert_eq!(editor.encoded(), 3);
        assert_eq!(editor.persisted().encode(), 1);

        let editor = PermissionEditor::resume(id, 3, 3).unwrap();
        assert_eq!(editor.status(), EditorStatus::Clean);
        assert!(PermissionEditor::resume(id, 0, 1 << 31).is_err());
    }

    #[test]
    fn test_begin_save_marks_pending() {
        let mut editor = editor();
        editor.toggle_section("mission").unwrap();
        let value = editor.begin_save();
        assert_eq!(value, 1 << 1);
        assert_eq!(editor.status(), EditorStatus::Saving);
        assert!(editor.vector().get(1));
    }

    #[tokio::test]
    async fn test_successful_save_commits() {
        let writer = MockPermissionWriter::succeeding();
        let auth = AuthContext::internal_system_context();
        let mut editor = editor();
        editor.toggle_part(Part::Strategy);

        let stored = editor.save(&writer, &auth).await.unwrap();
        assert_eq!(stored, 0b1111 << 13);
        assert_eq!(*editor.persisted(), *editor.vector());
        assert_eq!(editor.status(), EditorStatus::Clean);
        assert_eq!(*writer.written.lock().unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn test_failed_save_restores_persisted_vector() {
        let writer = MockPermissionWriter::failing(ServiceError::Network("offline".to_string()));
        let auth = AuthContext::internal_system_context();
        let mut editor = PermissionEditor::from_value(Uuid::new_v4(), 1).unwrap();
        editor.toggle_part(Part::Performance);

        let result = editor.save(&writer, &auth).await;
        assert!(matches!(result, Err(ServiceError::Network(_))));
        assert_eq!(editor.encoded(), 1);
        assert!(!editor.is_dirty());
        assert_eq!(editor.status(), EditorStatus::Clean);
    }
}
