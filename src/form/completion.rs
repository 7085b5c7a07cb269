use crate::form::registry::FieldRegistry;
use crate::form::section::Section;
use crate::form::session::Session;

/// Per-section completion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionCompletion {
    pub section: &'static str,
    pub required: usize,
    pub filled: usize,
    /// True only for sections with at least one required field, all filled.
    pub completed: bool,
}

/// Read-only progress snapshot. Always recomputed, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionState {
    pub completed_required: usize,
    pub total_required: usize,
    pub percentage: u8,
    pub sections: Vec<SectionCompletion>,
}

impl CompletionState {
    pub fn is_complete(&self) -> bool {
        self.completed_required == self.total_required
    }

    pub fn section(&self, id: &str) -> Option<&SectionCompletion> {
        self.sections.iter().find(|entry| entry.section == id)
    }
}

/// Aggregates required-field fill state into a percentage and section flags.
pub fn recompute(session: &Session, registry: &FieldRegistry, sections: &[Section]) -> CompletionState {
    let required = registry.all_required();
    let completed_required = required.iter().filter(|key| session.is_filled(key)).count();
    let total_required = required.len();

    let sections = sections
        .iter()
        .map(|section| {
            let keys: Vec<&'static str> = section.required_fields(registry).collect();
            let filled = keys.iter().filter(|key| session.is_filled(key)).count();
            SectionCompletion {
                section: section.id,
                required: keys.len(),
                filled,
                completed: !keys.is_empty() && filled == keys.len(),
            }
        })
        .collect();

    CompletionState {
        completed_required,
        total_required,
        percentage: percentage(completed_required, total_required),
        sections,
    }
}

/// Rounds half up, matching the progress bar. No required fields reads as 100.
fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = (200 * completed + total) / (2 * total);
    scaled.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldDescriptor, FieldKind, FieldValue};

    fn fixture() -> (FieldRegistry, Vec<Section>) {
        let registry = FieldRegistry::from_descriptors(vec![
            FieldDescriptor::new("a", FieldKind::Text).required(),
            FieldDescriptor::new("b", FieldKind::Text).required(),
            FieldDescriptor::new("c", FieldKind::Text).required(),
            FieldDescriptor::new("notes", FieldKind::Text),
        ])
        .unwrap();
        let sections = vec![
            Section::new("first", "First", vec!["a", "b"]),
            Section::new("second", "Second", vec!["c"]),
            Section::new("extra", "Extra", vec!["notes"]),
        ];
        (registry, sections)
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn section_without_required_fields_is_never_completed() {
        let (registry, sections) = fixture();
        let mut session = Session::new(&registry);
        session.set("notes", FieldValue::text("something")).unwrap();

        let state = recompute(&session, &registry, &sections);
        assert!(!state.section("extra").unwrap().completed);
    }

    #[test]
    fn sections_complete_independently() {
        let (registry, sections) = fixture();
        let mut session = Session::new(&registry);
        session.set("c", FieldValue::text("done")).unwrap();

        let state = recompute(&session, &registry, &sections);
        assert_eq!(state.completed_required, 1);
        assert_eq!(state.total_required, 3);
        assert_eq!(state.percentage, 33);
        assert!(!state.section("first").unwrap().completed);
        assert!(state.section("second").unwrap().completed);
    }

    #[test]
    fn full_form_reads_one_hundred() {
        let (registry, sections) = fixture();
        let mut session = Session::new(&registry);
        for key in ["a", "b", "c"] {
            session.set(key, FieldValue::text("x")).unwrap();
        }
        let state = recompute(&session, &registry, &sections);
        assert_eq!(state.percentage, 100);
        assert!(state.is_complete());
    }
}
