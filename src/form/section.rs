use tracing::{debug, info};

use crate::errors::{FormError, SectionValidationError};
use crate::form::registry::FieldRegistry;
use crate::form::session::Session;

/// Ordered, named partition of field ids presented together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub fields: Vec<&'static str>,
}

impl Section {
    pub fn new(id: &'static str, title: &'static str, fields: Vec<&'static str>) -> Self {
        Self { id, title, fields }
    }

    pub fn required_fields<'a>(
        &'a self,
        registry: &'a FieldRegistry,
    ) -> impl Iterator<Item = &'static str> + 'a {
        self.fields
            .iter()
            .copied()
            .filter(move |key| registry.is_required(key))
    }

    /// Required fields of this section that are still empty, in field order.
    pub fn missing_required(&self, registry: &FieldRegistry, session: &Session) -> Vec<&'static str> {
        self.required_fields(registry)
            .filter(|key| !session.is_filled(key))
            .collect()
    }
}

/// Result of a navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { from: &'static str, to: &'static str },
    /// Already at the boundary in the requested direction.
    Stayed(&'static str),
}

impl Navigation {
    pub fn active(&self) -> &'static str {
        match self {
            Navigation::Moved { to, .. } => to,
            Navigation::Stayed(id) => id,
        }
    }
}

/// Section state machine: exactly one active section, revisitable at will.
#[derive(Debug, Clone)]
pub struct SectionNavigator {
    sections: Vec<Section>,
    active: usize,
}

impl SectionNavigator {
    /// Builds the navigator, checking every referenced field is registered
    /// and that no field belongs to two sections.
    pub fn new(sections: Vec<Section>, registry: &FieldRegistry) -> Result<Self, FormError> {
        if sections.is_empty() {
            return Err(FormError::UnknownSection("<none defined>".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for section in &sections {
            if !seen.insert(section.id) {
                return Err(FormError::DuplicateField(format!("section {}", section.id)));
            }
        }
        let mut placed = std::collections::HashSet::new();
        for field in sections.iter().flat_map(|section| section.fields.iter()) {
            registry.get(field)?;
            if !placed.insert(*field) {
                return Err(FormError::DuplicateField((*field).to_string()));
            }
        }
        Ok(Self {
            sections,
            active: 0,
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn active(&self) -> &Section {
        &self.sections[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn first(&self) -> &Section {
        &self.sections[0]
    }

    pub fn section(&self, id: &str) -> Result<&Section, FormError> {
        self.position(id).map(|idx| &self.sections[idx])
    }

    /// Section that owns the given field, if any.
    pub fn section_of(&self, field: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.fields.iter().any(|key| *key == field))
    }

    fn position(&self, id: &str) -> Result<usize, FormError> {
        self.sections
            .iter()
            .position(|section| section.id == id)
            .ok_or_else(|| FormError::UnknownSection(id.to_string()))
    }

    /// Unconditional jump used by direct section selection.
    pub fn go_to(&mut self, id: &str) -> Result<Navigation, FormError> {
        let target = self.position(id)?;
        Ok(self.move_to(target))
    }

    pub fn validate_section(
        &self,
        id: &str,
        registry: &FieldRegistry,
        session: &Session,
    ) -> Result<Vec<&'static str>, FormError> {
        Ok(self.section(id)?.missing_required(registry, session))
    }

    /// Moves forward only when the active section has no empty required fields.
    pub fn advance(
        &mut self,
        registry: &FieldRegistry,
        session: &Session,
    ) -> Result<Navigation, SectionValidationError> {
        let current = self.active();
        if self.active + 1 >= self.sections.len() {
            return Ok(Navigation::Stayed(current.id));
        }
        let missing = current.missing_required(registry, session);
        if !missing.is_empty() {
            debug!(section = current.id, missing = ?missing, "advance refused");
            return Err(SectionValidationError {
                section: current.id,
                missing,
            });
        }
        Ok(self.move_to(self.active + 1))
    }

    /// Moves back one section without validating.
    pub fn retreat(&mut self) -> Navigation {
        if self.active == 0 {
            return Navigation::Stayed(self.active().id);
        }
        self.move_to(self.active - 1)
    }

    pub fn reset(&mut self) {
        self.active = 0;
    }

    fn move_to(&mut self, target: usize) -> Navigation {
        let from = self.active().id;
        self.active = target;
        let to = self.active().id;
        if from == to {
            return Navigation::Stayed(to);
        }
        info!(from, to, "section changed");
        Navigation::Moved { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldDescriptor, FieldKind, FieldValue};

    fn fixture() -> (FieldRegistry, SectionNavigator, Session) {
        let registry = FieldRegistry::from_descriptors(vec![
            FieldDescriptor::new("a", FieldKind::Text).required(),
            FieldDescriptor::new("b", FieldKind::Text),
            FieldDescriptor::new("c", FieldKind::Text).required(),
            FieldDescriptor::new("d", FieldKind::Text),
        ])
        .unwrap();
        let navigator = SectionNavigator::new(
            vec![
                Section::new("one", "One", vec!["a", "b"]),
                Section::new("two", "Two", vec!["c"]),
                Section::new("three", "Three", vec!["d"]),
            ],
            &registry,
        )
        .unwrap();
        let session = Session::new(&registry);
        (registry, navigator, session)
    }

    #[test]
    fn advance_is_refused_until_section_is_complete() {
        let (registry, mut navigator, mut session) = fixture();

        let err = navigator.advance(&registry, &session).unwrap_err();
        assert_eq!(err.section, "one");
        assert_eq!(err.missing, vec!["a"]);
        assert_eq!(navigator.active().id, "one");

        session.set("a", FieldValue::text("filled")).unwrap();
        let nav = navigator.advance(&registry, &session).unwrap();
        assert_eq!(nav, Navigation::Moved { from: "one", to: "two" });
    }

    #[test]
    fn advance_at_last_section_is_a_no_op() {
        let (registry, mut navigator, session) = fixture();
        navigator.go_to("three").unwrap();
        assert_eq!(
            navigator.advance(&registry, &session).unwrap(),
            Navigation::Stayed("three")
        );
    }

    #[test]
    fn retreat_never_validates_and_stops_at_first() {
        let (_registry, mut navigator, _session) = fixture();
        navigator.go_to("two").unwrap();
        assert_eq!(
            navigator.retreat(),
            Navigation::Moved { from: "two", to: "one" }
        );
        assert_eq!(navigator.retreat(), Navigation::Stayed("one"));
    }

    #[test]
    fn go_to_unknown_section_fails() {
        let (_registry, mut navigator, _session) = fixture();
        assert!(matches!(
            navigator.go_to("nowhere"),
            Err(FormError::UnknownSection(_))
        ));
    }

    #[test]
    fn sections_must_reference_registered_fields() {
        let registry =
            FieldRegistry::from_descriptors(vec![FieldDescriptor::new("a", FieldKind::Text)])
                .unwrap();
        let err =
            SectionNavigator::new(vec![Section::new("one", "One", vec!["zz"])], &registry)
                .unwrap_err();
        assert_eq!(err, FormError::UnknownField("zz".into()));
    }
}
