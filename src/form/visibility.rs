use crate::form::field::YesNo;
use crate::form::session::Session;

/// A field that is only shown while a yes/no controller answers yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealRule {
    pub controller: &'static str,
    pub dependent: &'static str,
}

impl RevealRule {
    pub fn new(controller: &'static str, dependent: &'static str) -> Self {
        Self {
            controller,
            dependent,
        }
    }

    pub fn is_revealed(&self, session: &Session) -> bool {
        session.value(self.controller).as_flag() == Some(YesNo::Yes)
    }
}

/// Conditional-field rules, evaluated against the session on demand.
///
/// Hidden fields keep whatever value they had.
#[derive(Debug, Clone, Default)]
pub struct VisibilityRules {
    rules: Vec<RevealRule>,
}

impl VisibilityRules {
    pub fn new(rules: Vec<RevealRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RevealRule] {
        &self.rules
    }

    pub fn is_visible(&self, session: &Session, field: &str) -> bool {
        self.rules
            .iter()
            .filter(|rule| rule.dependent == field)
            .all(|rule| rule.is_revealed(session))
    }

    /// Fields that change visibility when `controller` changes.
    pub fn dependents_of<'a>(&'a self, controller: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.controller == controller)
            .map(|rule| rule.dependent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldDescriptor, FieldKind, FieldValue};
    use crate::form::registry::FieldRegistry;

    #[test]
    fn dependent_follows_controller_answer() {
        let registry = FieldRegistry::from_descriptors(vec![
            FieldDescriptor::new("modifications", FieldKind::Flag),
            FieldDescriptor::new("modifications-found", FieldKind::Text),
            FieldDescriptor::new("comments", FieldKind::Text),
        ])
        .unwrap();
        let rules = VisibilityRules::new(vec![RevealRule::new("modifications", "modifications-found")]);
        let mut session = Session::new(&registry);

        assert!(!rules.is_visible(&session, "modifications-found"));
        assert!(rules.is_visible(&session, "comments"));

        session.set("modifications", FieldValue::Flag(YesNo::Yes)).unwrap();
        assert!(rules.is_visible(&session, "modifications-found"));

        session.set("modifications-found", FieldValue::text("lift kit")).unwrap();
        session.set("modifications", FieldValue::Flag(YesNo::No)).unwrap();
        assert!(!rules.is_visible(&session, "modifications-found"));
        assert_eq!(session.value("modifications-found"), &FieldValue::text("lift kit"));
        assert_eq!(
            rules.dependents_of("modifications").collect::<Vec<_>>(),
            vec!["modifications-found"]
        );
    }
}
