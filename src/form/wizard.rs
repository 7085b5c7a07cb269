//! Command facade over the claim form.
//!
//! The presentation layer calls explicit commands here; each mutation runs
//! the derived value engine and returns a fresh completion snapshot.

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{FormError, SectionValidationError};
use crate::form::completion::{self, CompletionState};
use crate::form::derive::{DerivedValueEngine, RecomputeReport};
use crate::form::field::{FieldDescriptor, FieldKind, FieldValue, FileRef};
use crate::form::layout::{claim_layout, keys, register_claim_rules, FormLayout};
use crate::form::registry::FieldRegistry;
use crate::form::rules::{SimulatedDecoder, VehicleDecoder, VehicleDetails};
use crate::form::section::{Navigation, Section, SectionNavigator};
use crate::form::session::Session;
use crate::form::visibility::VisibilityRules;
use crate::time::Clock;

/// Outcome of a single field mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub changed: bool,
    pub derived: RecomputeReport,
    pub completion: CompletionState,
}

pub struct ClaimWizard {
    registry: FieldRegistry,
    engine: DerivedValueEngine,
    navigator: SectionNavigator,
    visibility: VisibilityRules,
    session: Session,
    decoder: Arc<dyn VehicleDecoder>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ClaimWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimWizard")
            .field("active", &self.navigator.active().id)
            .field("session", &self.session)
            .finish()
    }
}

impl ClaimWizard {
    /// Fresh claim wizard with the offline vehicle decoder.
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, FormError> {
        Self::with_decoder(clock, Arc::new(SimulatedDecoder))
    }

    pub fn with_decoder(
        clock: Arc<dyn Clock>,
        decoder: Arc<dyn VehicleDecoder>,
    ) -> Result<Self, FormError> {
        let FormLayout {
            registry,
            sections,
            visibility,
        } = claim_layout()?;
        let mut engine = DerivedValueEngine::new();
        register_claim_rules(&mut engine, &registry, clock.clone(), decoder.clone())?;
        let navigator = SectionNavigator::new(sections, &registry)?;
        let session = Session::new(&registry);
        info!(
            fields = registry.len(),
            sections = navigator.sections().len(),
            "claim wizard initialised"
        );
        Ok(Self {
            registry,
            engine,
            navigator,
            visibility,
            session,
            decoder,
            clock,
        })
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn navigator(&self) -> &SectionNavigator {
        &self.navigator
    }

    pub fn sections(&self) -> &[Section] {
        self.navigator.sections()
    }

    pub fn active_section(&self) -> &Section {
        self.navigator.active()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn visibility(&self) -> &VisibilityRules {
        &self.visibility
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn value(&self, key: &str) -> &FieldValue {
        self.session.value(key)
    }

    pub fn completion(&self) -> CompletionState {
        completion::recompute(&self.session, &self.registry, self.navigator.sections())
    }

    /// Parses raw input for a typed field and stores it.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<FieldChange, FormError> {
        let descriptor = self.editable(key)?;
        let value = descriptor.parse_input(raw)?;
        self.set_value(key, value)
    }

    /// Stores an already-typed value and runs dependent rules.
    pub fn set_value(&mut self, key: &str, value: FieldValue) -> Result<FieldChange, FormError> {
        let field = self.registry.key(key)?;
        let changed = self.session.set(field, value)?;
        let derived = if changed {
            debug!(field, "field changed");
            self.engine.on_field_changed(&mut self.session, field)
        } else {
            RecomputeReport::default()
        };
        Ok(FieldChange {
            field,
            changed,
            derived,
            completion: self.completion(),
        })
    }

    /// Replaces the attachment list of a file field.
    pub fn attach_files(&mut self, key: &str, files: Vec<FileRef>) -> Result<FieldChange, FormError> {
        let descriptor = self.editable(key)?;
        if descriptor.kind != FieldKind::File {
            return Err(FormError::InvalidValue {
                field: key.to_string(),
                reason: "field does not accept attachments".into(),
            });
        }
        let value = if files.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Files(files)
        };
        self.set_value(key, value)
    }

    pub fn clear_field(&mut self, key: &str) -> Result<FieldChange, FormError> {
        self.editable(key)?;
        self.set_value(key, FieldValue::Empty)
    }

    fn editable(&self, key: &str) -> Result<&FieldDescriptor, FormError> {
        let descriptor = self.registry.get(key)?;
        if descriptor.derived {
            return Err(FormError::InvalidValue {
                field: key.to_string(),
                reason: "value is computed automatically".into(),
            });
        }
        Ok(descriptor)
    }

    pub fn go_to(&mut self, section: &str) -> Result<Navigation, FormError> {
        self.navigator.go_to(section)
    }

    pub fn advance(&mut self) -> Result<Navigation, SectionValidationError> {
        self.navigator.advance(&self.registry, &self.session)
    }

    pub fn retreat(&mut self) -> Navigation {
        self.navigator.retreat()
    }

    pub fn validate_section(&self, section: &str) -> Result<Vec<&'static str>, FormError> {
        self.navigator
            .validate_section(section, &self.registry, &self.session)
    }

    /// Every empty required field, in section order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.navigator
            .sections()
            .iter()
            .flat_map(|section| section.missing_required(&self.registry, &self.session))
            .collect()
    }

    pub fn section_of(&self, field: &str) -> Option<&'static str> {
        self.navigator.section_of(field).map(|section| section.id)
    }

    /// Fields of a section as currently shown, with conditional fields
    /// filtered by their controlling answers.
    pub fn visible_fields(&self, section: &str) -> Result<Vec<&FieldDescriptor>, FormError> {
        let section = self.navigator.section(section)?;
        section
            .fields
            .iter()
            .filter(|key| self.visibility.is_visible(&self.session, key))
            .map(|key| self.registry.get(key))
            .collect()
    }

    /// Flat key to string map of the whole session.
    pub fn field_map(&self) -> std::collections::BTreeMap<String, String> {
        self.session.to_field_map()
    }

    /// Swaps in a restored session and rebuilds every derived value.
    pub fn load_session(&mut self, session: Session) -> RecomputeReport {
        self.session = session;
        let report = self.engine.recompute_all(&mut self.session);
        info!(updated = report.updated.len(), "session restored");
        report
    }

    pub fn recompute_all(&mut self) -> RecomputeReport {
        self.engine.recompute_all(&mut self.session)
    }

    /// Decodes the current identifier on demand, surfacing the error that
    /// the automatic rule only records.
    pub fn decode_identifier(&mut self) -> Result<VehicleDetails, FormError> {
        let vin = self.session.value(keys::VIN).to_plain();
        let details = self.decoder.decode(&vin)?;
        for (key, value) in [
            (keys::VEHICLE_MAKE, &details.make),
            (keys::VEHICLE_MODEL, &details.model),
            (keys::VEHICLE_YEAR, &details.year),
        ] {
            if self.session.set(key, FieldValue::text(value.clone()))? {
                self.engine.on_field_changed(&mut self.session, key);
            }
        }
        Ok(details)
    }

    /// Empties every field and returns to the first section.
    pub fn reset(&mut self) {
        self.session.clear();
        self.navigator.reset();
        info!("claim wizard reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use chrono::NaiveDate;

    fn wizard() -> ClaimWizard {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        ClaimWizard::new(Arc::new(clock)).unwrap()
    }

    #[test]
    fn mileage_entry_updates_derived_field_and_progress() {
        let mut wizard = wizard();
        wizard.set_field(keys::MILEAGE_PURCHASE, "10000").unwrap();
        let change = wizard.set_field(keys::CURRENT_MILEAGE, "15500").unwrap();

        assert_eq!(change.derived.updated, vec![keys::MILES_SINCE_PURCHASE]);
        assert_eq!(
            wizard.value(keys::MILES_SINCE_PURCHASE),
            &FieldValue::Number(5500.0)
        );
        assert_eq!(change.completion.completed_required, 2);
    }

    #[test]
    fn derived_fields_cannot_be_typed() {
        let mut wizard = wizard();
        assert!(matches!(
            wizard.set_field(keys::VEHICLE_MAKE, "Ford"),
            Err(FormError::InvalidValue { .. })
        ));
    }

    #[test]
    fn vin_entry_decodes_all_three_attributes() {
        let mut wizard = wizard();
        let change = wizard.set_field(keys::VIN, "2FTRX18W1HCA12345").unwrap();
        assert_eq!(change.derived.updated.len(), 3);
        assert_eq!(wizard.value(keys::VEHICLE_MODEL), &FieldValue::text("F-150"));
        assert_eq!(wizard.value(keys::VEHICLE_YEAR), &FieldValue::text("2017"));
    }

    #[test]
    fn explicit_decode_reports_bad_identifier() {
        let mut wizard = wizard();
        wizard.set_field(keys::VIN, "SHORT").unwrap();
        assert_eq!(
            wizard.decode_identifier().unwrap_err(),
            FormError::InvalidIdentifier { length: 5 }
        );
        assert_eq!(wizard.value(keys::VEHICLE_MAKE), &FieldValue::Empty);
    }

    #[test]
    fn conditional_field_appears_with_its_controller() {
        let mut wizard = wizard();
        let before = wizard.visible_fields("claim-details").unwrap();
        assert!(!before.iter().any(|field| field.key == keys::MODIFICATIONS_FOUND));

        wizard.set_field(keys::MODIFICATIONS, "yes").unwrap();
        let after = wizard.visible_fields("claim-details").unwrap();
        assert!(after.iter().any(|field| field.key == keys::MODIFICATIONS_FOUND));
    }

    #[test]
    fn attachments_only_go_to_file_fields() {
        let mut wizard = wizard();
        wizard
            .attach_files(keys::ATTACHMENTS, vec![FileRef::new("photo.jpg", 2048)])
            .unwrap();
        assert!(wizard.value(keys::ATTACHMENTS).is_file());
        assert!(wizard
            .attach_files(keys::VIN, vec![FileRef::new("photo.jpg", 1)])
            .is_err());
    }

    #[test]
    fn reset_clears_fields_and_navigation() {
        let mut wizard = wizard();
        wizard.set_field(keys::CLAIM_NUMBER, "CLM-1").unwrap();
        wizard.go_to("vehicle-info").unwrap();
        wizard.reset();
        assert_eq!(wizard.active_section().id, "dealer-info");
        assert_eq!(wizard.value(keys::CLAIM_NUMBER), &FieldValue::Empty);
        assert_eq!(wizard.completion().percentage, 0);
    }
}
