//! The warranty-claim form: its six sections, every field, and the rules
//! that tie them together.

use std::sync::Arc;

use crate::errors::FormError;
use crate::form::derive::DerivedValueEngine;
use crate::form::field::{FieldDescriptor, FieldKind};
use crate::form::registry::FieldRegistry;
use crate::form::rules::{
    elapsed_days_rule, mileage_delta_rule, vehicle_decode_rule, VehicleAttribute, VehicleDecoder,
};
use crate::form::section::Section;
use crate::form::visibility::{RevealRule, VisibilityRules};
use crate::time::Clock;

/// Field ids referenced by code outside the layout tables.
pub mod keys {
    pub const ADJUSTER: &str = "adjuster";
    pub const CONTRACT_FIRST_NAME: &str = "contract-first-name";
    pub const CONTRACT_LAST_NAME: &str = "contract-last-name";
    pub const CLAIM_NUMBER: &str = "claim-number";
    pub const PURCHASE_DATE: &str = "purchase-date";
    pub const VIN: &str = "vin";
    pub const VEHICLE_MAKE: &str = "vehicle-make";
    pub const VEHICLE_MODEL: &str = "vehicle-model";
    pub const VEHICLE_YEAR: &str = "vehicle-year";
    pub const MILEAGE_PURCHASE: &str = "mileage-purchase";
    pub const CURRENT_MILEAGE: &str = "current-mileage";
    pub const MILES_SINCE_PURCHASE: &str = "miles-since-purchase";
    pub const DAYS_SINCE_PURCHASE: &str = "days-since-purchase";
    pub const MODIFICATIONS: &str = "modifications";
    pub const MODIFICATIONS_FOUND: &str = "modifications-found";
    pub const INSPECTION_ORDERED: &str = "inspection-ordered";
    pub const INSPECTOR_FINDINGS: &str = "inspector-findings";
    pub const ATTACHMENTS: &str = "attachments";
    pub const RECIPIENT_EMAIL: &str = "recipient-email";
    pub const CC_EMAILS: &str = "cc-emails";
}

/// Fields that belong to the session but not to the printed document.
pub const NON_DOCUMENT_FIELDS: &[&str] = &[keys::ATTACHMENTS, keys::RECIPIENT_EMAIL, keys::CC_EMAILS];

use FieldKind::{Date, Email, EmailList, File, Flag, Number, Text};

struct Spec {
    key: &'static str,
    kind: FieldKind,
    required: bool,
    derived: bool,
}

const fn req(key: &'static str, kind: FieldKind) -> Spec {
    Spec {
        key,
        kind,
        required: true,
        derived: false,
    }
}

const fn opt(key: &'static str, kind: FieldKind) -> Spec {
    Spec {
        key,
        kind,
        required: false,
        derived: false,
    }
}

const fn out(key: &'static str, kind: FieldKind) -> Spec {
    Spec {
        key,
        kind,
        required: false,
        derived: true,
    }
}

const DEALER_INFO: &[Spec] = &[
    req("selling-dealer", Text),
    req(keys::ADJUSTER, Text),
    req("current-dealer", Text),
    req("street-address", Text),
    opt("street-address-2", Text),
    req("city", Text),
    req("state", Text),
    req("zip", Text),
    opt("agent-first-name", Text),
    opt("agent-last-name", Text),
];

const CONTRACT_INFO: &[Spec] = &[
    req(keys::CONTRACT_FIRST_NAME, Text),
    req(keys::CONTRACT_LAST_NAME, Text),
    opt("reinsured-contract", Flag),
    req(keys::CLAIM_NUMBER, Text),
    opt("previous-claims", Text),
    opt("acv", Number),
    opt("lienholder", Text),
    opt("pending-contract", Flag),
    req("authorization-type", Text),
];

const VEHICLE_INFO: &[Spec] = &[
    req(keys::PURCHASE_DATE, Date),
    req(keys::VIN, Text),
    out(keys::VEHICLE_MAKE, Text),
    out(keys::VEHICLE_MODEL, Text),
    out(keys::VEHICLE_YEAR, Text),
    req(keys::MILEAGE_PURCHASE, Number),
    req(keys::CURRENT_MILEAGE, Number),
    out(keys::MILES_SINCE_PURCHASE, Number),
    opt("maintenance-records", Flag),
    opt("vehicle-surcharges", Text),
    opt("tsb-checked", Flag),
    opt("power-sports", Flag),
    opt("apex-surcharges", Text),
];

const CLAIM_DETAILS: &[Spec] = &[
    req("claim-submission-date", Date),
    req("claim-entry-date", Date),
    out(keys::DAYS_SINCE_PURCHASE, Number),
    opt("warranties-checked", Flag),
    opt("rideshare", Flag),
    opt("abuse-neglect", Flag),
    opt(keys::MODIFICATIONS, Flag),
    opt(keys::MODIFICATIONS_FOUND, Text),
    req("contract-type", Text),
];

const INSPECTION_FINDINGS: &[Spec] = &[
    req("failed-components", Text),
    req("tech-findings", Text),
    opt(keys::INSPECTION_ORDERED, Flag),
    opt(keys::INSPECTOR_FINDINGS, Text),
    opt(keys::ATTACHMENTS, File),
];

const COST_RECOMMENDATION: &[Spec] = &[
    req("repair-cost", Number),
    opt("goodwill-cost", Number),
    opt("adjusted-cost", Number),
    opt("price-adjustment-explanation", Text),
    req("adjuster-recommendation", Text),
    opt("comments", Text),
    opt("inspection-link", Text),
    opt("accuracy-check", Flag),
    opt("director-reviewed", Flag),
    opt("review-hour", Text),
    opt("review-minute", Text),
    opt("review-ampm", Text),
    req(keys::RECIPIENT_EMAIL, Email),
    opt(keys::CC_EMAILS, EmailList),
];

const SECTIONS: &[(&str, &str, &[Spec])] = &[
    ("dealer-info", "Dealer Information", DEALER_INFO),
    ("contract-info", "Contract Information", CONTRACT_INFO),
    ("vehicle-info", "Vehicle Information", VEHICLE_INFO),
    ("claim-details", "Claim Details", CLAIM_DETAILS),
    ("inspection-findings", "Inspection & Findings", INSPECTION_FINDINGS),
    ("cost-recommendation", "Cost & Recommendation", COST_RECOMMENDATION),
];

/// Static description of a form: fields, sections and reveal rules.
#[derive(Debug, Clone)]
pub struct FormLayout {
    pub registry: FieldRegistry,
    pub sections: Vec<Section>,
    pub visibility: VisibilityRules,
}

/// Builds the warranty-claim layout.
pub fn claim_layout() -> Result<FormLayout, FormError> {
    let mut registry = FieldRegistry::new();
    let mut sections = Vec::with_capacity(SECTIONS.len());

    for (id, title, specs) in SECTIONS {
        for spec in specs.iter() {
            let mut descriptor = FieldDescriptor::new(spec.key, spec.kind);
            if spec.required {
                descriptor = descriptor.required();
            }
            if spec.derived {
                descriptor = descriptor.derived();
            }
            registry.register(descriptor)?;
        }
        let fields = specs.iter().map(|spec| spec.key).collect();
        sections.push(Section::new(id, title, fields));
    }

    let visibility = VisibilityRules::new(vec![
        RevealRule::new(keys::MODIFICATIONS, keys::MODIFICATIONS_FOUND),
        RevealRule::new(keys::INSPECTION_ORDERED, keys::INSPECTOR_FINDINGS),
    ]);

    Ok(FormLayout {
        registry,
        sections,
        visibility,
    })
}

/// Registers the mileage, elapsed-days and vehicle-decode rules.
pub fn register_claim_rules(
    engine: &mut DerivedValueEngine,
    registry: &FieldRegistry,
    clock: Arc<dyn Clock>,
    decoder: Arc<dyn VehicleDecoder>,
) -> Result<(), FormError> {
    engine.register_rule(
        registry,
        mileage_delta_rule(
            keys::MILEAGE_PURCHASE,
            keys::CURRENT_MILEAGE,
            keys::MILES_SINCE_PURCHASE,
        ),
    )?;
    engine.register_rule(
        registry,
        elapsed_days_rule(keys::PURCHASE_DATE, keys::DAYS_SINCE_PURCHASE, clock),
    )?;
    for (output, attribute) in [
        (keys::VEHICLE_MAKE, VehicleAttribute::Make),
        (keys::VEHICLE_MODEL, VehicleAttribute::Model),
        (keys::VEHICLE_YEAR, VehicleAttribute::Year),
    ] {
        engine.register_rule(
            registry,
            vehicle_decode_rule(keys::VIN, output, attribute, decoder.clone()),
        )?;
    }
    Ok(())
}
