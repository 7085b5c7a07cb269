#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use claim_wizard::form::{keys, ClaimWizard};
use claim_wizard::time::FixedClock;
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates an isolated directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 2).expect("valid date")
}

/// Wizard pinned to 2024-05-02 with the simulated decoder.
pub fn wizard() -> ClaimWizard {
    ClaimWizard::new(Arc::new(FixedClock::at_date(today()))).expect("claim layout builds")
}

/// Every required field, in section order.
pub const REQUIRED_VALUES: &[(&str, &str)] = &[
    ("selling-dealer", "Sunrise Motors"),
    (keys::ADJUSTER, "Dana Reyes"),
    ("current-dealer", "Sunrise Motors"),
    ("street-address", "1 Main St"),
    ("city", "Springfield"),
    ("state", "IL"),
    ("zip", "62701"),
    (keys::CONTRACT_FIRST_NAME, "Sam"),
    (keys::CONTRACT_LAST_NAME, "Okafor"),
    (keys::CLAIM_NUMBER, "CLM-1001"),
    ("authorization-type", "Standard"),
    (keys::PURCHASE_DATE, "2024-01-15"),
    (keys::VIN, "2FTRX18W1HCA12345"),
    (keys::MILEAGE_PURCHASE, "12000"),
    (keys::CURRENT_MILEAGE, "18500"),
    ("claim-submission-date", "2024-05-01"),
    ("claim-entry-date", "2024-05-02"),
    ("contract-type", "Powertrain"),
    ("failed-components", "Water pump"),
    ("tech-findings", "Bearing failure, coolant leak at weep hole"),
    ("repair-cost", "840"),
    ("adjuster-recommendation", "Approve"),
    (keys::RECIPIENT_EMAIL, "claims@example.com"),
];

pub fn fill_required(wizard: &mut ClaimWizard) {
    for (field, value) in REQUIRED_VALUES {
        wizard.set_field(field, value).expect("required field accepts value");
    }
}

pub fn filled_wizard() -> ClaimWizard {
    let mut wizard = wizard();
    fill_required(&mut wizard);
    wizard
}
