use std::sync::Arc;

use chrono::NaiveTime;

use crate::errors::FormError;
use crate::form::derive::DerivedRule;
use crate::form::field::FieldValue;
use crate::time::Clock;

const VIN_LENGTH: usize = 17;
const FALLBACK_MODEL_YEAR: &str = "2020";

const MODEL_YEARS: &[(char, &str)] = &[
    ('A', "2010"),
    ('B', "2011"),
    ('C', "2012"),
    ('D', "2013"),
    ('E', "2014"),
    ('F', "2015"),
    ('G', "2016"),
    ('H', "2017"),
    ('J', "2018"),
    ('K', "2019"),
    ('L', "2020"),
    ('M', "2021"),
    ('N', "2022"),
    ('P', "2023"),
    ('R', "2024"),
];

/// `max(0, current - purchase)` once both readings are non-negative numbers.
pub fn mileage_delta_rule(
    purchase: &'static str,
    current: &'static str,
    output: &'static str,
) -> DerivedRule {
    DerivedRule::new(output, [purchase, current], move |session| {
        let reading = |key: &str| session.value(key).as_number().filter(|value| *value >= 0.0);
        Ok(match (reading(purchase), reading(current)) {
            (Some(start), Some(now)) => Some(FieldValue::Number((now - start).max(0.0))),
            _ => None,
        })
    })
}

/// Whole days between the purchase date and now, rounded up.
///
/// "Now" is read from the clock on every evaluation, so the value moves as
/// days pass.
pub fn elapsed_days_rule(
    purchase_date: &'static str,
    output: &'static str,
    clock: Arc<dyn Clock>,
) -> DerivedRule {
    DerivedRule::new(output, [purchase_date], move |session| {
        let Some(date) = session.value(purchase_date).as_date() else {
            return Ok(None);
        };
        let purchased = date.and_time(NaiveTime::default()).and_utc();
        let elapsed = (clock.now() - purchased).num_milliseconds().unsigned_abs();
        const DAY_MS: u64 = 24 * 60 * 60 * 1000;
        let days = elapsed.div_ceil(DAY_MS);
        Ok(Some(FieldValue::Number(days as f64)))
    })
}

/// Vehicle attributes resolved from an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDetails {
    pub make: String,
    pub model: String,
    pub year: String,
}

/// Pluggable identifier lookup. A real decode service implements this.
pub trait VehicleDecoder: Send + Sync {
    fn decode(&self, vin: &str) -> Result<VehicleDetails, FormError>;
}

/// Offline stand-in that maps the first character to a make/model and the
/// tenth character to a model year.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedDecoder;

impl VehicleDecoder for SimulatedDecoder {
    fn decode(&self, vin: &str) -> Result<VehicleDetails, FormError> {
        let vin = vin.trim();
        let chars: Vec<char> = vin.chars().collect();
        if chars.len() != VIN_LENGTH {
            return Err(FormError::InvalidIdentifier {
                length: chars.len(),
            });
        }

        let (make, model) = match chars[0].to_ascii_uppercase() {
            '1' | '4' | '5' => ("Chevrolet", "Silverado"),
            '2' => ("Ford", "F-150"),
            '3' => ("Dodge", "Ram"),
            'J' => ("Jeep", "Wrangler"),
            'W' => ("Mercedes-Benz", "C-Class"),
            _ => ("Toyota", "Camry"),
        };

        let year = MODEL_YEARS
            .iter()
            .find(|(code, _)| *code == chars[9])
            .map(|(_, year)| *year)
            .unwrap_or(FALLBACK_MODEL_YEAR);

        Ok(VehicleDetails {
            make: make.into(),
            model: model.into(),
            year: year.into(),
        })
    }
}

/// Which attribute of a decoded vehicle a rule writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleAttribute {
    Make,
    Model,
    Year,
}

impl VehicleAttribute {
    fn pick(self, details: VehicleDetails) -> String {
        match self {
            VehicleAttribute::Make => details.make,
            VehicleAttribute::Model => details.model,
            VehicleAttribute::Year => details.year,
        }
    }
}

/// One rule per decoded attribute; each writes its own output field.
pub fn vehicle_decode_rule(
    vin: &'static str,
    output: &'static str,
    attribute: VehicleAttribute,
    decoder: Arc<dyn VehicleDecoder>,
) -> DerivedRule {
    DerivedRule::new(output, [vin], move |session| {
        let value = session.value(vin);
        if !value.is_filled() {
            return Ok(None);
        }
        let details = decoder.decode(&value.to_plain())?;
        Ok(Some(FieldValue::Text(attribute.pick(details))))
    })
}
