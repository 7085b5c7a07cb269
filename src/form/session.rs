use std::collections::BTreeMap;

use crate::errors::FormError;
use crate::form::field::FieldValue;
use crate::form::registry::FieldRegistry;

/// Complete in-memory state of one in-progress claim.
///
/// Every registered field is present as a key, possibly `Empty`. The active
/// section lives in [`crate::form::section::SectionNavigator`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    values: BTreeMap<&'static str, FieldValue>,
}

impl Session {
    /// Fresh session with every registered field empty.
    pub fn new(registry: &FieldRegistry) -> Self {
        Self {
            values: registry
                .keys()
                .map(|key| (key, FieldValue::Empty))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Value of a field, treating unknown keys as empty.
    pub fn value(&self, key: &str) -> &FieldValue {
        static EMPTY: FieldValue = FieldValue::Empty;
        self.values.get(key).unwrap_or(&EMPTY)
    }

    pub fn is_filled(&self, key: &str) -> bool {
        self.value(key).is_filled()
    }

    /// Overwrites a field. Returns whether the stored value changed.
    pub fn set(&mut self, key: &str, value: FieldValue) -> Result<bool, FormError> {
        let slot = self
            .values
            .get_mut(key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        Ok(true)
    }

    /// Empties every field while keeping the key set intact.
    pub fn clear(&mut self) {
        for value in self.values.values_mut() {
            *value = FieldValue::Empty;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    /// Flat key→string map, the shape consumed by renderers and the store.
    pub fn to_field_map(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_plain()))
            .collect()
    }
}
