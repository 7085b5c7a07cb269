use std::collections::{BTreeSet, HashMap};

use crate::errors::FormError;
use crate::form::field::{FieldDescriptor, FieldKind};

/// Closed set of every field bound to a session, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field once. A second registration of the same key fails.
    pub fn register(&mut self, descriptor: FieldDescriptor) -> Result<(), FormError> {
        if self.index.contains_key(descriptor.key) {
            return Err(FormError::DuplicateField(descriptor.key.to_string()));
        }
        self.index.insert(descriptor.key, self.fields.len());
        self.fields.push(descriptor);
        Ok(())
    }

    /// Builds a registry from descriptors, failing on the first duplicate.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, FormError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    pub fn get(&self, key: &str) -> Result<&FieldDescriptor, FormError> {
        self.index
            .get(key)
            .map(|idx| &self.fields[*idx])
            .ok_or_else(|| FormError::UnknownField(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Resolves a borrowed key to the registry's static id.
    pub fn key(&self, key: &str) -> Result<&'static str, FormError> {
        self.get(key).map(|descriptor| descriptor.key)
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.get(key).map(|field| field.required).unwrap_or(false)
    }

    pub fn all_required(&self) -> BTreeSet<&'static str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.key)
            .collect()
    }

    pub fn is_file(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(field) if field.kind == FieldKind::File)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
