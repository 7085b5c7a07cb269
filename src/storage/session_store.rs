//! Saves and restores the in-progress claim as a flat string map.
//!
//! Only typed inputs are written. Attachments are never persisted and
//! derived outputs are rebuilt by the caller after a restore.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::StoreError;
use crate::form::registry::FieldRegistry;
use crate::form::session::Session;

use super::{KeyValueStore, Result, SESSION_KEY};

#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence").finish_non_exhaustive()
    }
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrites the single saved snapshot. Returns the serialized token.
    pub fn save(&self, session: &Session, registry: &FieldRegistry) -> Result<String> {
        let fields: BTreeMap<&str, String> = registry
            .fields()
            .filter(|descriptor| !descriptor.derived && !registry.is_file(descriptor.key))
            .map(|descriptor| (descriptor.key, session.value(descriptor.key).to_plain()))
            .collect();
        let token = serde_json::to_string(&fields)?;
        self.store.set(SESSION_KEY, &token)?;
        debug!(fields = fields.len(), "session saved");
        Ok(token)
    }

    /// Loads the saved snapshot. Missing or malformed data yields `None`.
    pub fn restore(&self, registry: &FieldRegistry) -> Option<Session> {
        match self.try_restore(registry) {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "discarding unreadable saved session");
                None
            }
        }
    }

    fn try_restore(&self, registry: &FieldRegistry) -> Result<Option<Session>> {
        let Some(raw) = self.store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let fields: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|err| StoreError::Decode(err.to_string()))?;

        let mut session = Session::new(registry);
        for (key, value) in fields {
            let Ok(descriptor) = registry.get(&key) else {
                debug!(key = %key, "ignoring unknown saved field");
                continue;
            };
            if descriptor.derived || registry.is_file(descriptor.key) {
                continue;
            }
            let text = match value {
                serde_json::Value::String(text) => text,
                serde_json::Value::Null => String::new(),
                serde_json::Value::Number(number) => number.to_string(),
                serde_json::Value::Bool(flag) => flag.to_string(),
                other => {
                    return Err(StoreError::Decode(format!(
                        "field `{key}` holds a nested value: {other}"
                    )))
                }
            };
            session
                .set(descriptor.key, descriptor.restore_input(&text))
                .map_err(|err| StoreError::Decode(err.to_string()))?;
        }
        Ok(Some(session))
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear(SESSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldDescriptor, FieldKind, FieldValue, FileRef, YesNo};
    use crate::storage::MemoryStore;

    fn registry() -> FieldRegistry {
        FieldRegistry::from_descriptors(vec![
            FieldDescriptor::new("claim-number", FieldKind::Text).required(),
            FieldDescriptor::new("acv", FieldKind::Number),
            FieldDescriptor::new("rideshare", FieldKind::Flag),
            FieldDescriptor::new("miles-since-purchase", FieldKind::Number).derived(),
            FieldDescriptor::new("attachments", FieldKind::File),
        ])
        .unwrap()
    }

    #[test]
    fn round_trip_excludes_files_and_derived_outputs() {
        let registry = registry();
        let store = Arc::new(MemoryStore::new());
        let persistence = SessionPersistence::new(store.clone());

        let mut session = Session::new(&registry);
        session.set("claim-number", FieldValue::text("CLM-9")).unwrap();
        session.set("acv", FieldValue::Number(12500.0)).unwrap();
        session.set("rideshare", FieldValue::Flag(YesNo::No)).unwrap();
        session.set("miles-since-purchase", FieldValue::Number(5.0)).unwrap();
        session
            .set("attachments", FieldValue::Files(vec![FileRef::new("a.pdf", 10)]))
            .unwrap();

        let token = persistence.save(&session, &registry).unwrap();
        assert!(!token.contains("attachments"));
        assert!(!token.contains("miles-since-purchase"));

        let restored = persistence.restore(&registry).unwrap();
        assert_eq!(restored.value("claim-number"), &FieldValue::text("CLM-9"));
        assert_eq!(restored.value("acv"), &FieldValue::Number(12500.0));
        assert_eq!(restored.value("rideshare"), &FieldValue::Flag(YesNo::No));
        assert_eq!(restored.value("attachments"), &FieldValue::Empty);
        assert_eq!(restored.value("miles-since-purchase"), &FieldValue::Empty);
    }

    #[test]
    fn malformed_snapshot_is_treated_as_absent() {
        let registry = registry();
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_KEY, "{not json").unwrap();
        let persistence = SessionPersistence::new(store.clone());
        assert!(persistence.restore(&registry).is_none());

        store.set(SESSION_KEY, "{\"acv\": {\"nested\": true}}").unwrap();
        assert!(persistence.restore(&registry).is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let registry = registry();
        let store = Arc::new(MemoryStore::new());
        store
            .set(SESSION_KEY, "{\"legacy-field\":\"x\",\"claim-number\":\"CLM-1\"}")
            .unwrap();
        let restored = SessionPersistence::new(store).restore(&registry).unwrap();
        assert_eq!(restored.value("claim-number"), &FieldValue::text("CLM-1"));
    }

    #[test]
    fn clear_removes_snapshot() {
        let registry = registry();
        let store = Arc::new(MemoryStore::new());
        let persistence = SessionPersistence::new(store);
        persistence.save(&Session::new(&registry), &registry).unwrap();
        persistence.clear().unwrap();
        assert!(persistence.restore(&registry).is_none());
    }
}
