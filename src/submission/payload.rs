use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::form::layout::keys;

const FALLBACK_SUBJECT: &str = "New Submission";
const FALLBACK_SENDER: &str = "User";

/// Everything handed to the render and dispatch collaborators for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub recipient: String,
    pub cc: Vec<String>,
    pub fields: BTreeMap<String, String>,
}

impl SubmissionPayload {
    pub fn new(
        submitted_at: DateTime<Utc>,
        recipient: String,
        cc: Vec<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitted_at,
            recipient,
            cc,
            fields,
        }
    }

    /// Field value, with blank values read as absent.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn subject(&self) -> String {
        format!(
            "Claim Form: {}",
            self.field(keys::CLAIM_NUMBER).unwrap_or(FALLBACK_SUBJECT)
        )
    }

    /// Template parameters for the outbound message.
    pub fn message_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(
            "name".to_string(),
            self.field(keys::ADJUSTER).unwrap_or(FALLBACK_SENDER).to_string(),
        );
        for key in [
            keys::CLAIM_NUMBER,
            keys::CONTRACT_FIRST_NAME,
            keys::CONTRACT_LAST_NAME,
        ] {
            params.insert(key.to_string(), self.field(key).unwrap_or_default().to_string());
        }
        params.insert(
            "submission-date".to_string(),
            self.submitted_at.format("%Y-%m-%d").to_string(),
        );
        params
    }
}
