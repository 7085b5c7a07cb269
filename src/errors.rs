use std::io;

use thiserror::Error;

use crate::submission::address::AddressIssue;

/// Failures raised while defining or mutating the form itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Field already registered: {0}")]
    DuplicateField(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Unknown section: {0}")]
    UnknownSection(String),
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Invalid vehicle identifier: expected 17 characters, got {length}")]
    InvalidIdentifier { length: usize },
    #[error("Derived rule for `{output}` would create a dependency cycle")]
    CyclicRule { output: String },
}

/// Refusal to leave a section whose required fields are still empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Section `{section}` has empty required fields: {}", missing.join(", "))]
pub struct SectionValidationError {
    pub section: &'static str,
    pub missing: Vec<&'static str>,
}

/// Persistence store failures. `Decode` never escapes the restore path.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Stored session is malformed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Document could not be rendered: {0}")]
    Failed(String),
}

/// External transport failure. Recoverable: the user may confirm again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Transport rejected the message: {0}")]
    Rejected(String),
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Collaborator failure kept on a failed submission until the next attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFailure {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Outcome of whole-form validation when the form is not ready to submit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValidationReport {
    /// Empty required fields, in section order.
    pub missing: Vec<&'static str>,
    /// Malformed recipient or cc addresses, one entry per address.
    pub invalid_addresses: Vec<AddressIssue>,
    /// Section holding the first offending field.
    pub first_section: Option<&'static str>,
}

impl FormValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.invalid_addresses.is_empty()
    }

    /// Every offending field id in report order, without repeats.
    pub fn offending_fields(&self) -> Vec<&'static str> {
        let mut fields = self.missing.clone();
        for issue in &self.invalid_addresses {
            if !fields.contains(&issue.field) {
                fields.push(issue.field);
            }
        }
        fields
    }
}

impl std::fmt::Display for FormValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing required fields: {}", self.missing.join(", ")));
        }
        for issue in &self.invalid_addresses {
            parts.push(issue.to_string());
        }
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Form is incomplete: {0}")]
    Validation(FormValidationReport),
    #[error("A submission is already being dispatched")]
    AlreadyDispatching,
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
}
