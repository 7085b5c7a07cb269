//! Submission lifecycle.
//!
//! `Editing -> AwaitingConfirmation -> Dispatching -> {Acknowledged, Failed}`.
//! A render failure during `confirm` also lands in `Failed`.
//! `confirm` hands the caller a [`PendingDispatch`] and leaves the machine in
//! `Dispatching` until [`SubmissionOrchestrator::complete`] reports the
//! transport outcome, so at most one dispatch is in flight per session.

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{DispatchError, FormValidationReport, SubmissionError, SubmissionFailure};
use crate::form::layout::keys;
use crate::form::wizard::ClaimWizard;
use crate::storage::SessionPersistence;
use crate::submission::address::{check_list, check_single, split_list};
use crate::submission::dispatch::{DispatchReceipt, Dispatcher, OutboundMessage, TransportSettings};
use crate::submission::payload::SubmissionPayload;
use crate::submission::render::{Artifact, DocumentRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Editing,
    AwaitingConfirmation { recipient: String },
    Dispatching { submission_id: Uuid },
    Acknowledged(DispatchReceipt),
    Failed { reason: SubmissionFailure },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Editing => "editing",
            SubmissionState::AwaitingConfirmation { .. } => "awaiting confirmation",
            SubmissionState::Dispatching { .. } => "dispatching",
            SubmissionState::Acknowledged(_) => "acknowledged",
            SubmissionState::Failed { .. } => "failed",
        }
    }
}

/// Rendered document plus the validation state it was rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub artifact: Artifact,
    pub report: FormValidationReport,
}

impl Preview {
    pub fn is_ready(&self) -> bool {
        self.report.is_clean()
    }
}

/// A confirmed submission waiting on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDispatch {
    pub payload: SubmissionPayload,
    pub artifact: Artifact,
    pub message: OutboundMessage,
}

#[derive(Debug, Clone)]
pub struct SubmissionOrchestrator {
    state: SubmissionState,
    transport: TransportSettings,
}

impl SubmissionOrchestrator {
    pub fn new(transport: TransportSettings) -> Self {
        Self {
            state: SubmissionState::Editing,
            transport,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Whole-form check: required fields in section order, then the
    /// recipient address, then every malformed cc entry.
    pub fn validate(&self, wizard: &ClaimWizard) -> FormValidationReport {
        let missing = wizard.missing_required();
        let mut invalid_addresses = check_single(
            keys::RECIPIENT_EMAIL,
            &wizard.value(keys::RECIPIENT_EMAIL).to_plain(),
        );
        invalid_addresses.extend(check_list(
            keys::CC_EMAILS,
            &wizard.value(keys::CC_EMAILS).to_plain(),
        ));

        let mut report = FormValidationReport {
            missing,
            invalid_addresses,
            first_section: None,
        };
        report.first_section = report
            .offending_fields()
            .first()
            .and_then(|field| wizard.section_of(field));
        report
    }

    /// Validates the form and, when clean, waits for confirmation.
    /// Returns the resolved recipient for display.
    pub fn request_submit(&mut self, wizard: &ClaimWizard) -> Result<String, SubmissionError> {
        match self.state {
            SubmissionState::Editing
            | SubmissionState::AwaitingConfirmation { .. }
            | SubmissionState::Failed { .. } => {}
            _ => return Err(self.invalid("request submission")),
        }
        let report = self.validate(wizard);
        if !report.is_clean() {
            info!(offending = ?report.offending_fields(), "submission refused");
            return Err(SubmissionError::Validation(report));
        }
        let recipient = wizard.value(keys::RECIPIENT_EMAIL).to_plain().trim().to_string();
        self.transition(SubmissionState::AwaitingConfirmation {
            recipient: recipient.clone(),
        });
        Ok(recipient)
    }

    pub fn build_payload(&self, wizard: &ClaimWizard) -> SubmissionPayload {
        SubmissionPayload::new(
            wizard.clock().now(),
            wizard.value(keys::RECIPIENT_EMAIL).to_plain().trim().to_string(),
            split_list(&wizard.value(keys::CC_EMAILS).to_plain()),
            wizard.field_map(),
        )
    }

    /// Renders the document without touching the submission state. An
    /// incomplete form still renders; the report says what is missing.
    pub fn preview(
        &self,
        wizard: &ClaimWizard,
        renderer: &dyn DocumentRenderer,
    ) -> Result<Preview, SubmissionError> {
        let report = self.validate(wizard);
        let payload = self.build_payload(wizard);
        let artifact = renderer.render(&payload)?;
        Ok(Preview { artifact, report })
    }

    /// Assembles and renders the submission, then enters `Dispatching`.
    ///
    /// Accepted while awaiting confirmation or after a failed attempt.
    pub fn confirm(
        &mut self,
        wizard: &ClaimWizard,
        renderer: &dyn DocumentRenderer,
    ) -> Result<PendingDispatch, SubmissionError> {
        match self.state {
            SubmissionState::AwaitingConfirmation { .. } | SubmissionState::Failed { .. } => {}
            SubmissionState::Dispatching { .. } => return Err(SubmissionError::AlreadyDispatching),
            _ => return Err(self.invalid("confirm")),
        }
        let report = self.validate(wizard);
        if !report.is_clean() {
            return Err(SubmissionError::Validation(report));
        }

        let payload = self.build_payload(wizard);
        let artifact = match renderer.render(&payload) {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(error = %err, "submission document could not be rendered");
                self.transition(SubmissionState::Failed {
                    reason: err.clone().into(),
                });
                return Err(err.into());
            }
        };
        let message = OutboundMessage::compose(&self.transport, &payload, &artifact);
        self.transition(SubmissionState::Dispatching {
            submission_id: payload.id,
        });
        Ok(PendingDispatch {
            payload,
            artifact,
            message,
        })
    }

    /// Records the transport outcome of the in-flight dispatch.
    pub fn complete(
        &mut self,
        outcome: Result<DispatchReceipt, DispatchError>,
    ) -> Result<&SubmissionState, SubmissionError> {
        if !matches!(self.state, SubmissionState::Dispatching { .. }) {
            return Err(self.invalid("complete a dispatch"));
        }
        match outcome {
            Ok(receipt) => {
                info!(submission = %receipt.submission_id, reference = %receipt.reference, "submission acknowledged");
                self.transition(SubmissionState::Acknowledged(receipt));
            }
            Err(reason) => {
                warn!(error = %reason, "submission dispatch failed");
                self.transition(SubmissionState::Failed {
                    reason: reason.into(),
                });
            }
        }
        Ok(&self.state)
    }

    /// `confirm`, send and `complete` in one call.
    pub async fn submit(
        &mut self,
        wizard: &ClaimWizard,
        renderer: &dyn DocumentRenderer,
        dispatcher: &dyn Dispatcher,
    ) -> Result<DispatchReceipt, SubmissionError> {
        let pending = self.confirm(wizard, renderer)?;
        let outcome = dispatcher.send(&pending.message).await;
        self.complete(outcome.clone())?;
        Ok(outcome?)
    }

    pub fn cancel(&mut self) -> Result<(), SubmissionError> {
        if !matches!(self.state, SubmissionState::AwaitingConfirmation { .. }) {
            return Err(self.invalid("cancel"));
        }
        self.transition(SubmissionState::Editing);
        Ok(())
    }

    /// Leaves a failed attempt so the user can edit before retrying.
    pub fn resume_editing(&mut self) -> Result<(), SubmissionError> {
        if !matches!(self.state, SubmissionState::Failed { .. }) {
            return Err(self.invalid("resume editing"));
        }
        self.transition(SubmissionState::Editing);
        Ok(())
    }

    /// Starts a new claim after an acknowledged submission. This is the only
    /// path that discards session data.
    pub fn reset(
        &mut self,
        wizard: &mut ClaimWizard,
        persistence: Option<&SessionPersistence>,
    ) -> Result<(), SubmissionError> {
        if !matches!(self.state, SubmissionState::Acknowledged(_)) {
            return Err(self.invalid("reset"));
        }
        wizard.reset();
        if let Some(persistence) = persistence {
            if let Err(err) = persistence.clear() {
                warn!(error = %err, "saved session could not be cleared");
            }
        }
        self.transition(SubmissionState::Editing);
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> SubmissionError {
        SubmissionError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn transition(&mut self, next: SubmissionState) {
        info!(from = self.state.name(), to = next.name(), "submission state changed");
        self.state = next;
    }
}
