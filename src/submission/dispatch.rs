use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::DispatchError;
use crate::submission::payload::SubmissionPayload;
use crate::submission::render::Artifact;
use crate::time::Clock;
use crate::utils::tmp_path;

/// Opaque transport identifiers configured at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub service_id: String,
    pub template_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub file_name: String,
    pub media_type: String,
    pub content: String,
}

/// Everything the transport needs to deliver one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub submission_id: Uuid,
    pub service_id: String,
    pub template_id: String,
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub params: BTreeMap<String, String>,
    pub attachment: MessageAttachment,
}

impl OutboundMessage {
    pub fn compose(
        settings: &TransportSettings,
        payload: &SubmissionPayload,
        artifact: &Artifact,
    ) -> Self {
        Self {
            submission_id: payload.id,
            service_id: settings.service_id.clone(),
            template_id: settings.template_id.clone(),
            to: payload.recipient.clone(),
            cc: payload.cc.clone(),
            subject: payload.subject(),
            params: payload.message_params(),
            attachment: MessageAttachment {
                file_name: artifact.file_name.clone(),
                media_type: artifact.media_type.to_string(),
                content: artifact.as_text(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub submission_id: Uuid,
    pub accepted_at: DateTime<Utc>,
    /// Transport-specific reference, e.g. an outbox file path.
    pub reference: String,
}

/// Asynchronous delivery of a composed message.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<DispatchReceipt, DispatchError>;
}

/// Writes each message as a JSON file into an outbox directory.
#[derive(Clone)]
pub struct OutboxDispatcher {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OutboxDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxDispatcher")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl OutboxDispatcher {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, submission_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", submission_id))
    }
}

#[async_trait]
impl Dispatcher for OutboxDispatcher {
    async fn send(&self, message: &OutboundMessage) -> Result<DispatchReceipt, DispatchError> {
        if message.service_id.trim().is_empty() || message.template_id.trim().is_empty() {
            return Err(DispatchError::Rejected(
                "service and template identifiers must be configured".into(),
            ));
        }
        let unavailable = |err: std::io::Error| DispatchError::Unavailable(err.to_string());
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(unavailable)?;
        let json = serde_json::to_string_pretty(message)
            .map_err(|err| DispatchError::Rejected(err.to_string()))?;
        let path = self.path_for(message.submission_id);
        let tmp = tmp_path(&path);
        tokio::fs::write(&tmp, json).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, &path).await.map_err(unavailable)?;
        info!(path = %path.display(), to = %message.to, "submission written to outbox");
        Ok(DispatchReceipt {
            submission_id: message.submission_id,
            accepted_at: self.clock.now(),
            reference: path.display().to_string(),
        })
    }
}
