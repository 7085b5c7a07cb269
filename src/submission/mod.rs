pub mod address;
pub mod dispatch;
pub mod orchestrator;
pub mod payload;
pub mod render;

pub use address::AddressIssue;
pub use dispatch::{DispatchReceipt, Dispatcher, OutboundMessage, OutboxDispatcher, TransportSettings};
pub use orchestrator::{PendingDispatch, Preview, SubmissionOrchestrator, SubmissionState};
pub use payload::SubmissionPayload;
pub use render::{Artifact, DocumentLayout, DocumentRenderer, HtmlRenderer, PlainTextRenderer};
