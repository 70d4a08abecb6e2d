//! Diagnostic events emitted by the pipeline.
//!
//! Pipeline stages never call a logger directly. They report a
//! [`DiagnosticEvent`] to an injected [`Diagnostics`] sink:
//!
//! - [`TracingDiagnostics`] forwards events to `tracing` (production).
//! - [`RecordingDiagnostics`] keeps them in memory so tests can assert on
//!   what was reported without capturing stderr.

use std::sync::Mutex;

/// Something worth reporting while processing an event.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// An event arrived at the handler. `event` is the pretty-printed input.
    EventReceived { event: String },
    /// The embedded message was not valid JSON and was replaced by `{}`.
    PayloadDecodeFailed { message_id: String, error: String },
    /// The store answered (any status).
    StoreResponded { status: u16, body: String },
    /// The store could not be reached.
    TransportFailed { error: String },
    /// The document was written.
    Indexed {
        index: String,
        message_id: String,
        topic_arn: Option<String>,
        status: u16,
    },
    /// The invocation failed; `kind` is [`IndexError::kind`](crate::error::IndexError::kind).
    IndexFailed { kind: &'static str, error: String },
}

/// Sink for [`DiagnosticEvent`]s.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::EventReceived { event } => {
                tracing::debug!(%event, "Received event");
            }
            DiagnosticEvent::PayloadDecodeFailed { message_id, error } => {
                tracing::warn!(%message_id, %error, "Failed to parse SNS message");
            }
            DiagnosticEvent::StoreResponded { status, body } => {
                tracing::info!(status, %body, "Store responded");
            }
            DiagnosticEvent::TransportFailed { error } => {
                tracing::error!(%error, "Error indexing document");
            }
            DiagnosticEvent::Indexed {
                index,
                message_id,
                topic_arn,
                status,
            } => {
                tracing::info!(
                    %index,
                    %message_id,
                    topic_arn = topic_arn.as_deref().unwrap_or("-"),
                    status,
                    "Document indexed successfully"
                );
            }
            DiagnosticEvent::IndexFailed { kind, error } => {
                tracing::error!(kind, %error, "Failed to index document");
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, event: DiagnosticEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
