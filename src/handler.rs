//! Invocation boundary.
//!
//! [`Handler::handle`] drives envelope parsing → document building → signed
//! write, and converts *every* outcome into a [`HandlerResponse`]:
//!
//! ```json
//! { "statusCode": 200, "body": "<store response body>" }
//! { "statusCode": 500, "body": "{\"error\":\"Failed to index document\",\"details\":\"...\"}" }
//! ```
//!
//! The handler never returns an error. Only failures before it is called
//! (unreadable input, bad configuration) surface as process-level errors.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::document::{build_document, Document, PartitionName};
use crate::envelope::{parse_envelope, InboundEvent, NotificationEnvelope};
use crate::error::{IndexError, IndexResult};
use crate::sigv4::CredentialProvider;
use crate::writer::{SignedWriter, StoreResponse, WriteRequest};

/// Fixed label of every failure body.
pub const ERROR_LABEL: &str = "Failed to index document";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn ok(body: String) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    pub fn failure(err: &IndexError) -> Self {
        Self {
            status_code: 500,
            body: json!({ "error": ERROR_LABEL, "details": err.to_string() }).to_string(),
        }
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone)]
pub struct Indexed {
    pub partition: PartitionName,
    pub message_id: String,
    pub topic_arn: Option<String>,
    pub response: StoreResponse,
}

pub struct Handler {
    config: Arc<Config>,
    writer: SignedWriter,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Handler {
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialProvider>,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> anyhow::Result<Self> {
        let writer = SignedWriter::new(
            &config.store,
            credentials,
            clock.clone(),
            diagnostics.clone(),
        )?;
        Ok(Self::with_writer(config, writer, clock, diagnostics))
    }

    pub fn with_writer(
        config: Config,
        writer: SignedWriter,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            writer,
            clock,
            diagnostics,
        }
    }

    /// Process one event. Never fails.
    pub async fn handle(&self, event: Value) -> HandlerResponse {
        self.diagnostics.emit(DiagnosticEvent::EventReceived {
            event: serde_json::to_string_pretty(&event).unwrap_or_else(|_| event.to_string()),
        });

        match self.index(event).await {
            Ok(indexed) => {
                self.diagnostics.emit(DiagnosticEvent::Indexed {
                    index: indexed.partition.to_string(),
                    message_id: indexed.message_id,
                    topic_arn: indexed.topic_arn,
                    status: indexed.response.status,
                });
                HandlerResponse::ok(indexed.response.body)
            }
            Err(err) => {
                self.diagnostics.emit(DiagnosticEvent::IndexFailed {
                    kind: err.kind(),
                    error: err.to_string(),
                });
                HandlerResponse::failure(&err)
            }
        }
    }

    /// Run the pipeline, propagating the first fatal error.
    pub async fn index(&self, event: Value) -> IndexResult<Indexed> {
        let (envelope, document, partition) = self.build(event)?;
        let response = self.writer.write(&partition, &document).await?;
        Ok(Indexed {
            partition,
            message_id: envelope.message_id,
            topic_arn: envelope.topic_arn,
            response,
        })
    }

    /// Everything up to (not including) signing. Used by `--dry-run`.
    pub fn plan(&self, event: Value) -> IndexResult<(PartitionName, String, WriteRequest)> {
        let (envelope, document, partition) = self.build(event)?;
        let request = self.writer.prepare(&partition, &document)?;
        Ok((partition, envelope.message_id, request))
    }

    fn build(&self, event: Value) -> IndexResult<(NotificationEnvelope, Document, PartitionName)> {
        let event: InboundEvent = serde_json::from_value(event)
            .map_err(|e| IndexError::MalformedEvent(e.to_string()))?;
        let envelope = parse_envelope(&event, self.diagnostics.as_ref())?;
        let (document, partition) = build_document(
            &envelope,
            self.clock.now(),
            &self.config.index.prefix,
            self.config.index.partition_timezone,
        );
        Ok((envelope, document, partition))
    }
}
