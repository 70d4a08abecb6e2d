//! Inbound SNS event and the notification envelope extracted from it.
//!
//! Only the first record of an event is consumed. The envelope always has
//! an identifier (the upstream `MessageId`, or a freshly generated v4 UUID)
//! and always has a decoded message: a payload that is not valid JSON
//! degrades to `{}` and is reported through [`Diagnostics`].

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::{IndexError, IndexResult, PayloadDecodeError};

/// Event as delivered by the SNS trigger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Sns", default)]
    pub sns: Option<SnsNotification>,
}

/// The notification sub-structure of a record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsNotification {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub topic_arn: Option<String>,
}

/// Normalized view of the first notification in an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEnvelope {
    pub message_id: String,
    pub raw_message: String,
    pub message: Value,
    pub topic_arn: Option<String>,
}

/// Extract the envelope from the first record of `event`.
///
/// # Errors
///
/// Returns [`IndexError::MalformedEvent`] if the event has no records or
/// the first record has no `Sns` section.
pub fn parse_envelope(
    event: &InboundEvent,
    diagnostics: &dyn Diagnostics,
) -> IndexResult<NotificationEnvelope> {
    let record = event
        .records
        .first()
        .ok_or_else(|| IndexError::MalformedEvent("event contains no records".to_string()))?;
    let sns = record.sns.as_ref().ok_or_else(|| {
        IndexError::MalformedEvent("first record has no Sns notification".to_string())
    })?;

    let message_id = match sns.message_id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_message_id(),
    };

    let message = decode_payload(&sns.message).unwrap_or_else(|err| {
        diagnostics.emit(DiagnosticEvent::PayloadDecodeFailed {
            message_id: message_id.clone(),
            error: err.to_string(),
        });
        Value::Object(Map::new())
    });

    Ok(NotificationEnvelope {
        message_id,
        raw_message: sns.message.clone(),
        message,
        topic_arn: sns.topic_arn.clone(),
    })
}

/// Parse the embedded message as JSON.
pub fn decode_payload(raw: &str) -> Result<Value, PayloadDecodeError> {
    Ok(serde_json::from_str(raw)?)
}

fn generate_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
