//! Error taxonomy for the indexing pipeline.
//!
//! Every variant of [`IndexError`] aborts the invocation and is converted
//! into a `500` response by the [`handler`](crate::handler). Payload decode
//! failures are deliberately *not* part of this enum: they are recovered
//! locally by the envelope parser and only reported as diagnostics.

use thiserror::Error;

/// A fatal failure raised by one of the pipeline stages.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The inbound event does not carry the expected record shape.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Signing credentials could not be resolved from the environment.
    #[error("Failed to resolve signing credentials: {0}")]
    Credentials(#[from] anyhow::Error),

    /// The document could not be serialized into a request body.
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Network, TLS or DNS failure while talking to the store.
    #[error("Error indexing document: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("Failed to index document. Status code: {status}. Response: {body}")]
    StoreRejection { status: u16, body: String },
}

impl IndexError {
    /// Short machine-readable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::MalformedEvent(_) => "malformed_event",
            IndexError::Credentials(_) => "credentials",
            IndexError::Serialize(_) => "serialize",
            IndexError::Transport(_) => "transport",
            IndexError::StoreRejection { .. } => "store_rejection",
        }
    }
}

/// The embedded message is not valid JSON. Never fatal.
#[derive(Error, Debug)]
#[error("Failed to parse SNS message: {0}")]
pub struct PayloadDecodeError(#[from] pub serde_json::Error);

pub type IndexResult<T> = Result<T, IndexError>;
