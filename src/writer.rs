//! Signed upsert of a document into the store.
//!
//! A write goes through three types, in order:
//!
//! ```text
//! WriteRequest ──sign()──▶ SignedRequest ──send()──▶ WriteResult
//!  (mutable)               (read-only)               Success | Failure
//! ```
//!
//! [`WriteRequest::sign`] consumes the request, so nothing can touch the
//! headers or body once the signature (which covers a hash of the body)
//! has been computed.
//!
//! # Classification
//!
//! | Outcome | Result |
//! |---------|--------|
//! | status in `[200, 300)` | [`WriteResult::Success`] |
//! | any other status | [`WriteFailure::Rejected`] |
//! | connect / TLS / DNS / body read error | [`WriteFailure::Transport`] |
//!
//! One attempt per invocation. There are no retries at this layer.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{StoreConfig, StoreEndpoint};
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::document::{Document, PartitionName};
use crate::error::{IndexError, IndexResult};
use crate::sigv4::{self, CredentialProvider, Credentials, SigningInput, SigningScope};

/// An unsigned `PUT /<partition>/_doc/<id>` request.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    method: Method,
    host: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl WriteRequest {
    /// Serialize `document` and address it to `partition`, using the
    /// document id as the store id.
    pub fn put_document(
        host: &str,
        partition: &PartitionName,
        document: &Document,
    ) -> IndexResult<Self> {
        let body = serde_json::to_vec(document)?;
        Ok(Self {
            method: Method::PUT,
            host: host.to_string(),
            path: document_path(partition, document.id()),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Apply the SigV4 transform and freeze the request.
    pub fn sign(
        mut self,
        creds: &Credentials,
        scope: SigningScope<'_>,
        now: DateTime<Utc>,
    ) -> SignedRequest {
        let input = SigningInput {
            method: self.method.as_str(),
            host: &self.host,
            path: &self.path,
            headers: &self.headers,
            body: &self.body,
        };
        let auth_headers = sigv4::sign(&input, creds, scope, now);
        self.headers.extend(auth_headers);
        SignedRequest { inner: self }
    }

    /// JSON rendering for `--dry-run`.
    pub fn preview(&self) -> Value {
        let body: Value = serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()));
        json!({
            "method": self.method.as_str(),
            "host": self.host,
            "path": self.path,
            "headers": self.headers.iter().map(|(k, v)| json!([k, v])).collect::<Vec<_>>(),
            "body": body,
        })
    }
}

/// `/<partition>/_doc/<id>`, each segment percent-encoded.
pub fn document_path(partition: &PartitionName, id: &str) -> String {
    format!(
        "/{}/_doc/{}",
        sigv4::uri_encode(partition.as_str()),
        sigv4::uri_encode(id)
    )
}

/// A request whose signature has been computed. Read-only.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    inner: WriteRequest,
}

impl SignedRequest {
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.inner.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.inner.body
    }
}

/// Status and fully buffered body returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug)]
pub enum WriteResult {
    Success(StoreResponse),
    Failure(WriteFailure),
}

#[derive(Debug)]
pub enum WriteFailure {
    /// The store answered with a non-2xx status.
    Rejected(StoreResponse),
    /// The store could not be reached, or the response could not be read.
    Transport(reqwest::Error),
}

impl WriteResult {
    pub fn classify(status: u16, body: String) -> Self {
        let response = StoreResponse { status, body };
        if (200..300).contains(&status) {
            WriteResult::Success(response)
        } else {
            WriteResult::Failure(WriteFailure::Rejected(response))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Success(_))
    }

    pub fn into_result(self) -> IndexResult<StoreResponse> {
        match self {
            WriteResult::Success(response) => Ok(response),
            WriteResult::Failure(WriteFailure::Rejected(StoreResponse { status, body })) => {
                Err(IndexError::StoreRejection { status, body })
            }
            WriteResult::Failure(WriteFailure::Transport(err)) => Err(IndexError::Transport(err)),
        }
    }
}

/// Builds, signs and sends document writes to one store.
pub struct SignedWriter {
    client: reqwest::Client,
    endpoint: StoreEndpoint,
    region: String,
    service: String,
    credentials: Arc<dyn CredentialProvider>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl SignedWriter {
    /// Fails only if the store endpoint cannot be parsed.
    pub fn new(
        store: &StoreConfig,
        credentials: Arc<dyn CredentialProvider>,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: store.endpoint()?,
            region: store.region.clone(),
            service: store.service.clone(),
            credentials,
            clock,
            diagnostics,
        })
    }

    /// Build the unsigned request for `document`.
    pub fn prepare(
        &self,
        partition: &PartitionName,
        document: &Document,
    ) -> IndexResult<WriteRequest> {
        WriteRequest::put_document(&self.endpoint.authority, partition, document)
    }

    /// Resolve credentials and sign `request` at the current instant.
    pub async fn sign(&self, request: WriteRequest) -> IndexResult<SignedRequest> {
        let creds = self.credentials.credentials().await?;
        let scope = SigningScope {
            region: &self.region,
            service: &self.service,
        };
        Ok(request.sign(&creds, scope, self.clock.now()))
    }

    /// Transmit a signed request and classify the outcome.
    pub async fn send(&self, request: SignedRequest) -> WriteResult {
        let WriteRequest {
            method,
            path,
            headers,
            body,
            ..
        } = request.inner;
        let url = format!("{}{}", self.endpoint.base_url(), path);

        let mut req_builder = self.client.request(method, &url);
        for (name, value) in &headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        let resp = match req_builder.body(body).send().await {
            Ok(resp) => resp,
            Err(err) => return self.transport_failure(err),
        };

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(err) => return self.transport_failure(err),
        };

        self.diagnostics.emit(DiagnosticEvent::StoreResponded {
            status,
            body: body.clone(),
        });
        WriteResult::classify(status, body)
    }

    /// Prepare, sign and send in one go.
    pub async fn write(
        &self,
        partition: &PartitionName,
        document: &Document,
    ) -> IndexResult<StoreResponse> {
        let request = self.prepare(partition, document)?;
        let signed = self.sign(request).await?;
        self.send(signed).await.into_result()
    }

    fn transport_failure(&self, err: reqwest::Error) -> WriteResult {
        self.diagnostics.emit(DiagnosticEvent::TransportFailed {
            error: err.to_string(),
        });
        WriteResult::Failure(WriteFailure::Transport(err))
    }
}
