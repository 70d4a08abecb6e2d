//! # SNS Indexer
//!
//! Writes one SNS notification per invocation into a date-partitioned
//! OpenSearch / Elasticsearch index, authenticated with AWS SigV4.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ InboundEvent │──▶│   Envelope   │──▶│   Document   │──▶│  Signed  │──▶ store
//! │  (Records)   │   │ id + payload │   │ + partition  │   │  Writer  │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────┘
//!                                                               │
//!                         HandlerResponse { 200 | 500 } ◀───────┘
//! ```
//!
//! The write is `PUT /<prefix>-<YYYY.MM.DD>/_doc/<MessageId>`, so replaying
//! the same notification overwrites the same document.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML / environment configuration |
//! | [`clock`] | Time source |
//! | [`envelope`] | SNS event parsing and payload decoding |
//! | [`document`] | Document assembly and partition naming |
//! | [`sigv4`] | AWS Signature V4 and credential providers |
//! | [`writer`] | Request construction, transmission, classification |
//! | [`handler`] | Invocation boundary |
//! | [`diagnostics`] | Injected logging capability |
//! | [`error`] | Error taxonomy |
//! | [`telemetry`] | `tracing` subscriber setup |

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod sigv4;
pub mod telemetry;
pub mod writer;
