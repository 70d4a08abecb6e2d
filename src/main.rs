//! # SNS Indexer CLI (`sns-indexer`)
//!
//! Runs the indexing handler once on an SNS event read from a file or
//! stdin and prints the handler response as JSON on stdout.
//!
//! ## Usage
//!
//! ```bash
//! # configuration from BASE_URL / PREFIX / AWS_REGION ...
//! sns-indexer handle --event event.json
//!
//! # configuration from a TOML file, event on stdin
//! cat event.json | sns-indexer --config ./config/indexer.toml handle
//!
//! # show the request that would be sent, without signing or sending it
//! sns-indexer --config ./config/indexer.toml handle --event event.json --dry-run
//!
//! # print today's index name
//! sns-indexer partition
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sns_indexer::clock::{Clock, SystemClock};
use sns_indexer::config::{self, Config};
use sns_indexer::diagnostics::TracingDiagnostics;
use sns_indexer::document::PartitionName;
use sns_indexer::handler::{Handler, HandlerResponse};
use sns_indexer::sigv4::EnvCredentialProvider;
use sns_indexer::telemetry::{init_telemetry, LogFormat, TelemetryConfig};

/// SNS Indexer — write SNS notifications into a date-partitioned
/// OpenSearch index with SigV4-signed requests.
#[derive(Parser)]
#[command(name = "sns-indexer", version)]
struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// When omitted, configuration is read from `BASE_URL`, `PREFIX`,
    /// `STORE_ENDPOINT_URL`, `AWS_REGION`, `STORE_SERVICE` and
    /// `PARTITION_TIMEZONE`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index one SNS event.
    Handle {
        /// Event JSON file. Reads stdin when omitted or `-`.
        #[arg(long)]
        event: Option<PathBuf>,

        /// Print the unsigned write request instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the index name a document would be written to right now.
    Partition,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        log_level: cli.log_level.clone(),
        format: cli.log_format,
    })?;

    let cfg = match cli.config {
        Some(ref path) => config::load_config(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Handle { event, dry_run } => {
            let event = read_event(event.as_deref())?;
            let handler = Handler::new(
                cfg,
                Arc::new(EnvCredentialProvider),
                Arc::new(SystemClock),
                Arc::new(TracingDiagnostics),
            )?;

            let output = if dry_run {
                match handler.plan(event) {
                    Ok((partition, message_id, request)) => json!({
                        "partition": partition.as_str(),
                        "message_id": message_id,
                        "request": request.preview(),
                    }),
                    Err(err) => serde_json::to_value(HandlerResponse::failure(&err))?,
                }
            } else {
                serde_json::to_value(handler.handle(event).await)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Partition => {
            let partition = PartitionName::for_instant(
                &cfg.index.prefix,
                &SystemClock.now(),
                cfg.index.partition_timezone,
            );
            println!("{}", partition);
        }
    }

    Ok(())
}

fn read_event(path: Option<&Path>) -> Result<Value> {
    let content = match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read event file: {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read event from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Event is not valid JSON")
}
