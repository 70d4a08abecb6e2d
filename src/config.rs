//! Process-wide configuration.
//!
//! Read once at startup, either from a TOML file ([`load_config`]) or from
//! environment variables ([`Config::from_env`]), and immutable afterwards.
//!
//! ```toml
//! [store]
//! host = "search-logs.eu-west-1.es.amazonaws.com"
//! # endpoint_url = "http://localhost:9200"   # local OpenSearch
//! region = "eu-west-1"
//! service = "es"
//!
//! [index]
//! prefix = "sns-events"
//! partition_timezone = "utc"
//! ```

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Store hostname, without scheme.
    pub host: String,
    /// Overrides scheme and authority of the write URL (e.g. a local
    /// OpenSearch on plain HTTP). The signature still covers this authority.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_service")]
    pub service: String,
}

fn default_region() -> String {
    "eu-west-1".to_string()
}
fn default_service() -> String {
    "es".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub prefix: String,
    #[serde(default)]
    pub partition_timezone: PartitionTimezone,
}

/// Which calendar the partition date is taken from.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartitionTimezone {
    #[default]
    Utc,
    /// The process-local time zone (`TZ`).
    Local,
}

impl FromStr for PartitionTimezone {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(PartitionTimezone::Utc),
            "local" => Ok(PartitionTimezone::Local),
            other => bail!(
                "Unknown partition timezone: '{}'. Must be utc or local.",
                other
            ),
        }
    }
}

/// Scheme and authority the write request is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    pub scheme: String,
    pub authority: String,
}

impl StoreEndpoint {
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

impl StoreConfig {
    /// Resolve the endpoint, preferring `endpoint_url` over `host`.
    ///
    /// The authority is taken from the parsed URL, so a default port
    /// (`:443` for https, `:80` for http) is dropped exactly as it is from
    /// the `Host` header sent on the wire.
    pub fn endpoint(&self) -> Result<StoreEndpoint> {
        let (scheme, rest) = match self.endpoint_url {
            Some(ref url) if url.trim().starts_with("http://") => ("http", strip_scheme(url)),
            Some(ref url) => ("https", strip_scheme(url)),
            None => ("https", strip_scheme(&self.host)),
        };
        let url = Url::parse(&format!("{}://{}", scheme, rest))
            .with_context(|| format!("Invalid store endpoint: '{}'", rest))?;
        let host = url
            .host_str()
            .with_context(|| format!("Store endpoint has no host: '{}'", rest))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(StoreEndpoint {
            scheme: scheme.to_string(),
            authority,
        })
    }
}

fn strip_scheme(url: &str) -> String {
    url.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

impl Config {
    /// Build the configuration from `BASE_URL`, `PREFIX`, `STORE_ENDPOINT_URL`,
    /// `AWS_REGION`, `STORE_SERVICE` and `PARTITION_TIMEZONE`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("BASE_URL").context("BASE_URL environment variable not set")?;
        let prefix = lookup("PREFIX").context("PREFIX environment variable not set")?;
        let partition_timezone = match lookup("PARTITION_TIMEZONE") {
            Some(tz) => tz.parse()?,
            None => PartitionTimezone::default(),
        };

        let config = Config {
            store: StoreConfig {
                host,
                endpoint_url: lookup("STORE_ENDPOINT_URL"),
                region: lookup("AWS_REGION").unwrap_or_else(default_region),
                service: lookup("STORE_SERVICE").unwrap_or_else(default_service),
            },
            index: IndexConfig {
                prefix,
                partition_timezone,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if strip_scheme(&self.store.host).is_empty() {
            bail!("store.host must not be empty");
        }
        self.store.endpoint()?;
        if self.index.prefix.trim().is_empty() {
            bail!("index.prefix must not be empty");
        }
        if self.index.prefix.contains('/') {
            bail!("index.prefix must not contain '/'");
        }
        if self.store.region.trim().is_empty() {
            bail!("store.region must not be empty");
        }
        if self.store.service.trim().is_empty() {
            bail!("store.service must not be empty");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
