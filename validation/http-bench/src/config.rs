//! Configuration loading and management.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use bench_core::{ProtocolVersion, SessionConfig, TransportSettings};
use serde::{Deserialize, Serialize};

/// Benchmark configuration, loaded from a YAML scenario or built from flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Target of every GET request.
    pub uri: String,
    /// Number of workers, each with its own connection.
    pub concurrency: usize,
    /// Total number of requests to issue.
    pub requests: usize,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

fn default_name() -> String {
    "unnamed".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl BenchConfig {
    /// Configuration for a one-off run from command-line flags.
    pub fn quick(uri: impl Into<String>, concurrency: usize, requests: usize) -> Self {
        Self {
            name: "quick".to_string(),
            description: "Ad-hoc run".to_string(),
            uri: uri.into(),
            concurrency,
            requests,
            keep_alive: false,
            protocol_version: ProtocolVersion::default(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: None,
        }
    }

    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let config: BenchConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be > 0");
        }
        if self.requests == 0 {
            anyhow::bail!("requests must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be > 0");
        }
        reqwest::Url::parse(&self.uri).with_context(|| format!("invalid uri '{}'", self.uri))?;
        Ok(())
    }

    /// Engine configuration for this benchmark.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(&self.uri, self.concurrency, self.requests).transport(TransportSettings {
            keep_alive: self.keep_alive,
            protocol: self.protocol_version,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
        })
    }
}
