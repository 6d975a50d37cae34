//! Configuration management for the stockroom dashboard.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::SourceError;
use crate::source::{InventorySource, MockSource, RestSource};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which [`InventorySource`] backs the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// In-memory demo records
    #[default]
    Mock,
    /// HTTP backend at `api_url`
    Rest,
}

impl FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "rest" | "http" => Ok(Self::Rest),
            other => Err(SourceError::Config(format!("unknown source kind `{other}`"))),
        }
    }
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source implementation
    pub kind: SourceKind,
    /// Base URL of the inventory backend (REST only)
    pub api_url: String,
    /// Per-request timeout in seconds (REST only)
    pub request_timeout: u64,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data source configuration
    pub source: SourceConfig,
    /// Log filter directive (trace, debug, info, warn, error)
    pub log_level: String,
    /// How long to wait for the batch load, in seconds
    pub load_timeout: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable                    | Default                     |
    /// |-----------------------------|-----------------------------|
    /// | `STOCKROOM_SOURCE`          | `mock`                      |
    /// | `STOCKROOM_API_URL`         | `http://localhost:5000/api` |
    /// | `STOCKROOM_REQUEST_TIMEOUT` | `10`                        |
    /// | `STOCKROOM_LOAD_TIMEOUT`    | `30`                        |
    /// | `RUST_LOG`                  | `stockroom=info`            |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Unset or unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            source: SourceConfig {
                kind: lookup("STOCKROOM_SOURCE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                api_url: lookup("STOCKROOM_API_URL")
                    .unwrap_or_else(|| "http://localhost:5000/api".to_string()),
                request_timeout: lookup("STOCKROOM_REQUEST_TIMEOUT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "stockroom=info".to_string()),
            load_timeout: lookup("STOCKROOM_LOAD_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Batch load timeout
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout)
    }

    /// Build the configured data source
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the REST client cannot be built.
    pub fn build_source(&self) -> Result<Arc<dyn InventorySource>, SourceError> {
        match self.source.kind {
            SourceKind::Mock => {
                tracing::info!("Using in-memory demo inventory");
                Ok(Arc::new(MockSource::seeded()))
            },
            SourceKind::Rest => {
                tracing::info!(api_url = %self.source.api_url, "Using REST inventory backend");
                let source = RestSource::new(
                    self.source.api_url.clone(),
                    Duration::from_secs(self.source.request_timeout),
                )?;
                Ok(Arc::new(source))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);
        assert_eq!(config.source.kind, SourceKind::Mock);
        assert_eq!(config.source.api_url, "http://localhost:5000/api");
        assert_eq!(config.source.request_timeout, 10);
        assert_eq!(config.log_level, "stockroom=info");
        assert_eq!(config.load_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("STOCKROOM_SOURCE", "REST"),
            ("STOCKROOM_API_URL", "https://inventory.internal/api"),
            ("STOCKROOM_REQUEST_TIMEOUT", "3"),
            ("STOCKROOM_LOAD_TIMEOUT", "5"),
            ("RUST_LOG", "debug"),
        ]);
        assert_eq!(config.source.kind, SourceKind::Rest);
        assert_eq!(config.source.api_url, "https://inventory.internal/api");
        assert_eq!(config.source.request_timeout, 3);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.load_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("STOCKROOM_SOURCE", "carrier-pigeon"),
            ("STOCKROOM_LOAD_TIMEOUT", "soon"),
        ]);
        assert_eq!(config.source.kind, SourceKind::Mock);
        assert_eq!(config.load_timeout, 30);
    }

    #[test]
    fn source_kind_parsing() {
        assert_eq!("mock".parse::<SourceKind>().unwrap(), SourceKind::Mock);
        assert_eq!(" http ".parse::<SourceKind>().unwrap(), SourceKind::Rest);
        assert!(matches!(
            "ftp".parse::<SourceKind>(),
            Err(SourceError::Config(_))
        ));
    }

    #[tokio::test]
    async fn mock_source_is_seeded() {
        let source = config_from(&[]).build_source().unwrap();
        assert_eq!(source.load_items().await.unwrap().len(), 5);
    }
}
