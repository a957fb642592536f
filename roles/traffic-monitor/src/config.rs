use ext_config::{Config, File, FileFormat};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use thiserror::Error;
use tracing::info;
use traffic_stats::{MonitoredSet, PollConfig, TagFilter};
use v2ray_stats_client::{StatsClientConfig, DEFAULT_SERVICE_NAME};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ext_config::ConfigError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings of the traffic monitor, read from a TOML file. Every section and
/// every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub monitor: MonitorTags,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Where the StatsService lives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_address")]
    pub address: String,
    /// Fully qualified gRPC service name; differs between v2ray and xray builds
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_api_address(),
            service_name: default_service_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryConfig {
    /// Server-side substring filter; empty queries every counter
    #[serde(default)]
    pub pattern: String,
    /// Zero counters on the server after each read
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_retry_backoff_secs() -> u64 {
    10
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

/// Inbound and outbound tags to report. Users are always reported.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MonitorTags {
    #[serde(default)]
    pub inbounds: Vec<String>,
    #[serde(default)]
    pub outbounds: Vec<String>,
    /// Report every inbound tag, ignoring `inbounds`
    #[serde(default)]
    pub all_inbounds: bool,
    /// Report every outbound tag, ignoring `outbounds`
    #[serde(default)]
    pub all_outbounds: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpConfig {
    /// JSON view of the latest report; disabled when unset
    #[serde(default)]
    pub listen_address: Option<String>,
    #[serde(default = "default_staleness_threshold_secs")]
    pub staleness_threshold_secs: u64,
}

fn default_staleness_threshold_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            staleness_threshold_secs: default_staleness_threshold_secs(),
        }
    }
}

impl MonitorConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::Invalid(format!("non UTF-8 path {:?}", path)))?;
        if !path.exists() {
            info!("Config file {} not found, using defaults", path_str);
        }

        let config = Config::builder()
            .add_source(File::new(path_str, FileFormat::Toml).required(false))
            .build()?
            .try_deserialize::<MonitorConfig>()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize::<MonitorConfig>()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.address.trim().is_empty() {
            return Err(ConfigError::Invalid("api.address must not be empty".into()));
        }
        if self.api.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api.service_name must not be empty".into(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be > 0".into()));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid("poll.interval_secs must be > 0".into()));
        }
        if self.poll.retry_backoff_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.retry_backoff_secs must be > 0".into(),
            ));
        }
        if let Some(address) = &self.http.listen_address {
            if address.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "http.listen_address must not be empty when set".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            pattern: self.query.pattern.clone(),
            reset: self.query.reset,
            interval: Duration::from_secs(self.poll.interval_secs),
            retry_backoff: Duration::from_secs(self.poll.retry_backoff_secs),
        }
    }

    pub fn monitored_set(&self) -> MonitoredSet {
        let filter = |all: bool, tags: &[String]| {
            if all {
                TagFilter::All
            } else {
                TagFilter::only(tags.iter().cloned())
            }
        };
        MonitoredSet {
            inbound: filter(self.monitor.all_inbounds, &self.monitor.inbounds),
            outbound: filter(self.monitor.all_outbounds, &self.monitor.outbounds),
        }
    }

    pub fn client_config(&self) -> StatsClientConfig {
        StatsClientConfig {
            address: self.api.address.clone(),
            service_name: self.api.service_name.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }
}
