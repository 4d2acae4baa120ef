//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hedera_common::{AccountId, HederaError, RequestOptions, Result};
use hedera_network::{AddressBook, NetworkName, NodeBackoffConfig};
use serde::{Deserialize, Serialize};

/// Which nodes the client talks to.
///
/// Written either as a preset name (`network = "testnet"`) or as an inline
/// address book (`[client.network]` with `"0.0.3" = ["host:50211"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkConfig {
    Named(NetworkName),
    Custom(AddressBook),
}

impl NetworkConfig {
    pub fn address_book(&self) -> AddressBook {
        match self {
            NetworkConfig::Named(name) => name.address_book(),
            NetworkConfig::Custom(book) => book.clone(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig::Named(NetworkName::Testnet)
    }
}

/// Attempt budget and inter-attempt delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_attempts: u32,
    /// First delay between attempts. Doubles on each retry.
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Deadline of each gRPC call.
    pub grpc_deadline_ms: Option<u64>,
    /// Deadline of a whole execution, backoff included.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_backoff_ms: 250,
            max_backoff_ms: 8_000,
            grpc_deadline_ms: Some(10_000),
            request_timeout_ms: Some(120_000),
        }
    }
}

/// How long a failing node is avoided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeBackoffSettings {
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for NodeBackoffSettings {
    fn default() -> Self {
        Self {
            min_backoff_ms: 8_000,
            max_backoff_ms: 60 * 60 * 1000,
        }
    }
}

impl From<&NodeBackoffSettings> for NodeBackoffConfig {
    fn from(settings: &NodeBackoffSettings) -> Self {
        NodeBackoffConfig {
            min_backoff: Duration::from_millis(settings.min_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

/// Everything the execution engine honours.
///
/// # Example config (TOML)
/// ```toml
/// [client]
/// network = "testnet"
/// node_account_ids = ["0.0.3", "0.0.4"]
/// transient_internal_patterns = ["rst_stream", "rst stream"]
/// address_book_refresh_secs = 300
///
/// [client.execution]
/// max_attempts = 10
/// min_backoff_ms = 250
/// max_backoff_ms = 8000
/// grpc_deadline_ms = 10000
/// request_timeout_ms = 120000
///
/// [client.node_backoff]
/// min_backoff_ms = 8000
/// max_backoff_ms = 3600000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    /// Nodes requests go to unless they pin their own.
    pub node_account_ids: Option<Vec<AccountId>>,
    pub execution: ExecutionConfig,
    pub node_backoff: NodeBackoffSettings,
    /// Substrings of an INTERNAL status message that mark it as transient.
    /// Matched case-insensitively.
    pub transient_internal_patterns: Vec<String>,
    pub address_book_refresh_secs: Option<u64>,
    /// JSON address book that replaces `network` when set.
    pub address_book_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            node_account_ids: None,
            execution: ExecutionConfig::default(),
            node_backoff: NodeBackoffSettings::default(),
            transient_internal_patterns: vec!["rst_stream".to_string(), "rst stream".to_string()],
            address_book_refresh_secs: None,
            address_book_path: None,
        }
    }
}

const ENV_PREFIX: &str = "HEDERA_";
const CONFIG_KEY: &str = "client";

impl ClientConfig {
    /// Defaults for the given preset network.
    pub fn for_network(name: NetworkName) -> Self {
        Self {
            network: NetworkConfig::Named(name),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file, with `HEDERA_` environment
    /// variables taking precedence over the file.
    ///
    /// Nested keys are separated by `__`, so
    /// `HEDERA_CLIENT__EXECUTION__MAX_ATTEMPTS=3` sets
    /// `[client.execution] max_attempts`.
    ///
    /// # Arguments
    /// * `path` - Path to a `.toml` file
    ///
    /// # Returns
    /// The validated configuration
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {}
            Some(ext) => {
                return Err(HederaError::InvalidConfig(format!(
                    "unsupported config file format: {}, use .toml",
                    ext
                )));
            }
            None => {
                return Err(HederaError::InvalidConfig(
                    "config file must have a .toml extension".to_string(),
                ));
            }
        }

        Self::extract(Self::figment().merge(Toml::file(path)).merge(Self::env()))
    }

    /// Defaults overridden by `HEDERA_` environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::extract(Self::figment().merge(Self::env()))
    }

    /// [`from_path`](Self::from_path) when a path is given, otherwise
    /// [`from_env`](Self::from_env).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::from_env(),
        }
    }

    fn figment() -> Figment {
        Figment::from(Serialized::default(CONFIG_KEY, ClientConfig::default()))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: ClientConfig = figment
            .extract_inner(CONFIG_KEY)
            .map_err(|e| HederaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        ExecutionSettings::from(&self.execution).validate()?;

        let node_backoff = &self.node_backoff;
        if node_backoff.min_backoff_ms == 0 {
            return Err(HederaError::InvalidConfig(
                "node_backoff.min_backoff_ms must be positive".to_string(),
            ));
        }
        if node_backoff.max_backoff_ms < node_backoff.min_backoff_ms {
            return Err(HederaError::InvalidConfig(format!(
                "node_backoff.max_backoff_ms ({}) is below min_backoff_ms ({})",
                node_backoff.max_backoff_ms, node_backoff.min_backoff_ms
            )));
        }

        if self.address_book_path.is_none() && self.network.address_book().is_empty() {
            return Err(HederaError::InvalidConfig("network has no nodes".to_string()));
        }
        if matches!(&self.node_account_ids, Some(ids) if ids.is_empty()) {
            return Err(HederaError::InvalidConfig(
                "node_account_ids is set but empty".to_string(),
            ));
        }
        if self.transient_internal_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(HederaError::InvalidConfig(
                "transient_internal_patterns must not contain empty patterns".to_string(),
            ));
        }
        if self.address_book_refresh_secs == Some(0) {
            return Err(HederaError::InvalidConfig(
                "address_book_refresh_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// The initial address book: the file at `address_book_path` if set,
    /// otherwise `network`.
    pub fn address_book(&self) -> Result<AddressBook> {
        match &self.address_book_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                let book = AddressBook::from_json(&json)?;
                if book.is_empty() {
                    return Err(HederaError::InvalidConfig(format!(
                        "address book {} has no nodes",
                        path.display()
                    )));
                }
                Ok(book)
            }
            None => Ok(self.network.address_book()),
        }
    }

    pub fn node_backoff(&self) -> NodeBackoffConfig {
        NodeBackoffConfig::from(&self.node_backoff)
    }

    pub fn address_book_refresh(&self) -> Option<Duration> {
        self.address_book_refresh_secs.map(Duration::from_secs)
    }
}

/// Execution budget with every duration resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSettings {
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub grpc_deadline: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl From<&ExecutionConfig> for ExecutionSettings {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            min_backoff: Duration::from_millis(config.min_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            grpc_deadline: config.grpc_deadline_ms.map(Duration::from_millis),
            request_timeout: config.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl ExecutionSettings {
    /// Applies a request's overrides on top of these settings and validates
    /// the result.
    pub fn with_overrides(&self, options: &RequestOptions) -> Result<Self> {
        let settings = Self {
            max_attempts: options.max_attempts.unwrap_or(self.max_attempts),
            min_backoff: options.min_backoff.unwrap_or(self.min_backoff),
            max_backoff: options.max_backoff.unwrap_or(self.max_backoff),
            grpc_deadline: options.grpc_deadline.or(self.grpc_deadline),
            request_timeout: options.request_timeout.or(self.request_timeout),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(HederaError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.min_backoff.is_zero() {
            return Err(HederaError::InvalidConfig(
                "min_backoff must be positive".to_string(),
            ));
        }
        if self.max_backoff < self.min_backoff {
            return Err(HederaError::InvalidConfig(format!(
                "max_backoff ({}ms) is below min_backoff ({}ms)",
                self.max_backoff.as_millis(),
                self.min_backoff.as_millis()
            )));
        }
        if self.grpc_deadline.is_some_and(|d| d.is_zero()) {
            return Err(HederaError::InvalidConfig(
                "grpc_deadline must be positive".to_string(),
            ));
        }
        if self.request_timeout.is_some_and(|d| d.is_zero()) {
            return Err(HederaError::InvalidConfig(
                "request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
