//! TOML configuration for the bridge.
//!
//! The bridge is started with a single argument, the path to this file
//! (`/srv/config/config.toml` in the container image).  Example:
//!
//! ```toml
//! log_level = "info"
//!
//! [source]
//! username = "gbridge-u42"
//! password = "secret"
//! topic_prefix = "gBridge/u42/"
//!
//! [sink]
//! username = "adafruit-user"
//! password = "aio_key"
//! topic = "adafruit-user/feeds/rf"
//!
//! [tls]
//! ca_file = "/etc/ssl/cert.pem"
//!
//! [[devices]]
//! id = "d2756"
//! address = "FFF0FFFF01"
//! name = "living room lamp"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent.  Only credentials and topics are
//! mandatory; broker hosts and ports default to the public gBridge and
//! Adafruit IO endpoints.  Mandatory fields still default to empty so that
//! [`BridgeSettings::validate`] reports a missing value as
//! [`ConfigError::Invalid`] naming the field.
//!
//! Passwords are never serialized back out.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::registry::{DeviceEntry, DeviceRegistry, RegistryError};

/// Shortest keep-alive the bridge accepts; brokers commonly reject less.
pub const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed correctly but holds an unusable value.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    /// The `[[devices]]` table could not be turned into a registry.
    #[error("invalid device table: {0}")]
    Registry(#[from] RegistryError),
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// ── Config schema types ───────────────────────────────────────────────────────

/// A credential that never appears in `Debug` output, logs or serialized
/// settings.
#[derive(Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value. Only the MQTT option builder should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeSettings {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// gBridge broker that publishes device commands.
    pub source: SourceConfig,
    /// Adafruit IO broker that receives tristate codes.
    pub sink: SinkConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    /// RF sockets. Empty means the built-in table.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Connection settings for the gBridge (source) broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "default_source_host")]
    pub host: String,
    #[serde(default = "default_mqtts_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Secret,
    /// Topic prefix ending where the device segment starts, e.g. `gBridge/u42/`.
    #[serde(default)]
    pub topic_prefix: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_true")]
    pub tls: bool,
}

/// Connection settings for the Adafruit IO (sink) broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SinkConfig {
    #[serde(default = "default_sink_host")]
    pub host: String,
    #[serde(default = "default_mqtts_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Secret,
    /// Feed topic the tristate codes are published to.
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_true")]
    pub tls: bool,
}

/// TLS trust settings shared by both broker connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TlsConfig {
    /// PEM bundle of trusted root certificates.
    #[serde(default = "default_ca_file")]
    pub ca_file: PathBuf,
}

/// One `[[devices]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    pub id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Broker connection parameters common to source and sink.
///
/// Infrastructure code builds MQTT options from this view so it does not need
/// to know which side of the bridge it is connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: Secret,
    pub keep_alive_secs: u64,
    pub tls: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_source_host() -> String {
    "mqtt.gbridge.io".to_string()
}
fn default_sink_host() -> String {
    "io.adafruit.com".to_string()
}
fn default_mqtts_port() -> u16 {
    8883
}
fn default_client_id() -> String {
    "gbridge-bridge".to_string()
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_ca_file() -> PathBuf {
    PathBuf::from("/etc/ssl/cert.pem")
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            ca_file: default_ca_file(),
        }
    }
}

// ── Derived views ─────────────────────────────────────────────────────────────

impl SourceConfig {
    pub fn endpoint(&self) -> BrokerEndpoint {
        BrokerEndpoint {
            host: self.host.clone(),
            port: self.port,
            client_id: self.client_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            keep_alive_secs: self.keep_alive_secs,
            tls: self.tls,
        }
    }
}

impl SinkConfig {
    pub fn endpoint(&self) -> BrokerEndpoint {
        BrokerEndpoint {
            host: self.host.clone(),
            port: self.port,
            client_id: self.client_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            keep_alive_secs: self.keep_alive_secs,
            tls: self.tls,
        }
    }
}

impl BridgeSettings {
    /// Checks every field that serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field, or
    /// [`ConfigError::Registry`] for a bad `[[devices]]` table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("source", &self.source.endpoint())?;
        validate_endpoint("sink", &self.sink.endpoint())?;
        validate_topic("source.topic_prefix", &self.source.topic_prefix)?;
        validate_topic("sink.topic", &self.sink.topic)?;
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::invalid("log_level", "must not be empty"));
        }
        self.device_registry()?;
        Ok(())
    }

    /// Builds the device registry from `[[devices]]`, falling back to the
    /// built-in table when none are configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registry`] for empty ids, invalid addresses or
    /// duplicate ids.
    pub fn device_registry(&self) -> Result<DeviceRegistry, ConfigError> {
        if self.devices.is_empty() {
            return Ok(DeviceRegistry::default_table());
        }
        let entries = self
            .devices
            .iter()
            .map(|d| DeviceEntry::new(d.id.clone(), &d.address, d.name.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DeviceRegistry::from_entries(entries)?)
    }

    /// Whether any broker connection uses TLS (and so needs the CA bundle).
    pub fn needs_ca(&self) -> bool {
        self.source.tls || self.sink.tls
    }
}

fn validate_endpoint(section: &str, endpoint: &BrokerEndpoint) -> Result<(), ConfigError> {
    let field = |name: &str| format!("{section}.{name}");
    if endpoint.host.trim().is_empty() {
        return Err(ConfigError::invalid(&field("host"), "must not be empty"));
    }
    if endpoint.port == 0 {
        return Err(ConfigError::invalid(&field("port"), "must not be 0"));
    }
    if endpoint.client_id.is_empty() {
        return Err(ConfigError::invalid(&field("client_id"), "must not be empty"));
    }
    if endpoint.username.is_empty() {
        return Err(ConfigError::invalid(&field("username"), "must not be empty"));
    }
    if endpoint.password.is_empty() {
        return Err(ConfigError::invalid(&field("password"), "must not be empty"));
    }
    if endpoint.keep_alive_secs < MIN_KEEP_ALIVE_SECS {
        return Err(ConfigError::invalid(
            &field("keep_alive_secs"),
            format!("must be at least {MIN_KEEP_ALIVE_SECS}"),
        ));
    }
    Ok(())
}

fn validate_topic(field: &str, topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    if topic.contains(['#', '+']) {
        return Err(ConfigError::invalid(
            field,
            "must not contain MQTT wildcards ('#' or '+')",
        ));
    }
    Ok(())
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML or a missing `[source]`
/// or `[sink]` table, and the errors of [`BridgeSettings::validate`].
pub fn parse_config(content: &str) -> Result<BridgeSettings, ConfigError> {
    let settings: BridgeSettings = toml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}

/// Reads, parses and validates the configuration file at `path`.
///
/// Unlike an application preferences file, a missing file is an error: the
/// broker credentials have no sensible default.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
/// errors of [`parse_config`].
pub fn load_config(path: &Path) -> Result<BridgeSettings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = parse_config(&content)?;
    tracing::debug!("loaded configuration from {}", path.display());
    Ok(settings)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
