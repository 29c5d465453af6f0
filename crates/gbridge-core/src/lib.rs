//! # gbridge-core
//!
//! Shared library for gbridge-bridge containing the RF tristate encoding, the
//! gBridge topic and payload model, the device registry, and the TOML
//! configuration schema.
//!
//! This crate has no dependencies on sockets, MQTT clients, or async runtimes.
//!
//! # Architecture overview
//!
//! gbridge-bridge relays smart-home commands from the gBridge MQTT broker to
//! an Adafruit IO feed that drives a 433 MHz RF transmitter.  A voice command
//! such as "turn on the lamp" arrives as a publish on
//! `gBridge/u42/d2756/onoff` with payload `1`; the bridge answers by
//! publishing the 12-symbol tristate code `FFF0FFFF0101` to the feed.
//!
//! - **`protocol`** – The tristate code alphabet and how device addresses and
//!   switch states combine into a transmittable command code.
//!
//! - **`domain`** – gBridge topics, switch payloads, and the registry that maps
//!   gBridge device identifiers to RF addresses.
//!
//! - **`config`** – The `config.toml` schema, loading, and validation.

pub mod config;
pub mod domain;
pub mod protocol;

pub use config::{load_config, parse_config, BridgeSettings, ConfigError};
pub use domain::registry::{DeviceRegistry, RegistryError};
pub use domain::switch::SwitchState;
pub use domain::topic::{subscription_filter, GbridgeTopic};
pub use protocol::tristate::{command_code, TristateCode, TristateError};
