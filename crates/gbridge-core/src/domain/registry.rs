//! Mapping from gBridge device identifiers to RF socket addresses.
//!
//! The registry is built once at startup from `config.toml` and shared
//! read-only by the forwarding task.  When the configuration lists no
//! devices, [`DeviceRegistry::default_table`] supplies the four sockets the
//! bridge was originally deployed with.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::switch::SwitchState;
use crate::protocol::tristate::{command_code, TristateCode, TristateError};

/// Built-in device table: `(gBridge device id, 10-symbol address)`.
const DEFAULT_DEVICES: &[(&str, &str)] = &[
    ("d2756", "FFF0FFFF01"),
    ("d2953", "FFF0FFFF10"),
    ("d2954", "FFF0FFF100"),
    ("d2955", "FFF0FF1F00"),
];

/// Errors raised while building a [`DeviceRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A device entry had an empty identifier.
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// The same device identifier appeared twice.
    #[error("device '{0}' is listed more than once")]
    DuplicateDevice(String),

    /// A device address was not a valid 10-symbol tristate code.
    #[error("device '{device}' has an invalid address: {source}")]
    InvalidAddress {
        device: String,
        #[source]
        source: TristateError,
    },
}

/// One RF socket known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// gBridge device identifier (third topic segment).
    pub id: String,
    /// 10-symbol tristate address of the socket.
    pub address: TristateCode,
    /// Optional human-readable label, used only in log output.
    pub name: Option<String>,
}

impl DeviceEntry {
    /// Builds an entry, validating `address` as a 10-symbol tristate code.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyDeviceId`] or
    /// [`RegistryError::InvalidAddress`].
    pub fn new(
        id: impl Into<String>,
        address: &str,
        name: Option<String>,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RegistryError::EmptyDeviceId);
        }
        let address = TristateCode::parse_address(address).map_err(|source| {
            RegistryError::InvalidAddress {
                device: id.clone(),
                source,
            }
        })?;
        Ok(Self { id, address, name })
    }

    /// Name for log output: the configured label, or the device id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Lookup table from gBridge device id to RF address.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceEntry>,
}

impl DeviceRegistry {
    /// Builds a registry from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDevice`] if two entries share an id.
    pub fn from_entries<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = DeviceEntry>,
    {
        let mut devices = HashMap::new();
        for entry in entries {
            if devices.contains_key(&entry.id) {
                return Err(RegistryError::DuplicateDevice(entry.id));
            }
            devices.insert(entry.id.clone(), entry);
        }
        Ok(Self { devices })
    }

    /// The built-in four-socket table.
    ///
    /// # Panics
    ///
    /// Panics if an entry of the built-in table is not a valid 10-symbol
    /// address. The table is constant and covered by unit tests, so this cannot
    /// happen at runtime.
    pub fn default_table() -> Self {
        let devices = DEFAULT_DEVICES
            .iter()
            .map(|(id, address)| {
                let entry = DeviceEntry {
                    id: (*id).to_string(),
                    // The table above is a compile-time constant of valid addresses.
                    address: TristateCode::parse_address(address)
                        .unwrap_or_else(|e| panic!("built-in address for {id} is invalid: {e}")),
                    name: None,
                };
                (entry.id.clone(), entry)
            })
            .collect();
        Self { devices }
    }

    /// Looks up a device by its gBridge identifier.
    pub fn get(&self, device: &str) -> Option<&DeviceEntry> {
        self.devices.get(device)
    }

    /// Returns the 12-symbol command for `device` in `state`, or `None` for an
    /// unknown device.
    pub fn encode(&self, device: &str, state: SwitchState) -> Option<TristateCode> {
        self.get(device)
            .map(|entry| command_code(&entry.address, state))
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device ids in sorted order, for stable startup logging.
    pub fn device_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.devices.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
