//! Domain entities for gbridge-bridge.
//!
//! Pure business rules with no network or runtime dependencies:
//!
//! - [`topic`] – how a gBridge MQTT topic identifies a device.
//! - [`switch`] – how an MQTT payload becomes an on/off command.
//! - [`registry`] – which RF address belongs to which gBridge device.

pub mod registry;
pub mod switch;
pub mod topic;

pub use registry::{DeviceEntry, DeviceRegistry, RegistryError};
pub use switch::SwitchState;
pub use topic::{subscription_filter, GbridgeTopic};
