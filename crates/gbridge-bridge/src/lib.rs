//! gbridge-bridge library crate.
//!
//! Relays on/off commands from the gBridge MQTT broker to an Adafruit IO feed
//! as 433 MHz RF tristate codes.
//!
//! # Architecture
//!
//! ```text
//! gBridge broker  (MQTT/TLS, "<prefix>#")
//!         ↓
//! [gbridge-bridge]
//!   ├── application/      ForwardCommandUseCase: topic + payload → tristate publish
//!   └── infrastructure/
//!         ├── mqtt/       Broker options, TLS trust, reconnect backoff
//!         ├── source/     gBridge event loop, re-subscribe on every ConnAck
//!         ├── sink/       Adafruit IO event loop and MqttPublisher
//!         └── bridge/     Wiring, ordered forwarding task, shutdown
//!         ↓
//! Adafruit IO broker  (MQTT/TLS, "<feed>")
//! ```
//!
//! Pure types (topics, switch states, tristate codes, configuration) live in
//! `gbridge-core`.
//!
//! # Layer rules
//!
//! - `application` depends on `gbridge-core` and the [`CommandPublisher`]
//!   trait only; it never sees an MQTT client.
//! - `infrastructure` depends on everything plus `tokio` and `rumqttc`.
//!
//! [`CommandPublisher`]: application::CommandPublisher

/// Application layer: command translation and forwarding.
pub mod application;

/// Infrastructure layer: MQTT connections and task wiring.
pub mod infrastructure;
