//! Infrastructure layer for gbridge-bridge.
//!
//! Handles all I/O: the two MQTT broker connections, TLS trust material, and
//! the tasks that move messages between them.
//!
//! # Responsibilities
//!
//! - Building `rumqttc` connection options from the configuration
//! - Driving the source and sink event loops, including reconnect backoff
//! - Re-subscribing to the gBridge topic filter after every (re)connect
//! - Publishing tristate codes through [`sink::MqttPublisher`]
//! - Running the single, ordered forwarding task
//! - Graceful shutdown and broker disconnects
//!
//! # What does NOT belong here?
//!
//! - Deciding what to publish (application layer)
//! - Topic, payload and tristate rules (`gbridge-core`)

pub mod bridge;
pub mod mqtt;
pub mod sink;
pub mod source;

// Re-export the primary entry point so `main.rs` can call it concisely.
pub use bridge::run_bridge;
