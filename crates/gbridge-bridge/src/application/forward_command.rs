//! ForwardCommandUseCase: turns one gBridge publish into at most one sink publish.
//!
//! The use case depends only on the [`CommandPublisher`] trait and on
//! `gbridge-core` domain types.  The MQTT-backed publisher is injected at
//! construction time, so the whole decision path is unit-testable without a
//! broker.
//!
//! # Decision order
//!
//! ```text
//! topic has a device segment?   no  → Ignored(NoDevice)
//! device in the registry?       no  → Ignored(UnknownDevice)
//! payload is exactly "0"/"1"?   no  → Ignored(NotASwitchCommand)
//! publish address+suffix to sink    → Forwarded
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use gbridge_core::{DeviceRegistry, GbridgeTopic, SwitchState, TristateCode};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for the forward-command use case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwardError {
    /// The sink publisher refused or failed to queue the message.
    #[error("failed to publish {code} for device {device}: {reason}")]
    Publish {
        device: String,
        code: TristateCode,
        reason: String,
    },
}

/// Trait for delivering a tristate code to the sink feed.
///
/// The infrastructure implementation wraps an MQTT client; test
/// implementations record calls.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    /// Publishes `code` on `topic` with at-least-once delivery, not retained.
    async fn publish(&self, topic: &str, code: &TristateCode) -> Result<(), String>;
}

/// Why an incoming message produced no sink publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The topic has no device segment.
    NoDevice,
    /// The device segment is not in the registry.
    UnknownDevice(String),
    /// The payload is not exactly `0` or `1`.
    NotASwitchCommand,
}

/// Result of handling one incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A tristate code was handed to the publisher.
    Forwarded {
        device: String,
        state: SwitchState,
        code: TristateCode,
    },
    /// Nothing was published.
    Ignored(IgnoreReason),
}

/// Translates gBridge device commands into sink feed publishes.
pub struct ForwardCommandUseCase {
    registry: Arc<DeviceRegistry>,
    sink_topic: String,
    publisher: Arc<dyn CommandPublisher>,
}

impl ForwardCommandUseCase {
    /// Creates the use case.
    ///
    /// `sink_topic` is the Adafruit IO feed every command is published to.
    pub fn new(
        registry: Arc<DeviceRegistry>,
        sink_topic: impl Into<String>,
        publisher: Arc<dyn CommandPublisher>,
    ) -> Self {
        Self {
            registry,
            sink_topic: sink_topic.into(),
            publisher,
        }
    }

    /// The feed this use case publishes to.
    pub fn sink_topic(&self) -> &str {
        &self.sink_topic
    }

    /// Handles one publish received from the source broker.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Publish`] when the publisher fails.  Ignored
    /// messages are not errors.
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Result<Outcome, ForwardError> {
        let Some(parsed) = GbridgeTopic::parse(topic) else {
            debug!("ignoring '{topic}': no device segment");
            return Ok(Outcome::Ignored(IgnoreReason::NoDevice));
        };

        let Some(entry) = self.registry.get(parsed.device) else {
            debug!("ignoring '{topic}': device {} is not configured", parsed.device);
            return Ok(Outcome::Ignored(IgnoreReason::UnknownDevice(
                parsed.device.to_string(),
            )));
        };

        let Some(state) = SwitchState::from_payload(payload) else {
            debug!(
                "ignoring '{topic}': payload is not a switch command ({} bytes)",
                payload.len()
            );
            return Ok(Outcome::Ignored(IgnoreReason::NotASwitchCommand));
        };

        let code = gbridge_core::command_code(&entry.address, state);

        self.publisher
            .publish(&self.sink_topic, &code)
            .await
            .map_err(|reason| ForwardError::Publish {
                device: entry.id.clone(),
                code: code.clone(),
                reason,
            })?;

        info!(
            "{} ({}) switched {state} via trait {}: published {code} to {}",
            entry.display_name(),
            entry.id,
            parsed.trait_name.unwrap_or("-"),
            self.sink_topic
        );

        Ok(Outcome::Forwarded {
            device: entry.id.clone(),
            state,
            code,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
