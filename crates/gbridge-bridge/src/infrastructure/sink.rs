//! Adafruit IO (sink) broker: publisher and event loop.
//!
//! [`MqttPublisher`] implements the application's [`CommandPublisher`] by
//! queueing a publish on the sink [`AsyncClient`].  The queued request only
//! leaves the process while [`run_sink_loop`] is polling the sink event loop.
//!
//! Queueing never waits: while the sink broker is unreachable the client's
//! request channel fills up and further publishes fail immediately, so the
//! forwarder drops those commands instead of stalling the source side.

use async_trait::async_trait;
use gbridge_core::TristateCode;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Packet, QoS};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::application::CommandPublisher;
use crate::infrastructure::mqtt::{disconnect_gracefully, Backoff};

/// [`CommandPublisher`] backed by the sink MQTT client.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommandPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, code: &TristateCode) -> Result<(), String> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, code.as_str().as_bytes().to_vec())
            .map_err(|e| format!("sink request queue rejected publish: {e}"))
    }
}

/// Runs the sink event loop until `stop` fires.
///
/// Connection errors are logged and retried with [`Backoff`]; publishes queued
/// while disconnected are sent once the connection is back.
pub async fn run_sink_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    mut stop: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::default();

    loop {
        if *stop.borrow() {
            break;
        }

        let event = tokio::select! {
            _ = stop.changed() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    backoff.reset();
                    info!("sink: connected");
                } else {
                    warn!("sink: broker refused connection: {:?}", ack.code);
                }
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                debug!("sink: publish acknowledged (pkid {})", ack.pkid);
            }
            Ok(_) => {}
            Err(e) => {
                let delay = backoff.next_delay();
                warn!("sink: connection error: {e}; retrying in {delay:?}");
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = sleep(delay) => {}
                }
            }
        }
    }

    disconnect_gracefully(&client, &mut eventloop, "sink").await;
    info!("sink: stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
