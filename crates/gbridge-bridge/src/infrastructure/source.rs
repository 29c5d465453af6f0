//! gBridge (source) broker event loop.
//!
//! Polls the source event loop forever, subscribing to `<prefix>#` every time
//! the broker acknowledges a connection.  Sessions are clean, so a reconnect
//! forgets the previous subscription; re-subscribing on each `ConnAck` is what
//! keeps the bridge receiving commands after a network blip.
//!
//! Incoming publishes are pushed onto a bounded channel in arrival order.  A
//! single forwarding task consumes that channel, so commands reach the sink in
//! the order gBridge sent them.

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Packet, QoS};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::infrastructure::mqtt::{disconnect_gracefully, Backoff};

/// One publish received from the source broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCommand {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// What the source loop should do in response to one event.
#[derive(Debug, PartialEq, Eq)]
enum SourceAction {
    /// Connection accepted: subscribe and reset the backoff.
    Subscribe,
    /// Broker refused the connection with this return code.
    Refused(ConnectReturnCode),
    /// Hand a command to the forwarder.
    Forward(IncomingCommand),
    /// Nothing to do.
    None,
}

fn classify(event: Event) -> SourceAction {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => match ack.code {
            ConnectReturnCode::Success => SourceAction::Subscribe,
            code => SourceAction::Refused(code),
        },
        Event::Incoming(Packet::Publish(publish)) => SourceAction::Forward(IncomingCommand {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
        }),
        Event::Incoming(Packet::SubAck(ack)) => {
            debug!("source: subscription acknowledged (pkid {})", ack.pkid);
            SourceAction::None
        }
        _ => SourceAction::None,
    }
}

/// Runs the source event loop until `stop` fires or the forwarder goes away.
///
/// # Parameters
///
/// - `client`    – Source client handle, used to (re)subscribe.
/// - `eventloop` – Source event loop; must be polled for anything to happen.
/// - `filter`    – Subscription filter, e.g. `gBridge/u42/#`.
/// - `tx`        – Channel to the forwarding task.
/// - `stop`      – Set to `true` to stop the loop and disconnect.
pub async fn run_source_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    filter: String,
    tx: mpsc::Sender<IncomingCommand>,
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
            Ok(event) => match classify(event) {
                SourceAction::Subscribe => {
                    backoff.reset();
                    info!("source: connected, subscribing to {filter}");
                    // `try_subscribe` only queues the request; the event loop
                    // sends it on the next poll.  Awaiting here instead could
                    // deadlock on a full request channel.
                    if let Err(e) = client.try_subscribe(filter.clone(), QoS::AtLeastOnce) {
                        warn!("source: failed to queue subscription: {e}");
                    }
                }
                SourceAction::Refused(code) => {
                    warn!("source: broker refused connection: {code:?}");
                }
                SourceAction::Forward(command) => {
                    debug!(
                        "source: received {} bytes on {}",
                        command.payload.len(),
                        command.topic
                    );
                    if tx.send(command).await.is_err() {
                        debug!("source: forwarder channel closed; exiting");
                        break;
                    }
                }
                SourceAction::None => {}
            },
            Err(e) => {
                let delay = backoff.next_delay();
                warn!("source: connection error: {e}; retrying in {delay:?}");
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = sleep(delay) => {}
                }
            }
        }
    }

    disconnect_gracefully(&client, &mut eventloop, "source").await;
    info!("source: stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
