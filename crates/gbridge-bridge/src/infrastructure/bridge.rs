//! Bridge wiring: builds both broker connections and runs the three tasks.
//!
//! ```text
//!  source loop ──IncomingCommand──▶ forwarder ──publish──▶ sink client
//!   (gBridge)        mpsc(128)      (ordered)              ▲
//!                                                          │ polled by
//!                                                      sink loop (Adafruit IO)
//! ```
//!
//! The bridge runs until the external shutdown signal fires or any of the
//! three tasks ends on its own.  Either way, every task is then told to stop,
//! the brokers are sent DISCONNECT, and `run_bridge` returns.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gbridge_core::{subscription_filter, BridgeSettings};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::application::{ForwardCommandUseCase, Outcome};
use crate::infrastructure::mqtt::{broker_options, connect, load_ca};
use crate::infrastructure::sink::{run_sink_loop, MqttPublisher};
use crate::infrastructure::source::{run_source_loop, IncomingCommand};

/// Capacity of the source → forwarder channel.
pub const COMMAND_CHANNEL_CAPACITY: usize = 128;

/// Time allowed for all tasks to wind down after a stop request.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Consumes incoming commands one at a time, in arrival order.
///
/// Publish failures are logged and do not stop the forwarder.  Returns the
/// number of commands forwarded once the channel closes.
pub async fn run_forwarder(
    use_case: ForwardCommandUseCase,
    mut rx: mpsc::Receiver<IncomingCommand>,
) -> usize {
    let mut forwarded = 0;
    while let Some(command) = rx.recv().await {
        match use_case.handle(&command.topic, &command.payload).await {
            Ok(Outcome::Forwarded { .. }) => forwarded += 1,
            Ok(Outcome::Ignored(_)) => {}
            Err(e) => warn!("forwarder: {e}"),
        }
    }
    debug!("forwarder: channel closed after {forwarded} forwarded commands");
    forwarded
}

/// Resolves once `shutdown` holds `true`.
///
/// A dropped sender means nobody can request shutdown any more, so this never
/// resolves in that case.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Connects to both brokers and relays commands until shutdown.
///
/// # Errors
///
/// Returns an error if the device table is invalid, the CA bundle cannot be
/// read, or broker options cannot be built.  Broker connection failures are
/// not errors: the event loops retry them with backoff.
pub async fn run_bridge(
    settings: BridgeSettings,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let registry = Arc::new(
        settings
            .device_registry()
            .context("failed to build device registry")?,
    );

    let ca = if settings.needs_ca() {
        Some(load_ca(&settings.tls.ca_file)?)
    } else {
        None
    };

    let source_options = broker_options(&settings.source.endpoint(), ca.as_deref())
        .context("invalid source broker settings")?;
    let sink_options = broker_options(&settings.sink.endpoint(), ca.as_deref())
        .context("invalid sink broker settings")?;

    info!(
        "bridging {}:{} ({}) → {}:{} ({}) for {} devices: {}",
        settings.source.host,
        settings.source.port,
        settings.source.topic_prefix,
        settings.sink.host,
        settings.sink.port,
        settings.sink.topic,
        registry.len(),
        registry.device_ids().join(", ")
    );

    let (source_client, source_eventloop) = connect(source_options);
    let (sink_client, sink_eventloop) = connect(sink_options);

    let (stop_tx, stop_rx) = watch::channel(false);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

    let use_case = ForwardCommandUseCase::new(
        Arc::clone(&registry),
        settings.sink.topic.clone(),
        Arc::new(MqttPublisher::new(sink_client.clone())),
    );

    let mut tasks = JoinSet::new();
    tasks.spawn({
        let filter = subscription_filter(&settings.source.topic_prefix);
        let stop = stop_rx.clone();
        async move {
            run_source_loop(source_client, source_eventloop, filter, command_tx, stop).await;
            "source loop"
        }
    });
    tasks.spawn({
        let stop = stop_rx.clone();
        async move {
            run_sink_loop(sink_client, sink_eventloop, stop).await;
            "sink loop"
        }
    });
    tasks.spawn(async move {
        run_forwarder(use_case, command_rx).await;
        "forwarder"
    });

    // ── Wait for a reason to stop ─────────────────────────────────────────────
    tokio::select! {
        _ = wait_for_shutdown(&mut shutdown) => {
            info!("shutdown requested; stopping bridge");
        }
        Some(finished) = tasks.join_next() => {
            match finished {
                Ok(name) => warn!("{name} ended unexpectedly; stopping bridge"),
                Err(e) => warn!("bridge task failed: {e}; stopping bridge"),
            }
        }
    }

    // ── Stop everything and wait for disconnects ──────────────────────────────
    let _ = stop_tx.send(true);

    let drain = async {
        while let Some(finished) = tasks.join_next().await {
            match finished {
                Ok(name) => debug!("{name} finished"),
                Err(e) => warn!("bridge task failed during shutdown: {e}"),
            }
        }
    };
    if timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!("bridge tasks did not stop within {SHUTDOWN_GRACE:?}; aborting");
        tasks.abort_all();
    }

    info!("bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
