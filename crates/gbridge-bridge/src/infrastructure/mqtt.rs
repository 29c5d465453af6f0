//! Shared MQTT plumbing: connection options, TLS trust, backoff, disconnect.
//!
//! Both broker connections are plain `rumqttc` clients.  Each one is split by
//! `rumqttc` into an [`AsyncClient`] handle (used to subscribe and publish)
//! and an [`EventLoop`] that must be polled continuously for any traffic to
//! flow.  Polling after a connection error makes the event loop reconnect, so
//! reconnecting is just "keep polling, but not too fast" (see [`Backoff`]).

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use gbridge_core::config::BrokerEndpoint;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, TlsConfiguration, Transport};
use tokio::time::timeout;
use tracing::debug;

/// Capacity of the request channel between an [`AsyncClient`] and its event loop.
pub const CLIENT_CHANNEL_CAPACITY: usize = 10;

/// First delay after a connection error.
pub const BACKOFF_INITIAL: Duration = Duration::from_secs(1);

/// Upper bound for the reconnect delay.
pub const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// How long a graceful disconnect may take before the event loop is dropped.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Reads the PEM bundle of trusted root certificates.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is empty.
pub fn load_ca(path: &Path) -> anyhow::Result<Vec<u8>> {
    let pem = std::fs::read(path)
        .with_context(|| format!("failed to read CA bundle at {}", path.display()))?;
    if pem.is_empty() {
        anyhow::bail!("CA bundle at {} is empty", path.display());
    }
    Ok(pem)
}

/// Builds `rumqttc` options for one broker.
///
/// `ca` must be `Some` when `endpoint.tls` is set.
///
/// # Errors
///
/// Returns an error if TLS is requested but no CA bundle was supplied.
pub fn broker_options(endpoint: &BrokerEndpoint, ca: Option<&[u8]>) -> anyhow::Result<MqttOptions> {
    let mut options = MqttOptions::new(
        endpoint.client_id.clone(),
        endpoint.host.clone(),
        endpoint.port,
    );
    options
        .set_credentials(endpoint.username.clone(), endpoint.password.expose())
        .set_keep_alive(Duration::from_secs(endpoint.keep_alive_secs))
        .set_clean_session(true);

    if endpoint.tls {
        let ca = ca.with_context(|| {
            format!(
                "TLS enabled for {}:{} but no CA bundle loaded",
                endpoint.host, endpoint.port
            )
        })?;
        options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
            ca: ca.to_vec(),
            alpn: None,
            client_auth: None,
        }));
    }

    Ok(options)
}

/// Creates the client handle and event loop for one broker.
pub fn connect(options: MqttOptions) -> (AsyncClient, EventLoop) {
    AsyncClient::new(options, CLIENT_CHANNEL_CAPACITY)
}

/// Exponential reconnect delay: 1 s, 2 s, 4 s … capped at 30 s.
///
/// Call [`Backoff::reset`] once a connection is acknowledged.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            next: initial,
            initial,
            max,
        }
    }

    /// Returns the delay to wait now and doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_INITIAL, BACKOFF_MAX)
    }
}

/// Queues an MQTT DISCONNECT and polls the event loop until it has been sent.
///
/// Gives up silently after a short timeout or on any connection error; the
/// process is shutting down either way.
pub async fn disconnect_gracefully(client: &AsyncClient, eventloop: &mut EventLoop, label: &str) {
    if client.try_disconnect().is_err() {
        debug!("{label}: disconnect request could not be queued");
        return;
    }

    let drain = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("{label}: connection closed during disconnect: {e}");
                    break;
                }
            }
        }
    };

    match timeout(DISCONNECT_TIMEOUT, drain).await {
        Ok(()) => debug!("{label}: disconnected"),
        Err(_) => debug!("{label}: disconnect timed out"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use gbridge_core::config::Secret;

    fn endpoint(tls: bool) -> BrokerEndpoint {
        BrokerEndpoint {
            host: "broker.test".to_string(),
            port: 8883,
            client_id: "gbridge-bridge".to_string(),
            username: "user".to_string(),
            password: Secret::new("pw"),
            keep_alive_secs: 30,
            tls,
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        // Arrange
        let mut backoff = Backoff::default();

        // Act
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();

        // Assert
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_backoff_reset_returns_to_initial() {
        let mut backoff = Backoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), BACKOFF_INITIAL);
    }

    #[test]
    fn test_broker_options_carry_endpoint_settings() {
        let options = broker_options(&endpoint(false), None).unwrap();

        assert_eq!(options.broker_address(), ("broker.test".to_string(), 8883));
        assert_eq!(options.client_id(), "gbridge-bridge");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert!(options.clean_session());
        assert_eq!(
            options.credentials(),
            Some(("user".to_string(), "pw".to_string()))
        );
    }

    #[test]
    fn test_broker_options_tls_without_ca_is_error() {
        assert!(broker_options(&endpoint(true), None).is_err());
    }

    #[test]
    fn test_broker_options_tls_with_ca_uses_tls_transport() {
        let options = broker_options(&endpoint(true), Some(b"-----BEGIN CERTIFICATE-----")).unwrap();
        assert!(matches!(options.transport(), Transport::Tls(_)));
    }

    #[test]
    fn test_load_ca_missing_file_is_error() {
        let path = std::env::temp_dir().join(format!("gbridge-ca-{}.pem", uuid::Uuid::new_v4()));
        assert!(load_ca(&path).is_err());
    }

    #[test]
    fn test_load_ca_reads_file_contents() {
        let path = std::env::temp_dir().join(format!("gbridge-ca-{}.pem", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"pem-bytes").unwrap();

        let pem = load_ca(&path).unwrap();

        std::fs::remove_file(&path).ok();
        assert_eq!(pem, b"pem-bytes");
    }

    #[test]
    fn test_load_ca_empty_file_is_error() {
        let path = std::env::temp_dir().join(format!("gbridge-ca-{}.pem", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"").unwrap();

        let result = load_ca(&path);

        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
