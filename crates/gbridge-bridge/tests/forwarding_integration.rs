//! Integration tests for the config-file → forwarding path.
//!
//! # Purpose
//!
//! These tests exercise the bridge the way `main.rs` wires it, minus the
//! network: a `config.toml` is written to disk, loaded with `load_config`, and
//! its device table drives a `ForwardCommandUseCase` whose publisher records
//! what would have been sent to the Adafruit IO feed.
//!
//! ```text
//! config.toml ─load_config─▶ BridgeSettings ─device_registry─▶ DeviceRegistry
//!                                                   │
//! gBridge publish (topic, payload) ─▶ ForwardCommandUseCase ─▶ RecordingPublisher
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gbridge_bridge::application::{
    CommandPublisher, ForwardCommandUseCase, ForwardError, IgnoreReason, Outcome,
};
use gbridge_bridge::infrastructure::bridge::run_forwarder;
use gbridge_bridge::infrastructure::source::IncomingCommand;
use gbridge_core::{load_config, subscription_filter, ConfigError, TristateCode};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Config file written to the temp directory and removed on drop.
struct ScratchConfig {
    path: PathBuf,
}

impl ScratchConfig {
    fn new(content: &str) -> Self {
        let path = std::env::temp_dir().join(format!("gbridge-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).expect("write scratch config");
        Self { path }
    }
}

impl Drop for ScratchConfig {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, code: &TristateCode) -> Result<(), String> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), code.to_string()));
        Ok(())
    }
}

struct FailingPublisher;

#[async_trait]
impl CommandPublisher for FailingPublisher {
    async fn publish(&self, _topic: &str, _code: &TristateCode) -> Result<(), String> {
        Err("broker unavailable".to_string())
    }
}

const BASE_CONFIG: &str = r#"
log_level = "debug"

[source]
username = "gbridge-u42"
password = "secret"
topic_prefix = "gBridge/u42/"

[sink]
username = "ada"
password = "aio_key"
topic = "ada/feeds/rf"
"#;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_default_devices_forward_from_loaded_config() {
    // Arrange
    let scratch = ScratchConfig::new(BASE_CONFIG);
    let settings = load_config(&scratch.path).expect("load");
    let publisher = Arc::new(RecordingPublisher::default());
    let use_case = ForwardCommandUseCase::new(
        Arc::new(settings.device_registry().unwrap()),
        settings.sink.topic.clone(),
        Arc::clone(&publisher) as Arc<dyn CommandPublisher>,
    );

    // Act
    let outcome = assert_ok!(use_case.handle("gBridge/u42/d2954/onoff", b"1").await);

    // Assert
    assert!(matches!(outcome, Outcome::Forwarded { .. }));
    assert_eq!(
        *publisher.published.lock().unwrap(),
        vec![("ada/feeds/rf".to_string(), "FFF0FFF10001".to_string())]
    );
    assert_eq!(settings.log_level, "debug");
    assert_eq!(
        subscription_filter(&settings.source.topic_prefix),
        "gBridge/u42/#"
    );
}

#[tokio::test]
async fn test_configured_devices_replace_defaults() {
    let scratch = ScratchConfig::new(&format!(
        "{BASE_CONFIG}\n[[devices]]\nid = \"d7\"\naddress = \"1F1F1F1F1F\"\nname = \"Heater\"\n"
    ));
    let settings = load_config(&scratch.path).expect("load");
    let publisher = Arc::new(RecordingPublisher::default());
    let use_case = ForwardCommandUseCase::new(
        Arc::new(settings.device_registry().unwrap()),
        settings.sink.topic.clone(),
        Arc::clone(&publisher) as Arc<dyn CommandPublisher>,
    );

    let heater = assert_ok!(use_case.handle("gBridge/u42/d7/onoff", b"0").await);
    let lamp = assert_ok!(use_case.handle("gBridge/u42/d2756/onoff", b"1").await);

    assert!(matches!(heater, Outcome::Forwarded { .. }));
    assert_eq!(
        lamp,
        Outcome::Ignored(IgnoreReason::UnknownDevice("d2756".to_string()))
    );
    assert_eq!(publisher.published.lock().unwrap().len(), 1);
    assert_eq!(publisher.published.lock().unwrap()[0].1, "1F1F1F1F1F10");
}

#[tokio::test]
async fn test_publish_failure_surfaces_as_forward_error() {
    let scratch = ScratchConfig::new(BASE_CONFIG);
    let settings = load_config(&scratch.path).expect("load");
    let use_case = ForwardCommandUseCase::new(
        Arc::new(settings.device_registry().unwrap()),
        settings.sink.topic.clone(),
        Arc::new(FailingPublisher),
    );

    let err = assert_err!(use_case.handle("gBridge/u42/d2756/onoff", b"1").await);

    assert!(matches!(err, ForwardError::Publish { .. }));
    assert!(err.to_string().contains("broker unavailable"));
}

#[tokio::test]
async fn test_forwarder_task_relays_channel_in_order() {
    // Arrange
    let scratch = ScratchConfig::new(BASE_CONFIG);
    let settings = load_config(&scratch.path).expect("load");
    let publisher = Arc::new(RecordingPublisher::default());
    let use_case = ForwardCommandUseCase::new(
        Arc::new(settings.device_registry().unwrap()),
        settings.sink.topic.clone(),
        Arc::clone(&publisher) as Arc<dyn CommandPublisher>,
    );
    let (tx, rx) = mpsc::channel(16);
    let forwarder = tokio::spawn(run_forwarder(use_case, rx));

    // Act: simulate the source loop delivering a burst of publishes
    for (device, payload) in [("d2955", "1"), ("d2953", "0"), ("d2955", "0")] {
        tx.send(IncomingCommand {
            topic: format!("gBridge/u42/{device}/onoff"),
            payload: payload.as_bytes().to_vec(),
        })
        .await
        .unwrap();
    }
    drop(tx);
    let forwarded = forwarder.await.unwrap();

    // Assert
    assert_eq!(forwarded, 3);
    let codes: Vec<String> = publisher
        .published
        .lock()
        .unwrap()
        .iter()
        .map(|(_, code)| code.clone())
        .collect();
    assert_eq!(codes, vec!["FFF0FF1F0001", "FFF0FFFF1010", "FFF0FF1F0010"]);
}

#[test]
fn test_missing_credentials_fail_to_load() {
    let scratch = ScratchConfig::new(&BASE_CONFIG.replace("password = \"aio_key\"", "password = \"\""));
    match load_config(&scratch.path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "sink.password"),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn test_absent_source_username_fails_validation() {
    let scratch = ScratchConfig::new(&BASE_CONFIG.replace("username = \"gbridge-u42\"", ""));
    match load_config(&scratch.path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "source.username"),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn test_malformed_toml_fails_to_load() {
    let scratch = ScratchConfig::new("[source\nusername = ");
    assert!(matches!(
        load_config(&scratch.path),
        Err(ConfigError::Parse(_))
    ));
}
