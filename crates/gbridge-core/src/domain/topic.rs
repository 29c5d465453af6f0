//! gBridge MQTT topic layout.
//!
//! gBridge publishes device commands on topics of the form
//!
//! ```text
//! gBridge/<user>/<device>/<trait>[/...]
//!    0       1       2        3
//! ```
//!
//! The bridge only cares about the device segment (index 2).  The trait
//! segment is kept for logging.

/// Device and trait extracted from a gBridge topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GbridgeTopic<'a> {
    /// gBridge device identifier, e.g. `d2756`.
    pub device: &'a str,
    /// Trait name following the device, e.g. `onoff`, if present.
    pub trait_name: Option<&'a str>,
}

impl<'a> GbridgeTopic<'a> {
    /// Splits `topic` on `/` and picks out the device and trait segments.
    ///
    /// Returns `None` when the topic has fewer than three segments or the
    /// device segment is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use gbridge_core::GbridgeTopic;
    ///
    /// let t = GbridgeTopic::parse("gBridge/u42/d2756/onoff").unwrap();
    /// assert_eq!(t.device, "d2756");
    /// assert_eq!(t.trait_name, Some("onoff"));
    /// assert!(GbridgeTopic::parse("gBridge/u42").is_none());
    /// ```
    pub fn parse(topic: &'a str) -> Option<Self> {
        let mut segments = topic.split('/');
        let device = segments.nth(2).filter(|d| !d.is_empty())?;
        let trait_name = segments.next().filter(|t| !t.is_empty());
        Some(Self { device, trait_name })
    }
}

/// MQTT subscription filter covering every topic under `prefix`.
///
/// The prefix is used verbatim, so `gBridge/u42/` yields `gBridge/u42/#`.
pub fn subscription_filter(prefix: &str) -> String {
    format!("{prefix}#")
}
