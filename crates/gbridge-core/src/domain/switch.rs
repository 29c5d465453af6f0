//! On/off switch state carried by gBridge `onoff` payloads.

use std::fmt;

/// Requested state of a remote-controlled socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    /// Interprets a raw MQTT payload as a switch command.
    ///
    /// gBridge sends exactly `1` for on and `0` for off.  Anything else
    /// (brightness levels, whitespace-padded values, non-UTF-8 bytes) is not
    /// a switch command and yields `None`.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match std::str::from_utf8(payload).ok()? {
            "1" => Some(Self::On),
            "0" => Some(Self::Off),
            _ => None,
        }
    }

    /// The two tristate symbols appended to a device address for this state.
    pub fn tristate_suffix(self) -> &'static str {
        match self {
            Self::On => "01",
            Self::Off => "10",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "on",
            Self::Off => "off",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_one_is_on() {
        assert_eq!(SwitchState::from_payload(b"1"), Some(SwitchState::On));
    }

    #[test]
    fn test_payload_zero_is_off() {
        assert_eq!(SwitchState::from_payload(b"0"), Some(SwitchState::Off));
    }

    #[test]
    fn test_other_payloads_are_not_switch_commands() {
        let payloads: [&[u8]; 6] = [b"2", b"on", b" 1", b"1\n", b"", b"100"];
        for payload in payloads {
            assert_eq!(
                SwitchState::from_payload(payload),
                None,
                "payload {:?} must be ignored",
                payload
            );
        }
    }

    #[test]
    fn test_non_utf8_payload_is_not_a_switch_command() {
        assert_eq!(SwitchState::from_payload(&[0xFF, 0xFE]), None);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(SwitchState::On.tristate_suffix(), "01");
        assert_eq!(SwitchState::Off.tristate_suffix(), "10");
    }

    #[test]
    fn test_display() {
        assert_eq!(SwitchState::On.to_string(), "on");
        assert_eq!(SwitchState::Off.to_string(), "off");
    }
}
