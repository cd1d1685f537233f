//! Payload commands shared by every transport.
//!
//! HTTP, WebSocket, MQTT, and the terminal all turn request text into a
//! [`PayloadStatus`] through [`parse_payload`] before calling the service.

use crate::config::SystemConfig;

/// What a transport asked a relay to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStatus {
    Off,
    On,
    Toggle,
    Unknown,
}

/// Configured alternative spellings, checked before the built-in words.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomPayloads<'a> {
    pub on: &'a str,
    pub off: &'a str,
    pub toggle: &'a str,
}

impl<'a> CustomPayloads<'a> {
    pub fn from_config(cfg: &'a SystemConfig) -> Self {
        Self {
            on: cfg.payload_on.as_str(),
            off: cfg.payload_off.as_str(),
            toggle: cfg.payload_toggle.as_str(),
        }
    }

    fn lookup(&self, text: &str) -> Option<PayloadStatus> {
        [
            (self.off, PayloadStatus::Off),
            (self.on, PayloadStatus::On),
            (self.toggle, PayloadStatus::Toggle),
        ]
        .into_iter()
        .find(|(payload, _)| !payload.is_empty() && *payload == text)
        .map(|(_, status)| status)
    }
}

/// Map request text to a command.
///
/// `0`/`1`/`2` first, then the custom payloads (exact match), then
/// case-insensitive `off`/`on`/`toggle`.  Anything else is `Unknown`.
pub fn parse_payload(text: &str, custom: Option<&CustomPayloads<'_>>) -> PayloadStatus {
    if text.is_empty() {
        return PayloadStatus::Unknown;
    }

    if text.len() == 1 {
        return match text.as_bytes()[0] {
            b'0' => PayloadStatus::Off,
            b'1' => PayloadStatus::On,
            b'2' => PayloadStatus::Toggle,
            _ => PayloadStatus::Unknown,
        };
    }

    if let Some(status) = custom.and_then(|c| c.lookup(text)) {
        return status;
    }

    if text.eq_ignore_ascii_case("off") {
        PayloadStatus::Off
    } else if text.eq_ignore_ascii_case("on") {
        PayloadStatus::On
    } else if text.eq_ignore_ascii_case("toggle") {
        PayloadStatus::Toggle
    } else {
        PayloadStatus::Unknown
    }
}

/// Text a transport publishes for `status`.
pub fn payload_for<'a>(status: PayloadStatus, custom: &CustomPayloads<'a>) -> &'a str {
    let pick = |configured: &'a str, fallback: &'static str| {
        if configured.is_empty() { fallback } else { configured }
    };
    match status {
        PayloadStatus::Off => pick(custom.off, "0"),
        PayloadStatus::On => pick(custom.on, "1"),
        PayloadStatus::Toggle => pick(custom.toggle, "2"),
        PayloadStatus::Unknown => "",
    }
}
