use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Scalr webhook contract types
// ─────────────────────────────────────────────────────────────────────────────

/// The envelope Scalr POSTs for every subscribed event.
///
/// Only `event_name` and a few `data` attributes drive the relay; the rest is
/// kept so it shows up in logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub configuration_id: Option<String>,
    #[serde(default)]
    pub user_data: Option<String>,
    #[serde(default)]
    pub data: EventData,
}

/// Global variables Scalr attaches to an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(rename = "SCALR_EVENT_SERVER_HOSTNAME", default)]
    pub server_hostname: Option<String>,

    #[serde(rename = "SCALR_EVENT_EXTERNAL_IP", default)]
    pub external_ip: Option<String>,

    #[serde(rename = "SCALR_INTERNAL_IP", default)]
    pub internal_ip: Option<String>,

    /// Only consulted when `SCALR_INTERNAL_IP` is blank.
    #[serde(rename = "SCALR_EVENT_INTERNAL_IP", default)]
    pub event_internal_ip: Option<String>,

    /// Every other SCALR_* attribute, passed through untouched. Values are
    /// kept as raw JSON so a `null` or a number here never fails the decode.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.event_name)
    }
}

impl EventData {
    /// Hostname of the server the event is about, without trailing dots.
    /// `None` when nothing but whitespace and dots is left.
    pub fn hostname(&self) -> Option<&str> {
        non_blank(&self.server_hostname)
            .map(|h| h.trim_end_matches('.'))
            .filter(|h| !h.is_empty())
    }

    /// Address the host should resolve to: the external IP when present,
    /// otherwise the internal one.
    pub fn address(&self) -> Option<&str> {
        non_blank(&self.external_ip)
            .or_else(|| non_blank(&self.internal_ip))
            .or_else(|| non_blank(&self.event_internal_ip))
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    HostUp,
    HostDown,
    /// Anything the relay does not act on.
    Other(String),
}

impl EventKind {
    /// Event names are matched case-insensitively (`HostUp`, `hostup`, …).
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("hostup") {
            EventKind::HostUp
        } else if name.eq_ignore_ascii_case("hostdown") {
            EventKind::HostDown
        } else {
            EventKind::Other(name.to_string())
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::HostUp => f.write_str("hostup"),
            EventKind::HostDown => f.write_str("hostdown"),
            EventKind::Other(name) => f.write_str(name),
        }
    }
}
