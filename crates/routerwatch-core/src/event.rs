//! Classified events and the notices handed out for fan-out

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Monitored entity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Hotspot session presence
    Session,
    /// DHCP lease lifecycle
    Lease,
    /// Interface link status
    Interface,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Session => "session",
            Domain::Lease => "lease",
            Domain::Interface => "interface",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    HotspotLogin,
    HotspotLogout,
    DhcpNew,
    DhcpRenew,
    DhcpRelease,
    InterfaceUp,
    InterfaceDown,
}

impl EventKind {
    /// Stable wire/storage name (e.g. `dhcp_renew`)
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::HotspotLogin => "hotspot_login",
            EventKind::HotspotLogout => "hotspot_logout",
            EventKind::DhcpNew => "dhcp_new",
            EventKind::DhcpRenew => "dhcp_renew",
            EventKind::DhcpRelease => "dhcp_release",
            EventKind::InterfaceUp => "interface_up",
            EventKind::InterfaceDown => "interface_down",
        }
    }

    /// Domain this kind belongs to
    pub fn domain(&self) -> Domain {
        match self {
            EventKind::HotspotLogin | EventKind::HotspotLogout => Domain::Session,
            EventKind::DhcpNew | EventKind::DhcpRenew | EventKind::DhcpRelease => Domain::Lease,
            EventKind::InterfaceUp | EventKind::InterfaceDown => Domain::Interface,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hotspot_login" => Ok(EventKind::HotspotLogin),
            "hotspot_logout" => Ok(EventKind::HotspotLogout),
            "dhcp_new" => Ok(EventKind::DhcpNew),
            "dhcp_renew" => Ok(EventKind::DhcpRenew),
            "dhcp_release" => Ok(EventKind::DhcpRelease),
            "interface_up" => Ok(EventKind::InterfaceUp),
            "interface_down" => Ok(EventKind::InterfaceDown),
            other => Err(crate::Error::invalid_input(format!(
                "unknown event kind '{}'",
                other
            ))),
        }
    }
}

/// A classified transition, ready to persist and notify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Rendered entity key (`user:mac`, MAC address, or interface name)
    pub key: String,
    /// Human-readable message for the notifier
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Domain fields worth keeping in the log (addresses, lease time, counters)
    pub details: serde_json::Value,
}

impl Event {
    pub fn domain(&self) -> Domain {
        self.kind.domain()
    }
}

/// `(message, kind)` pair returned by a cycle for fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: EventKind,
}

impl From<&Event> for Notice {
    fn from(event: &Event) -> Self {
        Self {
            message: event.message.clone(),
            kind: event.kind,
        }
    }
}
