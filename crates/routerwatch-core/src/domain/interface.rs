//! Interface link status keyed by interface name.
//!
//! Only status flips are events. Interfaces that appear or vanish (added,
//! removed, renamed on the router) are logged by [`evaluate`](super::evaluate)
//! and never notified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Message, Tracked};
use crate::diff::Transition;
use crate::event::{Domain, Event, EventKind};
use crate::record::{InterfaceRecord, Resource, UNKNOWN};

/// Effective link status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Up,
    Down,
}

impl LinkStatus {
    /// `Up` iff the link is running and the interface is not disabled
    pub fn from_flags(running: bool, disabled: bool) -> Self {
        if running && !disabled {
            LinkStatus::Up
        } else {
            LinkStatus::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Up => "up",
            LinkStatus::Down => "down",
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceState {
    pub status: LinkStatus,
    pub running: bool,
    pub disabled: bool,
    pub speed: Option<String>,
    pub rx_error: u64,
    pub tx_error: u64,
}

/// Interface link domain
pub struct InterfaceDomain;

impl Tracked for InterfaceDomain {
    const DOMAIN: Domain = Domain::Interface;
    const RESOURCE: Resource = Resource::Interfaces;

    type Record = InterfaceRecord;
    type Key = String;
    type State = InterfaceState;

    fn key(record: &InterfaceRecord) -> String {
        record.name.clone().unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn normalize(record: InterfaceRecord) -> InterfaceState {
        let running = record.running.unwrap_or(false);
        let disabled = record.disabled.unwrap_or(false);
        InterfaceState {
            status: LinkStatus::from_flags(running, disabled),
            running,
            disabled,
            speed: record.link_speed.filter(|s| !s.is_empty()),
            rx_error: record.rx_error.unwrap_or(0),
            tx_error: record.tx_error.unwrap_or(0),
        }
    }

    fn changed(before: &InterfaceState, after: &InterfaceState) -> bool {
        before.status != after.status
    }

    fn classify(
        transition: &Transition<String, InterfaceState>,
        at: DateTime<Utc>,
    ) -> Option<Event> {
        let Transition::Changed { key, after, .. } = transition else {
            return None;
        };

        let speed = after.speed.as_deref();
        let (kind, message) = match after.status {
            LinkStatus::Down => {
                let has_errors = after.rx_error > 0 || after.tx_error > 0;
                let message = Message::new("LINK DOWN")
                    .line("Interface", key)
                    .line_if(speed.is_some(), "Last Speed", speed.unwrap_or_default())
                    .line_if(
                        has_errors,
                        "RX Errors",
                        format!("{} | TX Errors: {}", after.rx_error, after.tx_error),
                    )
                    .finish(at);
                (EventKind::InterfaceDown, message)
            }
            LinkStatus::Up => {
                let message = Message::new("LINK UP")
                    .line("Interface", key)
                    .line_if(speed.is_some(), "Speed", speed.unwrap_or_default())
                    .finish(at);
                (EventKind::InterfaceUp, message)
            }
        };

        Some(Event {
            kind,
            key: key.clone(),
            message,
            timestamp: at,
            details: json!({
                "interface": key,
                "status": after.status,
                "speed": after.speed,
                "disabled": after.disabled,
                "rx_error": after.rx_error,
                "tx_error": after.tx_error,
            }),
        })
    }
}
