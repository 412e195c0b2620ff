//! Hotspot session presence: login when a `(user, mac)` pair appears,
//! logout when it disappears.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{Message, Tracked};
use crate::diff::Transition;
use crate::event::{Domain, Event, EventKind};
use crate::record::{Resource, SessionRecord, UNKNOWN};

/// Composite session identity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    pub username: String,
    pub mac_address: String,
}

impl SessionKey {
    pub fn new(username: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            mac_address: mac_address.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.username, self.mac_address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub address: String,
    /// Carried for rendering only
    pub uptime: Option<String>,
}

/// Hotspot session domain
pub struct SessionDomain;

impl Tracked for SessionDomain {
    const DOMAIN: Domain = Domain::Session;
    const RESOURCE: Resource = Resource::HotspotSessions;

    type Record = SessionRecord;
    type Key = SessionKey;
    type State = SessionState;

    fn key(record: &SessionRecord) -> SessionKey {
        SessionKey::new(
            record.name.as_deref().unwrap_or(UNKNOWN),
            record.mac_address.as_deref().unwrap_or(UNKNOWN),
        )
    }

    fn normalize(record: SessionRecord) -> SessionState {
        SessionState {
            address: record.address.unwrap_or_else(|| UNKNOWN.to_string()),
            uptime: record.uptime,
        }
    }

    fn classify(
        transition: &Transition<SessionKey, SessionState>,
        at: DateTime<Utc>,
    ) -> Option<Event> {
        let (kind, key, state, title) = match transition {
            Transition::Appeared { key, state } => {
                (EventKind::HotspotLogin, key, state, "Hotspot Login")
            }
            Transition::Disappeared { key, last } => {
                (EventKind::HotspotLogout, key, last, "Hotspot Logout")
            }
            Transition::Changed { .. } => return None,
        };

        let message = Message::new(title)
            .line("Username", &key.username)
            .line("MAC", &key.mac_address)
            .line("IP", &state.address)
            .finish(at);

        Some(Event {
            kind,
            key: key.to_string(),
            message,
            timestamp: at,
            details: json!({
                "username": key.username,
                "mac_address": key.mac_address,
                "ip_address": state.address,
                "uptime": state.uptime,
            }),
        })
    }
}
