//! DHCP lease lifecycle keyed by MAC address.
//!
//! - new lease → `dhcp_new`
//! - lease gone → `dhcp_release`
//! - remaining time jumped up while active → `dhcp_renew`
//!
//! `expires-after` counts down between polls and only increases when the
//! client renews, so a strict increase is the renewal signal. A lease that
//! went inactive and came back with a longer timer under the same MAC is
//! still judged by that literal rule.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{Message, Tracked};
use crate::diff::Transition;
use crate::event::{Domain, Event, EventKind};
use crate::record::{LeaseRecord, Resource, UNKNOWN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseState {
    pub address: String,
    pub hostname: Option<String>,
    pub active: bool,
    /// Remaining lease time in seconds
    pub expires_after: Option<u64>,
}

/// DHCP lease domain
pub struct LeaseDomain;

impl Tracked for LeaseDomain {
    const DOMAIN: Domain = Domain::Lease;
    const RESOURCE: Resource = Resource::DhcpLeases;

    type Record = LeaseRecord;
    type Key = String;
    type State = LeaseState;

    fn key(record: &LeaseRecord) -> String {
        record
            .mac_address
            .clone()
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn normalize(record: LeaseRecord) -> LeaseState {
        let active = record.is_active();
        LeaseState {
            address: record.address.unwrap_or_else(|| UNKNOWN.to_string()),
            hostname: record.host_name.filter(|h| !h.is_empty()),
            active,
            expires_after: record.expires_after,
        }
    }

    /// Renewal: remaining time strictly increased and the lease is active
    fn changed(before: &LeaseState, after: &LeaseState) -> bool {
        after.active && after.expires_after.unwrap_or(0) > before.expires_after.unwrap_or(0)
    }

    fn classify(transition: &Transition<String, LeaseState>, at: DateTime<Utc>) -> Option<Event> {
        let (kind, mac, state, lease_time) = match transition {
            Transition::Appeared { key, state } => (EventKind::DhcpNew, key, state, state.expires_after),
            Transition::Changed { key, after, .. } => {
                (EventKind::DhcpRenew, key, after, after.expires_after)
            }
            Transition::Disappeared { key, last } => (EventKind::DhcpRelease, key, last, None),
        };

        let title = match kind {
            EventKind::DhcpNew => "DHCP NEW",
            EventKind::DhcpRenew => "DHCP RENEW",
            _ => "DHCP RELEASE",
        };

        let hostname = state.hostname.as_deref().unwrap_or_default();
        let lease_secs = lease_time.unwrap_or(0);
        let message = Message::new(title)
            .line("MAC", mac)
            .line("IP", &state.address)
            .line_if(!hostname.is_empty(), "Hostname", hostname)
            .line_if(lease_secs > 0, "Lease", format!("{}s", lease_secs))
            .finish(at);

        Some(Event {
            kind,
            key: mac.clone(),
            message,
            timestamp: at,
            details: json!({
                "mac_address": mac,
                "ip_address": state.address,
                "hostname": state.hostname,
                "lease_time": lease_time,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Snapshot, evaluate};

    fn lease(expires_after: u64, active: bool) -> LeaseState {
        LeaseState {
            address: "192.168.88.10".to_string(),
            hostname: Some("laptop".to_string()),
            active,
            expires_after: Some(expires_after),
        }
    }

    fn one(mac: &str, state: LeaseState) -> Snapshot<LeaseDomain> {
        [(mac.to_string(), state)].into_iter().collect()
    }

    #[test]
    fn test_renewal_emits_exactly_one_renew() {
        let previous = one("AA:BB", lease(600, true));
        let current = one("AA:BB", lease(1800, true));

        let events = evaluate::<LeaseDomain>(Some(&previous), &current, Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::DhcpRenew);
        assert_eq!(events[0].key, "AA:BB");
        assert!(events[0].message.contains("Lease: 1800s"));
        assert_eq!(events[0].details["lease_time"], 1800);
    }

    #[test]
    fn test_countdown_is_not_a_renewal() {
        let previous = one("AA:BB", lease(600, true));
        let current = one("AA:BB", lease(540, true));
        assert!(evaluate::<LeaseDomain>(Some(&previous), &current, Utc::now()).is_empty());
    }

    #[test]
    fn test_inactive_increase_is_not_a_renewal() {
        let previous = one("AA:BB", lease(600, true));
        let current = one("AA:BB", lease(1800, false));
        assert!(evaluate::<LeaseDomain>(Some(&previous), &current, Utc::now()).is_empty());
    }

    #[test]
    fn test_new_and_release() {
        let previous = one("AA:BB", lease(600, true));
        let current = one("CC:DD", lease(3600, true));

        let events = evaluate::<LeaseDomain>(Some(&previous), &current, Utc::now());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::DhcpNew);
        assert_eq!(events[0].key, "CC:DD");
        assert_eq!(events[1].kind, EventKind::DhcpRelease);
        assert_eq!(events[1].key, "AA:BB");
        assert!(events[1].details["lease_time"].is_null());
        assert!(!events[1].message.contains("Lease:"));
    }

    #[test]
    fn test_missing_expiry_counts_as_zero() {
        let mut before = lease(0, true);
        before.expires_after = None;
        let previous = one("AA:BB", before);
        let current = one("AA:BB", lease(300, true));

        let events = evaluate::<LeaseDomain>(Some(&previous), &current, Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::DhcpRenew);
    }
}
