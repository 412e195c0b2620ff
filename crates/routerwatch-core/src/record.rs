// # Router Records
//
// Typed shapes of the raw rows a record source returns, one per resource.
//
// RouterOS REST renders every value as a string (`"true"`, `"1500"`,
// `"10m30s"`), while other sources and test fixtures use native JSON types.
// The deserializers here accept both, and fall back to the documented
// default instead of rejecting the whole row.
//
// ## Defaults
//
// - Missing identity fields (`name`, `mac-address`) decode as `None` and are
//   keyed as `"unknown"` by the snapshot builder.
// - Counters and error totals default to `0`.
// - Lease `active` defaults to `status == "bound"` when the row carries no
//   explicit flag.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Key fallback used when a row lacks its identity field
pub const UNKNOWN: &str = "unknown";

/// Router resource a record source can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Active hotspot sessions
    HotspotSessions,
    /// DHCP server leases
    DhcpLeases,
    /// Interfaces with link state and byte counters
    Interfaces,
}

impl Resource {
    /// Stable name used in logs and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::HotspotSessions => "hotspot_sessions",
            Resource::DhcpLeases => "dhcp_leases",
            Resource::Interfaces => "interfaces",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active hotspot session row
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionRecord {
    /// Hotspot user name (`name`, or `user` on newer RouterOS)
    #[serde(default, alias = "user", deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(default, rename = "mac-address", deserialize_with = "lenient_string")]
    pub mac_address: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub uptime: Option<String>,
}

/// One DHCP lease row
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeaseRecord {
    #[serde(default, rename = "mac-address", deserialize_with = "lenient_string")]
    pub mac_address: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,

    #[serde(default, rename = "host-name", deserialize_with = "lenient_string")]
    pub host_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: Option<bool>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,

    /// Remaining lease time, normalized to seconds
    #[serde(default, rename = "expires-after", deserialize_with = "lenient_duration")]
    pub expires_after: Option<u64>,
}

impl LeaseRecord {
    /// Effective activity flag: the explicit field, else whether the lease is bound
    pub fn is_active(&self) -> bool {
        self.active
            .unwrap_or_else(|| self.status.as_deref() == Some("bound"))
    }
}

/// One interface row
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InterfaceRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub running: Option<bool>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub disabled: Option<bool>,

    #[serde(default, rename = "link-speed", alias = "speed", deserialize_with = "lenient_string")]
    pub link_speed: Option<String>,

    #[serde(default, rename = "rx-error", deserialize_with = "lenient_u64")]
    pub rx_error: Option<u64>,

    #[serde(default, rename = "tx-error", deserialize_with = "lenient_u64")]
    pub tx_error: Option<u64>,

    #[serde(default, rename = "rx-byte", deserialize_with = "lenient_u64")]
    pub rx_byte: Option<u64>,

    #[serde(default, rename = "tx-byte", deserialize_with = "lenient_u64")]
    pub tx_byte: Option<u64>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_routeros_duration(&s),
        _ => None,
    }))
}

/// Parse a RouterOS duration into whole seconds.
///
/// Accepts plain seconds (`"600"`), unit strings (`"1w2d3h4m5s"`, `"10m30s"`,
/// sub-second parts like `"500ms"` are dropped) and clock form
/// (`"00:05:00"`).
pub fn parse_routeros_duration(input: &str) -> Option<u64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Some(secs);
    }

    if input.contains(':') {
        let mut total = 0u64;
        for part in input.split(':') {
            let part: u64 = part.parse().ok()?;
            total = total.checked_mul(60)?.checked_add(part)?;
        }
        return Some(total);
    }

    let mut total = 0u64;
    let mut number = String::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }

        let value: u64 = number.parse().ok()?;
        number.clear();

        let unit = match c {
            'w' => 604_800,
            'd' => 86_400,
            'h' => 3_600,
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                0
            }
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(unit)?)?;
    }

    if !number.is_empty() {
        return None;
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_routeros_duration() {
        assert_eq!(parse_routeros_duration("600"), Some(600));
        assert_eq!(parse_routeros_duration("10m30s"), Some(630));
        assert_eq!(parse_routeros_duration("1w2d3h4m5s"), Some(788_645));
        assert_eq!(parse_routeros_duration("1s500ms"), Some(1));
        assert_eq!(parse_routeros_duration("00:05:00"), Some(300));
        assert_eq!(parse_routeros_duration(""), None);
        assert_eq!(parse_routeros_duration("5x"), None);
        assert_eq!(parse_routeros_duration("12"), Some(12));
        assert_eq!(parse_routeros_duration("3h12"), None);
    }

    #[test]
    fn test_lease_record_accepts_routeros_strings() {
        let row = json!({
            "mac-address": "AA:BB:CC:DD:EE:FF",
            "address": "192.168.88.10",
            "host-name": "laptop",
            "status": "bound",
            "expires-after": "9m58s"
        });

        let lease = LeaseRecord::deserialize(&row).unwrap();
        assert_eq!(lease.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(lease.expires_after, Some(598));
        assert_eq!(lease.active, None);
        assert!(lease.is_active());
    }

    #[test]
    fn test_lease_explicit_active_wins_over_status() {
        let row = json!({ "mac-address": "AA", "active": false, "status": "bound" });
        let lease = LeaseRecord::deserialize(&row).unwrap();
        assert!(!lease.is_active());
    }

    #[test]
    fn test_interface_record_lenient_fields() {
        let row = json!({
            "name": "ether1",
            "running": "true",
            "disabled": "false",
            "rx-byte": "123456",
            "tx-byte": 789,
            "rx-error": "garbage",
            "speed": "1Gbps"
        });

        let iface = InterfaceRecord::deserialize(&row).unwrap();
        assert_eq!(iface.running, Some(true));
        assert_eq!(iface.disabled, Some(false));
        assert_eq!(iface.rx_byte, Some(123_456));
        assert_eq!(iface.tx_byte, Some(789));
        assert_eq!(iface.rx_error, None);
        assert_eq!(iface.link_speed.as_deref(), Some("1Gbps"));
    }

    #[test]
    fn test_session_record_user_alias() {
        let row = json!({ "user": "bob", "mac-address": "11:22", "address": "10.5.50.2" });
        let session = SessionRecord::deserialize(&row).unwrap();
        assert_eq!(session.name.as_deref(), Some("bob"));
    }

    #[test]
    fn test_non_string_text_fields_keep_the_row() {
        let row = json!({ "user": "bob", "mac-address": "11:22", "uptime": 120 });
        let session = SessionRecord::deserialize(&row).unwrap();
        assert_eq!(session.uptime.as_deref(), Some("120"));
        assert_eq!(session.address, None);

        let row = json!({
            "mac-address": "AA",
            "host-name": 42,
            "address": ["10.0.0.1"],
            "status": true
        });
        let lease = LeaseRecord::deserialize(&row).unwrap();
        assert_eq!(lease.mac_address.as_deref(), Some("AA"));
        assert_eq!(lease.host_name.as_deref(), Some("42"));
        assert_eq!(lease.address, None);
        assert_eq!(lease.status.as_deref(), Some("true"));

        let row = json!({ "name": "ether1", "link-speed": { "mbps": 1000 } });
        let iface = InterfaceRecord::deserialize(&row).unwrap();
        assert_eq!(iface.name.as_deref(), Some("ether1"));
        assert_eq!(iface.link_speed, None);
    }
}
