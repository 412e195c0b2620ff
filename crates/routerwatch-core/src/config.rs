//! Configuration types for the routerwatch system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Record source (router) configuration
    pub source: SourceConfig,

    /// Notifier configuration
    pub notifier: NotifierConfig,

    /// Event store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Chat recipients that receive every notice
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Per-cycle schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl MonitorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.recipients.is_empty() {
            return Err(crate::Error::config("No notification recipients configured"));
        }
        if self.recipients.iter().any(|r| r.trim().is_empty()) {
            return Err(crate::Error::config("Recipient ids cannot be empty"));
        }

        self.source.validate()?;
        self.notifier.validate()?;
        self.store.validate()?;
        self.schedule.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Record source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// MikroTik RouterOS REST API
    Mikrotik {
        /// Base URL of the router (e.g. "https://192.168.88.1")
        url: String,
        /// API user
        username: String,
        /// API password
        password: String,
        /// Accept self-signed router certificates
        #[serde(default)]
        accept_invalid_certs: bool,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom record source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Mikrotik {
                url,
                username,
                timeout_secs,
                ..
            } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Router URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Router URL must start with http:// or https:// (got '{}')",
                        url
                    )));
                }
                if username.is_empty() {
                    return Err(crate::Error::config("Router username cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Router timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Mikrotik { .. } => "mikrotik",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Telegram Bot API
    Telegram {
        /// Bot token issued by BotFather
        bot_token: String,
        /// API base URL
        #[serde(default = "default_telegram_api_base")]
        api_base: String,
        /// Log messages instead of sending them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Telegram {
                bot_token,
                api_base,
                dry_run,
            } => {
                if bot_token.is_empty() && !dry_run {
                    return Err(crate::Error::config("Telegram bot token cannot be empty"));
                }
                if api_base.is_empty() {
                    return Err(crate::Error::config("Telegram API base cannot be empty"));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom notifier config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Telegram { .. } => "telegram",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Event store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// SQLite database file
    Sqlite {
        /// Path to the database file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom event store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Sqlite { path } if path.is_empty() => {
                Err(crate::Error::config("SQLite store path cannot be empty"))
            }
            StoreConfig::Custom { factory, .. } if factory.is_empty() => {
                Err(crate::Error::config("Custom store factory cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Sqlite { .. } => "sqlite",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Timing of one periodic cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSchedule {
    /// Period between invocations (in seconds)
    pub interval_secs: u64,

    /// Delay before the first invocation (in seconds)
    #[serde(default)]
    pub initial_delay_secs: u64,
}

impl CycleSchedule {
    pub const fn new(interval_secs: u64, initial_delay_secs: u64) -> Self {
        Self {
            interval_secs,
            initial_delay_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

/// Schedules of the four cycles
///
/// Initial delays are staggered so the cycles do not all hit the router at
/// the same instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_traffic_schedule")]
    pub traffic: CycleSchedule,

    #[serde(default = "default_session_schedule")]
    pub sessions: CycleSchedule,

    #[serde(default = "default_lease_schedule")]
    pub leases: CycleSchedule,

    #[serde(default = "default_interface_schedule")]
    pub interfaces: CycleSchedule,
}

impl ScheduleConfig {
    /// Validate the schedule configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (name, schedule) in [
            ("traffic", &self.traffic),
            ("sessions", &self.sessions),
            ("leases", &self.leases),
            ("interfaces", &self.interfaces),
        ] {
            if schedule.interval_secs == 0 {
                return Err(crate::Error::config(format!(
                    "{} interval must be > 0",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            traffic: default_traffic_schedule(),
            sessions: default_session_schedule(),
            leases: default_lease_schedule(),
            interfaces: default_interface_schedule(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the monitor event channel
    ///
    /// When full, new monitor events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// How long an in-flight cycle may run after shutdown is requested
    /// before its task is aborted (in seconds)
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl EngineConfig {
    /// Upper bound for `shutdown_grace_secs`
    pub const MAX_SHUTDOWN_GRACE_SECS: u64 = 3600;

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.shutdown_grace_secs > Self::MAX_SHUTDOWN_GRACE_SECS {
            return Err(crate::Error::config(format!(
                "Shutdown grace must be at most {}s, got {}s",
                Self::MAX_SHUTDOWN_GRACE_SECS,
                self.shutdown_grace_secs
            )));
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_traffic_schedule() -> CycleSchedule {
    CycleSchedule::new(3600, 10)
}

fn default_session_schedule() -> CycleSchedule {
    CycleSchedule::new(30, 5)
}

fn default_lease_schedule() -> CycleSchedule {
    CycleSchedule::new(60, 15)
}

fn default_interface_schedule() -> CycleSchedule {
    CycleSchedule::new(30, 20)
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "source": {
                "type": "mikrotik",
                "url": "https://192.168.88.1",
                "username": "api",
                "password": "secret"
            },
            "notifier": { "type": "telegram", "bot_token": "123:abc" },
            "recipients": ["1001"]
        })
    }

    #[test]
    fn test_defaults_fill_in() {
        let config: MonitorConfig = serde_json::from_value(minimal()).unwrap();
        config.validate().unwrap();

        assert!(matches!(config.store, StoreConfig::Memory));
        assert_eq!(config.schedule.traffic, CycleSchedule::new(3600, 10));
        assert_eq!(config.schedule.sessions, CycleSchedule::new(30, 5));
        assert_eq!(config.schedule.leases, CycleSchedule::new(60, 15));
        assert_eq!(config.schedule.interfaces, CycleSchedule::new(30, 20));
        assert_eq!(config.engine.event_channel_capacity, 1000);
        assert_eq!(config.engine.shutdown_grace_secs, 10);

        match &config.source {
            SourceConfig::Mikrotik {
                timeout_secs,
                accept_invalid_certs,
                ..
            } => {
                assert_eq!(*timeout_secs, 10);
                assert!(!accept_invalid_certs);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config: MonitorConfig = serde_json::from_value(minimal()).unwrap();
        config.recipients.clear();
        assert!(config.validate().is_err());

        let mut config: MonitorConfig = serde_json::from_value(minimal()).unwrap();
        config.schedule.leases.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config: MonitorConfig = serde_json::from_value(minimal()).unwrap();
        config.source = SourceConfig::Mikrotik {
            url: "192.168.88.1".to_string(),
            username: "api".to_string(),
            password: String::new(),
            accept_invalid_certs: true,
            timeout_secs: 10,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shutdown_grace_is_bounded() {
        let mut engine = EngineConfig::default();
        engine.shutdown_grace_secs = EngineConfig::MAX_SHUTDOWN_GRACE_SECS;
        assert!(engine.validate().is_ok());

        engine.shutdown_grace_secs = u64::MAX;
        assert!(matches!(engine.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_dry_run_allows_missing_token() {
        let notifier = NotifierConfig::Telegram {
            bot_token: String::new(),
            api_base: default_telegram_api_base(),
            dry_run: true,
        };
        assert!(notifier.validate().is_ok());
        assert_eq!(notifier.type_name(), "telegram");
    }
}
