// # routerwatchd - Router Monitoring Daemon
//
// Thin integration layer: all tracking, diffing and notification logic lives
// in routerwatch-core. This binary only
// 1. reads configuration from environment variables,
// 2. initializes logging and the runtime,
// 3. registers the source and notifier plugins,
// 4. wires the monitor, dispatcher and scheduler together and runs them
//    until SIGTERM/SIGINT.
//
// ## Configuration
//
// ### Router
// - `RW_ROUTER_URL`: RouterOS base URL (e.g. https://192.168.88.1)
// - `RW_ROUTER_USER`: API user
// - `RW_ROUTER_PASSWORD`: API password
// - `RW_ROUTER_ACCEPT_INVALID_CERTS`: Accept self-signed certificates (default: false)
// - `RW_ROUTER_TIMEOUT_SECS`: Request timeout (default: 10)
//
// ### Telegram
// - `RW_TELEGRAM_BOT_TOKEN`: Bot token
// - `RW_TELEGRAM_CHAT_IDS`: Comma-separated chat ids receiving every notice
// - `RW_TELEGRAM_API_BASE`: API base URL (default: https://api.telegram.org)
// - `RW_NOTIFY_DRY_RUN`: Log notices instead of sending them (default: false)
//
// ### Event Store
// - `RW_STORE_TYPE`: sqlite or memory (default: sqlite)
// - `RW_STORE_PATH`: Database file (default: routerwatch.db)
//
// ### Schedule
// - `RW_TRAFFIC_INTERVAL_SECS` (default: 3600)
// - `RW_SESSION_INTERVAL_SECS` (default: 30)
// - `RW_LEASE_INTERVAL_SECS` (default: 60)
// - `RW_INTERFACE_INTERVAL_SECS` (default: 30)
// - `RW_SHUTDOWN_GRACE_SECS` (default: 10, at most 3600)
//
// ### Logging
// - `RW_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export RW_ROUTER_URL=https://192.168.88.1
// export RW_ROUTER_USER=api
// export RW_ROUTER_PASSWORD=secret
// export RW_ROUTER_ACCEPT_INVALID_CERTS=true
// export RW_TELEGRAM_BOT_TOKEN=123456:ABC
// export RW_TELEGRAM_CHAT_IDS=11111111,22222222
// export RW_STORE_PATH=/var/lib/routerwatch/events.db
//
// routerwatchd
// ```

use anyhow::{Context, Result};
use routerwatch_core::config::{
    EngineConfig, MonitorConfig, NotifierConfig, ScheduleConfig, SourceConfig, StoreConfig,
};
use routerwatch_core::traits::{EventStore, Notifier, RecordSource};
use routerwatch_core::{ComponentRegistry, Dispatcher, MonitorEvent, RouterMonitor, Scheduler};
use std::env;
use std::fmt::Display;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RouterwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RouterwatchExitCode> for ExitCode {
    fn from(code: RouterwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const DEFAULT_STORE_PATH: &str = "routerwatch.db";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Application configuration
#[cfg_attr(test, derive(Debug))]
struct Config {
    router_url: String,
    router_user: String,
    router_password: String,
    router_accept_invalid_certs: bool,
    router_timeout_secs: u64,
    telegram_bot_token: String,
    telegram_api_base: String,
    chat_ids: Vec<String>,
    notify_dry_run: bool,
    store_type: String,
    store_path: String,
    schedule: ScheduleConfig,
    shutdown_grace_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut schedule = ScheduleConfig::default();
        if let Some(secs) = parse_var(&get, "RW_TRAFFIC_INTERVAL_SECS")? {
            schedule.traffic.interval_secs = secs;
        }
        if let Some(secs) = parse_var(&get, "RW_SESSION_INTERVAL_SECS")? {
            schedule.sessions.interval_secs = secs;
        }
        if let Some(secs) = parse_var(&get, "RW_LEASE_INTERVAL_SECS")? {
            schedule.leases.interval_secs = secs;
        }
        if let Some(secs) = parse_var(&get, "RW_INTERFACE_INTERVAL_SECS")? {
            schedule.interfaces.interval_secs = secs;
        }

        Ok(Self {
            router_url: get("RW_ROUTER_URL").unwrap_or_default(),
            router_user: get("RW_ROUTER_USER").unwrap_or_default(),
            router_password: get("RW_ROUTER_PASSWORD").unwrap_or_default(),
            router_accept_invalid_certs: parse_flag(&get, "RW_ROUTER_ACCEPT_INVALID_CERTS")?,
            router_timeout_secs: parse_var(&get, "RW_ROUTER_TIMEOUT_SECS")?.unwrap_or(10),
            telegram_bot_token: get("RW_TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            telegram_api_base: get("RW_TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            chat_ids: get("RW_TELEGRAM_CHAT_IDS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            notify_dry_run: parse_flag(&get, "RW_NOTIFY_DRY_RUN")?,
            store_type: get("RW_STORE_TYPE").unwrap_or_else(|| "sqlite".to_string()),
            store_path: get("RW_STORE_PATH").unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
            schedule,
            shutdown_grace_secs: parse_var(&get, "RW_SHUTDOWN_GRACE_SECS")?.unwrap_or(10),
            log_level: get("RW_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Daemon-level checks come first so their messages can name the
    /// environment variable; the assembled [`MonitorConfig`] is then
    /// validated by the core.
    fn validate(&self) -> Result<()> {
        if self.router_url.is_empty() {
            anyhow::bail!(
                "RW_ROUTER_URL is required. \
                Set it via: export RW_ROUTER_URL=https://192.168.88.1"
            );
        }

        if self.router_user.is_empty() {
            anyhow::bail!("RW_ROUTER_USER is required");
        }

        if self.chat_ids.is_empty() {
            anyhow::bail!(
                "RW_TELEGRAM_CHAT_IDS must contain at least one chat id. \
                Set it via: export RW_TELEGRAM_CHAT_IDS=11111111,22222222"
            );
        }

        if self.telegram_bot_token.is_empty() && !self.notify_dry_run {
            anyhow::bail!(
                "RW_TELEGRAM_BOT_TOKEN is required unless RW_NOTIFY_DRY_RUN=true"
            );
        }

        match self.store_type.as_str() {
            "sqlite" | "memory" => {}
            _ => anyhow::bail!(
                "RW_STORE_TYPE '{}' is not supported. \
                Supported types: sqlite, memory",
                self.store_type
            ),
        }

        if !(1..=120).contains(&self.router_timeout_secs) {
            anyhow::bail!(
                "RW_ROUTER_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.router_timeout_secs
            );
        }

        if self.router_url.starts_with("http://") {
            eprintln!(
                "WARNING: RW_ROUTER_URL uses HTTP (not HTTPS). \
                Router credentials are sent in clear text."
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "RW_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_monitor_config()
            .validate()
            .context("Invalid monitor configuration")?;

        Ok(())
    }

    /// Assemble the core configuration
    fn to_monitor_config(&self) -> MonitorConfig {
        let store = match self.store_type.as_str() {
            "memory" => StoreConfig::Memory,
            _ => StoreConfig::Sqlite {
                path: self.store_path.clone(),
            },
        };

        MonitorConfig {
            source: SourceConfig::Mikrotik {
                url: self.router_url.clone(),
                username: self.router_user.clone(),
                password: self.router_password.clone(),
                accept_invalid_certs: self.router_accept_invalid_certs,
                timeout_secs: self.router_timeout_secs,
            },
            notifier: NotifierConfig::Telegram {
                bot_token: self.telegram_bot_token.clone(),
                api_base: self.telegram_api_base.clone(),
                dry_run: self.notify_dry_run,
            },
            store,
            recipients: self.chat_ids.clone(),
            schedule: self.schedule.clone(),
            engine: EngineConfig {
                shutdown_grace_secs: self.shutdown_grace_secs,
                ..EngineConfig::default()
            },
        }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional variable, failing on malformed values
fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match get(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
    }
}

/// Parse an optional boolean flag (true/false, yes/no, 1/0, on/off)
fn parse_flag(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<bool> {
    let Some(raw) = get(name) else {
        return Ok(false);
    };
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "no" | "0" | "off" => Ok(false),
        "true" | "yes" | "1" | "on" => Ok(true),
        _ => anyhow::bail!("{} must be true or false. Got: {}", name, raw),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RouterwatchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return RouterwatchExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RouterwatchExitCode::ConfigError.into();
    }

    info!("Starting routerwatchd daemon");
    info!(
        "Configuration loaded: router {}, {} recipient(s), {} store",
        config.router_url,
        config.chat_ids.len(),
        config.store_type
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RouterwatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            RouterwatchExitCode::RuntimeError
        } else {
            RouterwatchExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let monitor_config = config.to_monitor_config();

    let registry = ComponentRegistry::with_builtin_stores();

    #[cfg(feature = "mikrotik")]
    {
        info!("Registering MikroTik record source");
        routerwatch_source_mikrotik::register(&registry);
    }

    #[cfg(feature = "telegram")]
    {
        info!("Registering Telegram notifier");
        routerwatch_notify_telegram::register(&registry);
    }

    let source: Arc<dyn RecordSource> = Arc::from(
        registry
            .create_source(&monitor_config.source)
            .context("Failed to create record source")?,
    );
    let notifier: Arc<dyn Notifier> = Arc::from(
        registry
            .create_notifier(&monitor_config.notifier)
            .context("Failed to create notifier")?,
    );
    let store: Arc<dyn EventStore> = Arc::from(
        registry
            .create_store(&monitor_config.store)
            .context("Failed to open event store")?,
    );

    let monitor = Arc::new(RouterMonitor::new(source, store));
    let dispatcher = Dispatcher::new(notifier, monitor_config.recipients.clone());
    let (scheduler, mut events) = Scheduler::new(
        monitor,
        dispatcher,
        monitor_config.schedule.clone(),
        &monitor_config.engine,
    )?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_monitor_event(&event);
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => {
                warn!("Signal handlers unavailable ({}), falling back to Ctrl-C", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
            }
        }
        let _ = shutdown_tx.send(());
    });

    info!("Monitoring router");
    scheduler.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("Shutting down daemon");
    Ok(())
}

fn log_monitor_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::CycleCompleted { cycle, items } => {
            debug!(%cycle, items, "Monitor event: cycle completed");
        }
        MonitorEvent::CycleSkipped { cycle, reason } => {
            debug!(%cycle, reason = %reason, "Monitor event: cycle skipped");
        }
        other => debug!(event = ?other, "Monitor event"),
    }
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// The name of the signal received, or an error if handlers cannot be set up.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for SIGINT
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("RW_ROUTER_URL", "https://192.168.88.1"),
            ("RW_ROUTER_USER", "api"),
            ("RW_ROUTER_PASSWORD", "secret"),
            ("RW_TELEGRAM_BOT_TOKEN", "123456:ABC"),
            ("RW_TELEGRAM_CHAT_IDS", "11111111, 22222222,"),
        ]
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_lookup(lookup(&minimal())).unwrap();
        config.validate().unwrap();

        assert_eq!(config.chat_ids, vec!["11111111", "22222222"]);
        assert_eq!(config.store_type, "sqlite");
        assert_eq!(config.store_path, DEFAULT_STORE_PATH);
        assert_eq!(config.router_timeout_secs, 10);
        assert!(!config.router_accept_invalid_certs);
        assert_eq!(config.schedule.sessions.interval_secs, 30);
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn test_monitor_config_assembly() {
        let mut vars = minimal();
        vars.push(("RW_STORE_TYPE", "memory"));
        vars.push(("RW_ROUTER_ACCEPT_INVALID_CERTS", "yes"));
        vars.push(("RW_LEASE_INTERVAL_SECS", "120"));
        vars.push(("RW_SHUTDOWN_GRACE_SECS", "3"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        let monitor = config.to_monitor_config();
        assert!(matches!(monitor.store, StoreConfig::Memory));
        assert!(matches!(
            monitor.source,
            SourceConfig::Mikrotik {
                accept_invalid_certs: true,
                ..
            }
        ));
        assert_eq!(monitor.schedule.leases.interval_secs, 120);
        assert_eq!(monitor.schedule.leases.initial_delay_secs, 15);
        assert_eq!(monitor.engine.shutdown_grace_secs, 3);
        assert_eq!(monitor.recipients.len(), 2);
    }

    #[test]
    fn test_missing_router_url_rejected() {
        let vars: Vec<_> = minimal()
            .into_iter()
            .filter(|(k, _)| *k != "RW_ROUTER_URL")
            .collect();
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RW_ROUTER_URL"));
    }

    #[test]
    fn test_missing_chat_ids_rejected() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "RW_TELEGRAM_CHAT_IDS");
        vars.push(("RW_TELEGRAM_CHAT_IDS", " , "));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_optional_in_dry_run() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "RW_TELEGRAM_BOT_TOKEN");

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.validate().is_err());

        vars.push(("RW_NOTIFY_DRY_RUN", "true"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_malformed_number_is_error() {
        let mut vars = minimal();
        vars.push(("RW_SESSION_INTERVAL_SECS", "thirty"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("RW_SESSION_INTERVAL_SECS"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut vars = minimal();
        vars.push(("RW_INTERFACE_INTERVAL_SECS", "0"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_store_and_log_level_rejected() {
        let mut vars = minimal();
        vars.push(("RW_STORE_TYPE", "postgres"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.validate().is_err());

        let mut vars = minimal();
        vars.push(("RW_LOG_LEVEL", "verbose"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flag_parsing() {
        let get = lookup(&[("A", "On"), ("B", "0"), ("C", "maybe")]);
        assert!(parse_flag(&get, "A").unwrap());
        assert!(!parse_flag(&get, "B").unwrap());
        assert!(parse_flag(&get, "C").is_err());
        assert!(!parse_flag(&get, "MISSING").unwrap());
    }
}
