//! Plugin-based component registry
//!
//! The registry allows record sources, notifiers and event stores to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use routerwatch_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::with_builtin_stores();
//! routerwatch_source_mikrotik::register(&registry);
//! routerwatch_notify_telegram::register(&registry);
//!
//! let source = registry.create_source(&config.source)?;
//! let notifier = registry.create_notifier(&config.notifier)?;
//! let store = registry.create_store(&config.store)?;
//! ```
//!
//! ## Registration
//!
//! Plugin crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_source("mikrotik", Box::new(MikrotikSourceFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{NotifierConfig, SourceConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::store::{MemoryEventStoreFactory, SqliteEventStoreFactory};
use crate::traits::{EventStore, Notifier, RecordSource};
use crate::traits::{EventStoreFactory, NotifierFactory, RecordSourceFactory};

type FactoryMap<F> = RwLock<HashMap<String, Box<F>>>;

fn read<F: ?Sized>(map: &FactoryMap<F>) -> RwLockReadGuard<'_, HashMap<String, Box<F>>> {
    map.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<F: ?Sized>(map: &FactoryMap<F>) -> RwLockWriteGuard<'_, HashMap<String, Box<F>>> {
    map.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry for plugin-based component creation
///
/// Maps type names (the `type` tag of each config section) to factories.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered record source factories
    sources: FactoryMap<dyn RecordSourceFactory>,

    /// Registered notifier factories
    notifiers: FactoryMap<dyn NotifierFactory>,

    /// Registered event store factories
    stores: FactoryMap<dyn EventStoreFactory>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `sqlite` stores registered
    pub fn with_builtin_stores() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryEventStoreFactory));
        registry.register_store("sqlite", Box::new(SqliteEventStoreFactory));
        registry
    }

    /// Register a record source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "mikrotik")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn RecordSourceFactory>) {
        write(&self.sources).insert(name.into(), factory);
    }

    /// Register a notifier factory
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        write(&self.notifiers).insert(name.into(), factory);
    }

    /// Register an event store factory
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn EventStoreFactory>) {
        write(&self.stores).insert(name.into(), factory);
    }

    /// Create a record source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RecordSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>> {
        let source_type = config.type_name();
        let sources = read(&self.sources);
        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create a notifier from configuration
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = read(&self.notifiers);
        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// Create an event store from configuration
    pub fn create_store(&self, config: &StoreConfig) -> Result<Box<dyn EventStore>> {
        let store_type = config.type_name();
        let stores = read(&self.stores);
        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?;

        factory.create(config)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        read(&self.sources).keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        read(&self.notifiers).keys().cloned().collect()
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        read(&self.stores).keys().cloned().collect()
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        read(&self.sources).contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        read(&self.notifiers).contains_key(name)
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        read(&self.stores).contains_key(name)
    }
}
