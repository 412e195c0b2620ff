// # routerwatch-core
//
// Core library for the router state-tracking and notification system.
//
// ## Architecture Overview
//
// - **RecordSource**: Trait for reading raw router state (sessions, leases, interfaces)
// - **KeyedSnapshot / diff**: Canonical per-domain snapshots and the transitions between them
// - **Tracked**: Per-domain keying, normalization and event classification
// - **TrafficAccumulator**: Interface counter samples and lookback baselines
// - **RouterMonitor**: Runs one cycle per domain against its previous snapshot
// - **Scheduler**: Drives the four cycles periodically, isolating failures
// - **EventStore / Notifier**: Persistence and delivery collaborators
// - **ComponentRegistry**: Plugin-based registry for sources, notifiers and stores
//
// ## Design Principles
//
// 1. **Quiet start**: The first observation of a domain only sets its baseline
// 2. **Once per transition**: An unchanged entity never produces a second event
// 3. **Frozen on failure**: An unreadable router leaves the baseline untouched
// 4. **Data first**: Classification is pure; persistence and delivery come after

pub mod config;
pub mod diff;
pub mod domain;
pub mod engine;
pub mod error;
pub mod event;
pub mod notify;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod traffic;
pub mod traits;

// Re-export core types for convenience
pub use config::{MonitorConfig, NotifierConfig, SourceConfig, StoreConfig};
pub use engine::{Cycle, MonitorEvent, RouterMonitor, Scheduler};
pub use error::{Error, Result};
pub use event::{Domain, Event, EventKind, Notice};
pub use notify::{DispatchReport, Dispatcher};
pub use record::Resource;
pub use registry::ComponentRegistry;
pub use store::{MemoryEventStore, SqliteEventStore};
pub use traffic::{InterfaceTraffic, Lookback, TrafficSample, TrafficUsage};
pub use traits::{EventStore, Notifier, RecordSource};
