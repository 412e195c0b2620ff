// # Event Store Trait
//
// Defines the interface for the durable, append-only log of classified
// events and traffic counter samples.
//
// ## Purpose
//
// - Keep a history of every login/logout, lease and link event
// - Keep periodic interface counter samples so traffic over a lookback
//   window can be computed later
//
// Nothing is ever updated or deleted through this trait.
//
// ## Implementations
//
// - Memory: in-process vectors
// - SQLite: single file, one connection owned by a worker thread
//
// ## Usage
//
// ```rust,ignore
// use routerwatch_core::traits::EventStore;
//
// let store = /* EventStore implementation */;
// store.append_event(&event).await?;
// let baseline = store
//     .latest_traffic_sample_at_or_before("ether1", target)
//     .await?;
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::event::{Domain, Event};
use crate::traffic::TrafficSample;

/// Trait for event store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Thread Safety
///
/// All methods may be called concurrently from the four cycles. Serializing
/// writes is the implementation's responsibility.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage (files, databases, etc.)
/// - ✅ Own a worker thread for a blocking database driver
///
/// ## Forbidden Capabilities
/// - ❌ Mutate or delete stored events and samples
/// - ❌ Decide what is an event (owned by the domain classifiers)
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one classified event
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The event is durable
    /// - `Err(Error::Persistence)`: Write failed
    async fn append_event(&self, event: &Event) -> Result<(), crate::Error>;

    /// Append one traffic counter sample
    async fn append_traffic_sample(&self, sample: &TrafficSample) -> Result<(), crate::Error>;

    /// Most recent sample for `interface` taken at or before `at`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(sample))`: Latest sample with `timestamp <= at`
    /// - `Ok(None)`: No sample that old exists yet
    /// - `Err(Error)`: Storage error
    async fn latest_traffic_sample_at_or_before(
        &self,
        interface: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<TrafficSample>, crate::Error>;

    /// Most recent events, newest first
    ///
    /// # Parameters
    ///
    /// - `domain`: Restrict to one domain, or `None` for all
    /// - `limit`: Maximum number of events returned
    async fn recent_events(
        &self,
        domain: Option<Domain>,
        limit: usize,
    ) -> Result<Vec<Event>, crate::Error>;

    /// Persist any pending writes
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Successfully flushed
    /// - `Err(Error)`: Storage error
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing event stores from configuration
pub trait EventStoreFactory: Send + Sync {
    /// Create an EventStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Store configuration
    ///
    /// # Returns
    ///
    /// A boxed EventStore trait object
    fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<Box<dyn EventStore>, crate::Error>;
}
