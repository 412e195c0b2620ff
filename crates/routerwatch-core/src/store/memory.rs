// # Memory Event Store
//
// In-memory implementation of EventStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for ephemeral deployments that only care about
// live notifications.
//
// ## Crash Behavior
//
// - Event history and traffic samples are lost on restart
// - Traffic lookbacks report "no baseline" until enough samples accumulate

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StoreConfig;
use crate::event::{Domain, Event};
use crate::traffic::TrafficSample;
use crate::traits::event_store::{EventStore, EventStoreFactory};

#[derive(Debug, Default)]
struct Inner {
    events: Vec<Event>,
    samples: HashMap<String, Vec<TrafficSample>>,
}

/// In-memory event store implementation
///
/// # Example
///
/// ```rust,no_run
/// use routerwatch_core::store::MemoryEventStore;
/// use routerwatch_core::traits::EventStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryEventStore::new();
///     let recent = store.recent_events(None, 10).await?;
///     assert!(recent.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryEventStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// Number of stored traffic samples across all interfaces
    pub async fn sample_count(&self) -> usize {
        self.inner.read().await.samples.values().map(Vec::len).sum()
    }

    /// All stored events in append order
    pub async fn events(&self) -> Vec<Event> {
        self.inner.read().await.events.clone()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_event(&self, event: &Event) -> Result<(), Error> {
        self.inner.write().await.events.push(event.clone());
        Ok(())
    }

    async fn append_traffic_sample(&self, sample: &TrafficSample) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .samples
            .entry(sample.interface.clone())
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    async fn latest_traffic_sample_at_or_before(
        &self,
        interface: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<TrafficSample>, Error> {
        let guard = self.inner.read().await;
        let Some(samples) = guard.samples.get(interface) else {
            return Ok(None);
        };

        // Samples may have been recorded out of order; ties go to the later append
        let mut best: Option<&TrafficSample> = None;
        for sample in samples.iter().filter(|s| s.timestamp <= at) {
            if best.is_none_or(|b| sample.timestamp >= b.timestamp) {
                best = Some(sample);
            }
        }
        Ok(best.cloned())
    }

    async fn recent_events(
        &self,
        domain: Option<Domain>,
        limit: usize,
    ) -> Result<Vec<Event>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .events
            .iter()
            .rev()
            .filter(|e| domain.is_none_or(|d| e.domain() == d))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for `StoreConfig::Memory`
pub struct MemoryEventStoreFactory;

impl EventStoreFactory for MemoryEventStoreFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn EventStore>, Error> {
        match config {
            StoreConfig::Memory => Ok(Box::new(MemoryEventStore::new())),
            other => Err(Error::config(format!(
                "memory store factory cannot build a '{}' store",
                other.type_name()
            ))),
        }
    }
}
