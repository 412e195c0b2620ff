//! Core router monitor
//!
//! The RouterMonitor is responsible for:
//! - Fetching raw router state via RecordSource
//! - Building keyed snapshots and diffing them against the per-domain baseline
//! - Classifying transitions into events
//! - Persisting events and traffic samples via EventStore
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ RecordSource │─── raw payload ───┐
//! └──────────────┘                   │
//!                                    ▼
//!                           ┌────────────────┐
//!                           │ RouterMonitor  │  baseline per domain
//!                           └────────────────┘
//!                                    │
//!               ┌────────────────────┼────────────────────┐
//!               │                    │                    │
//!               ▼                    ▼                    ▼
//!       ┌──────────────┐    ┌──────────────┐     ┌──────────────┐
//!       │  EventStore  │    │   Notices    │     │   Traffic    │
//!       │  (persist)   │    │  (returned)  │     │ Accumulator  │
//!       └──────────────┘    └──────────────┘     └──────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Lock the domain baseline (held for the whole cycle)
//! 2. Fetch the payload; any failure leaves the baseline untouched
//! 3. Build the snapshot; an unusable payload leaves the baseline untouched
//! 4. Diff + classify against the baseline
//! 5. Replace the baseline with the new snapshot in one assignment
//! 6. Persist each event (failures logged), return the notices
//!
//! Notification fan-out is left to the caller (see [`scheduler`]).

pub mod scheduler;

pub use scheduler::{Cycle, MonitorEvent, Scheduler};

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{
    InterfaceDomain, LeaseDomain, SessionDomain, Snapshot, Tracked, evaluate,
};
use crate::error::{Error, Result};
use crate::event::{Domain, Event, Notice};
use crate::record::{InterfaceRecord, Resource};
use crate::snapshot;
use crate::traffic::{InterfaceTraffic, Lookback, TrafficAccumulator, TrafficUsage};
use crate::traits::{EventStore, RecordSource};

/// Baseline cell of one domain
struct Tracker<D: Tracked> {
    baseline: Mutex<Option<Snapshot<D>>>,
}

impl<D: Tracked> Tracker<D> {
    fn new() -> Self {
        Self {
            baseline: Mutex::new(None),
        }
    }
}

/// Core router monitor
///
/// Owns the previous snapshot of each domain. All cycle methods take `&self`
/// and may be called concurrently: each domain serializes on its own lock,
/// so a scheduled and an on-demand run of the same cycle never interleave.
pub struct RouterMonitor {
    /// Router state reader
    source: Arc<dyn RecordSource>,

    /// Durable event and sample log
    store: Arc<dyn EventStore>,

    traffic: TrafficAccumulator,

    sessions: Tracker<SessionDomain>,
    leases: Tracker<LeaseDomain>,
    interfaces: Tracker<InterfaceDomain>,

    /// Serializes traffic sampling
    traffic_lock: Mutex<()>,
}

impl RouterMonitor {
    /// Create a monitor with empty baselines
    ///
    /// The first successful cycle of each domain only establishes its
    /// baseline and reports nothing.
    pub fn new(source: Arc<dyn RecordSource>, store: Arc<dyn EventStore>) -> Self {
        Self {
            source,
            traffic: TrafficAccumulator::new(Arc::clone(&store)),
            store,
            sessions: Tracker::new(),
            leases: Tracker::new(),
            interfaces: Tracker::new(),
            traffic_lock: Mutex::new(()),
        }
    }

    /// Check hotspot sessions for logins and logouts
    pub async fn run_session_cycle(&self) -> Result<Vec<Notice>> {
        self.run_domain_cycle(&self.sessions).await
    }

    /// Check DHCP leases for new, renewed and released leases
    pub async fn run_lease_cycle(&self) -> Result<Vec<Notice>> {
        self.run_domain_cycle(&self.leases).await
    }

    /// Check interfaces for link status flips
    pub async fn run_interface_cycle(&self) -> Result<Vec<Notice>> {
        self.run_domain_cycle(&self.interfaces).await
    }

    /// Record one counter sample per interface
    ///
    /// # Returns
    ///
    /// - `Ok(n)`: Number of samples stored
    /// - `Err(Error::SourceUnavailable)`: Interfaces could not be read
    pub async fn run_traffic_cycle(&self) -> Result<usize> {
        let _guard = self.traffic_lock.lock().await;

        let counters = self.interface_counters().await?;
        let now = Utc::now();
        let mut stored = 0;

        for counter in &counters {
            match self
                .traffic
                .record_at(now, &counter.name, counter.rx_bytes, counter.tx_bytes)
                .await
            {
                Ok(()) => stored += 1,
                Err(e) => {
                    error!(interface = %counter.name, "Failed to store traffic sample: {}", e);
                }
            }
        }

        info!(interfaces = counters.len(), stored, "Traffic snapshot taken");
        Ok(stored)
    }

    /// Traffic of one interface over a named lookback, given its current counters
    ///
    /// Unknown lookback names fall back to `1h`. Without a sample old enough
    /// the usage is zero and `has_baseline` is `false`.
    pub async fn compute_usage(
        &self,
        interface: &str,
        lookback_name: &str,
        current_rx: u64,
        current_tx: u64,
    ) -> Result<TrafficUsage> {
        self.traffic
            .usage_at(
                interface,
                Lookback::from_name(lookback_name),
                (current_rx, current_tx),
                Utc::now(),
            )
            .await
    }

    /// Traffic of every interface the router reports right now
    ///
    /// Without a lookback the raw counters are returned. With one, each
    /// interface gets its clamped usage since the lookback baseline.
    pub async fn traffic_report(&self, lookback_name: Option<&str>) -> Result<Vec<InterfaceTraffic>> {
        let counters = self.interface_counters().await?;
        let now = Utc::now();

        let Some(name) = lookback_name else {
            return Ok(counters
                .into_iter()
                .map(|c| InterfaceTraffic {
                    interface: c.name,
                    rx_bytes: c.rx_bytes,
                    tx_bytes: c.tx_bytes,
                    has_baseline: true,
                })
                .collect());
        };

        let lookback = Lookback::from_name(name);
        let mut report = Vec::with_capacity(counters.len());
        for c in counters {
            let usage = self
                .traffic
                .usage_at(&c.name, lookback, (c.rx_bytes, c.tx_bytes), now)
                .await?;
            report.push(InterfaceTraffic {
                interface: c.name,
                rx_bytes: usage.rx_bytes,
                tx_bytes: usage.tx_bytes,
                has_baseline: usage.has_baseline,
            });
        }
        Ok(report)
    }

    /// Most recent stored events, newest first
    pub async fn recent_events(&self, domain: Option<Domain>, limit: usize) -> Result<Vec<Event>> {
        self.store.recent_events(domain, limit).await
    }

    /// Current session baseline (`None` until the first successful cycle)
    pub async fn session_baseline(&self) -> Option<Snapshot<SessionDomain>> {
        self.sessions.baseline.lock().await.clone()
    }

    /// Current lease baseline
    pub async fn lease_baseline(&self) -> Option<Snapshot<LeaseDomain>> {
        self.leases.baseline.lock().await.clone()
    }

    /// Current interface baseline
    pub async fn interface_baseline(&self) -> Option<Snapshot<InterfaceDomain>> {
        self.interfaces.baseline.lock().await.clone()
    }

    /// The event store shared with the accumulator
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    async fn run_domain_cycle<D: Tracked>(&self, tracker: &Tracker<D>) -> Result<Vec<Notice>> {
        let mut baseline = tracker.baseline.lock().await;

        let payload = self.fetch(D::RESOURCE).await?;
        let current = snapshot::build::<D>(Some(&payload)).inspect_err(|e| {
            warn!(domain = %D::DOMAIN, "Skipping cycle, baseline kept: {}", e);
        })?;

        let at = Utc::now();
        let events = evaluate::<D>(baseline.as_ref(), &current, at);
        if baseline.is_none() {
            info!(domain = %D::DOMAIN, entities = current.len(), "Baseline established");
        }
        *baseline = Some(current);

        self.persist(&events).await;
        Ok(events.iter().map(Notice::from).collect())
    }

    async fn persist(&self, events: &[Event]) {
        for event in events {
            if let Err(e) = self.store.append_event(event).await {
                error!(kind = %event.kind, key = %event.key, "Failed to persist event: {}", e);
            }
        }
    }

    /// Fetch one resource, folding every failure into `SourceUnavailable`
    async fn fetch(&self, resource: Resource) -> Result<Value> {
        debug!(source = self.source.name(), %resource, "Fetching");
        self.source.fetch(resource).await.map_err(|e| {
            warn!(source = self.source.name(), %resource, "Source unavailable: {}", e);
            if e.is_source_unavailable() {
                e
            } else {
                Error::source_unavailable(format!("{}: {}", resource, e))
            }
        })
    }

    async fn interface_counters(&self) -> Result<Vec<InterfaceCounters>> {
        let payload = self.fetch(Resource::Interfaces).await?;
        counters_from_payload(&payload)
    }
}

/// Named byte counters of one interface row
#[derive(Debug, Clone, PartialEq, Eq)]
struct InterfaceCounters {
    name: String,
    rx_bytes: u64,
    tx_bytes: u64,
}

fn counters_from_payload(payload: &Value) -> Result<Vec<InterfaceCounters>> {
    let Value::Array(rows) = payload else {
        return Err(Error::source_unavailable("interfaces payload is not a list"));
    };

    let mut counters = Vec::with_capacity(rows.len());
    for row in rows {
        let record = match InterfaceRecord::deserialize(row) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping interface row: {}", e);
                continue;
            }
        };
        let Some(name) = record.name else {
            debug!("Skipping interface row without a name");
            continue;
        };
        counters.push(InterfaceCounters {
            name,
            rx_bytes: record.rx_byte.unwrap_or(0),
            tx_bytes: record.tx_byte.unwrap_or(0),
        });
    }
    Ok(counters)
}
