//! Test doubles and common utilities for monitor contract tests
//!
//! These doubles script the router, record what was persisted and delivered,
//! and inject failures at each collaborator seam.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use routerwatch_core::error::{Error, Result};
use routerwatch_core::event::{Domain, Event};
use routerwatch_core::record::Resource;
use routerwatch_core::store::MemoryEventStore;
use routerwatch_core::traffic::TrafficSample;
use routerwatch_core::traits::{EventStore, Notifier, RecordSource};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted answer of the router
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this payload
    Payload(Value),
    /// Fail like an unreachable router
    Fail,
    /// Panic inside `fetch`
    Panic,
    /// Never answer
    Hang,
}

/// A RecordSource that replays scripted answers per resource
///
/// When a resource's script runs out, its last step repeats.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    scripts: Arc<Mutex<HashMap<Resource, VecDeque<Step>>>>,
    last: Arc<Mutex<HashMap<Resource, Step>>>,
    calls: Arc<Mutex<HashMap<Resource, usize>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue steps for a resource
    pub fn script(&self, resource: Resource, steps: impl IntoIterator<Item = Step>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(resource)
            .or_default()
            .extend(steps);
        self
    }

    /// Queue one payload for a resource
    pub fn push(&self, resource: Resource, payload: Value) -> &Self {
        self.script(resource, [Step::Payload(payload)])
    }

    /// Number of fetches of a resource so far
    pub fn calls(&self, resource: Resource) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&resource)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch(&self, resource: Resource) -> Result<Value> {
        *self.calls.lock().unwrap().entry(resource).or_default() += 1;

        let step = {
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&resource)
                .and_then(VecDeque::pop_front);
            let mut last = self.last.lock().unwrap();
            match next {
                Some(step) => {
                    last.insert(resource, step.clone());
                    step
                }
                None => last.get(&resource).cloned().unwrap_or(Step::Fail),
            }
        };

        match step {
            Step::Payload(value) => Ok(value),
            Step::Fail => Err(Error::transport("scripted", "connection refused")),
            Step::Panic => panic!("scripted panic for {}", resource),
            Step::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// An EventStore whose event writes always fail; samples and flushes work
#[derive(Clone, Default)]
pub struct FailingEventStore {
    inner: MemoryEventStore,
    failed_appends: Arc<AtomicUsize>,
}

impl FailingEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed_appends(&self) -> usize {
        self.failed_appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append_event(&self, _event: &Event) -> Result<()> {
        self.failed_appends.fetch_add(1, Ordering::SeqCst);
        Err(Error::persistence("disk I/O error"))
    }

    async fn append_traffic_sample(&self, sample: &TrafficSample) -> Result<()> {
        self.inner.append_traffic_sample(sample).await
    }

    async fn latest_traffic_sample_at_or_before(
        &self,
        interface: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<TrafficSample>> {
        self.inner.latest_traffic_sample_at_or_before(interface, at).await
    }

    async fn recent_events(&self, domain: Option<Domain>, limit: usize) -> Result<Vec<Event>> {
        self.inner.recent_events(domain, limit).await
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// A MemoryEventStore wrapper that counts flushes
#[derive(Clone, Default)]
pub struct CountingEventStore {
    pub inner: MemoryEventStore,
    flushes: Arc<AtomicUsize>,
}

impl CountingEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for CountingEventStore {
    async fn append_event(&self, event: &Event) -> Result<()> {
        self.inner.append_event(event).await
    }

    async fn append_traffic_sample(&self, sample: &TrafficSample) -> Result<()> {
        self.inner.append_traffic_sample(sample).await
    }

    async fn latest_traffic_sample_at_or_before(
        &self,
        interface: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<TrafficSample>> {
        self.inner.latest_traffic_sample_at_or_before(interface, at).await
    }

    async fn recent_events(&self, domain: Option<Domain>, limit: usize) -> Result<Vec<Event>> {
        self.inner.recent_events(domain, limit).await
    }

    async fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A Notifier that records every (recipient, text) pair it is given
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// A hotspot session row as RouterOS renders it
pub fn session_row(user: &str, mac: &str, address: &str) -> Value {
    serde_json::json!({
        "user": user,
        "mac-address": mac,
        "address": address,
        "uptime": "5m"
    })
}

/// A DHCP lease row as RouterOS renders it
pub fn lease_row(mac: &str, address: &str, expires_after: &str) -> Value {
    serde_json::json!({
        "mac-address": mac,
        "address": address,
        "host-name": "laptop",
        "status": "bound",
        "expires-after": expires_after
    })
}

/// An interface row as RouterOS renders it
pub fn interface_row(name: &str, running: bool, rx: u64, tx: u64) -> Value {
    serde_json::json!({
        "name": name,
        "running": running.to_string(),
        "disabled": "false",
        "link-speed": "1Gbps",
        "rx-byte": rx.to_string(),
        "tx-byte": tx.to_string(),
        "rx-error": "0",
        "tx-error": "0"
    })
}
