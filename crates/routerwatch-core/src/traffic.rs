// # Traffic Accumulator
//
// Periodic interface counter samples, appended to the event store and
// queried for a baseline "as of N ago".
//
// ## Semantics
//
// - Samples are appended as-is. Counters that go backwards (router reboot,
//   counter wrap) are accepted without complaint.
// - The baseline for a lookback is the most recent sample taken at or
//   before `now - lookback`. A sample newer than the target never counts.
// - Usage is `current - baseline` per counter, clamped at zero. A reset
//   between the baseline and now therefore shows up as zero usage rather
//   than a negative figure; the traffic transferred since the reset is not
//   recovered.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::traits::EventStore;

/// Named lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookback {
    /// `1h`: 60 minutes
    Hour,
    /// `1d`: 1440 minutes
    Day,
    /// `1m`: 43800 minutes (one average month)
    Month,
    /// `1y`: 525600 minutes
    Year,
}

impl Lookback {
    /// Map a lookback name to its window
    ///
    /// Unrecognized names fall back to one hour.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "1h" => Lookback::Hour,
            "1d" => Lookback::Day,
            "1m" => Lookback::Month,
            "1y" => Lookback::Year,
            other => {
                debug!(name = other, "Unknown lookback, using 1h");
                Lookback::Hour
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Lookback::Hour => "1h",
            Lookback::Day => "1d",
            Lookback::Month => "1m",
            Lookback::Year => "1y",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Lookback::Hour => 60,
            Lookback::Day => 1_440,
            Lookback::Month => 43_800,
            Lookback::Year => 525_600,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl std::fmt::Display for Lookback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One interface counter reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub timestamp: DateTime<Utc>,
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Traffic over a lookback window for one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficUsage {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// `false` when no sample old enough exists yet (both counters are 0)
    pub has_baseline: bool,
}

/// Per-interface line of a traffic report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceTraffic {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Always `true` for raw totals
    pub has_baseline: bool,
}

/// Clamped per-counter delta
pub fn usage(current: (u64, u64), baseline: (u64, u64)) -> (u64, u64) {
    (
        current.0.saturating_sub(baseline.0),
        current.1.saturating_sub(baseline.1),
    )
}

/// Append-only counter series backed by an [`EventStore`]
#[derive(Clone)]
pub struct TrafficAccumulator {
    store: Arc<dyn EventStore>,
}

impl TrafficAccumulator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Append a sample stamped now
    pub async fn record(&self, interface: &str, rx_bytes: u64, tx_bytes: u64) -> Result<()> {
        self.record_at(Utc::now(), interface, rx_bytes, tx_bytes).await
    }

    /// Append a sample stamped `at`
    pub async fn record_at(
        &self,
        at: DateTime<Utc>,
        interface: &str,
        rx_bytes: u64,
        tx_bytes: u64,
    ) -> Result<()> {
        let sample = TrafficSample {
            timestamp: at,
            interface: interface.to_string(),
            rx_bytes,
            tx_bytes,
        };
        self.store.append_traffic_sample(&sample).await
    }

    /// Baseline counters `(rx, tx)` for `lookback` ago
    pub async fn query_baseline(
        &self,
        interface: &str,
        lookback: Lookback,
    ) -> Result<Option<(u64, u64)>> {
        self.query_baseline_at(interface, lookback, Utc::now()).await
    }

    /// Baseline counters for `lookback` before `now`
    pub async fn query_baseline_at(
        &self,
        interface: &str,
        lookback: Lookback,
        now: DateTime<Utc>,
    ) -> Result<Option<(u64, u64)>> {
        let target = now - lookback.duration();
        let sample = self
            .store
            .latest_traffic_sample_at_or_before(interface, target)
            .await?;

        debug!(
            interface,
            lookback = %lookback,
            %target,
            found = sample.is_some(),
            "Traffic baseline lookup"
        );

        Ok(sample.map(|s| (s.rx_bytes, s.tx_bytes)))
    }

    /// Usage since `lookback` before `now`, given the current counters
    pub async fn usage_at(
        &self,
        interface: &str,
        lookback: Lookback,
        current: (u64, u64),
        now: DateTime<Utc>,
    ) -> Result<TrafficUsage> {
        let usage = match self.query_baseline_at(interface, lookback, now).await? {
            Some(baseline) => {
                let (rx_bytes, tx_bytes) = usage(current, baseline);
                TrafficUsage {
                    rx_bytes,
                    tx_bytes,
                    has_baseline: true,
                }
            }
            None => TrafficUsage {
                rx_bytes: 0,
                tx_bytes: 0,
                has_baseline: false,
            },
        };
        Ok(usage)
    }
}
