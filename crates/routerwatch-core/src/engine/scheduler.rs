//! Periodic driver of the four monitor cycles
//!
//! ## Tasks
//!
//! One tokio task per [`Cycle`], each with its own interval and initial
//! delay. A task awaits its invocation before waiting for the next tick, so
//! a cycle never overlaps itself; ticks missed while an invocation ran late
//! are delayed rather than fired in a burst.
//!
//! ## Failure isolation
//!
//! Every invocation runs in its own spawned task. An error or a panic is
//! logged, reported as a [`MonitorEvent`] and the cycle waits for its next
//! tick. The other cycles never notice.
//!
//! ## Shutdown
//!
//! The stop signal is broadcast over a watch channel. Idle tasks exit at
//! once; an in-flight invocation gets `shutdown_grace` to finish before its
//! task is aborted. The event store is flushed last.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout_at};
use tracing::{debug, error, info, warn};

use super::RouterMonitor;
use crate::config::{CycleSchedule, EngineConfig, ScheduleConfig};
use crate::error::Result;
use crate::notify::Dispatcher;

/// One of the periodic cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cycle {
    Traffic,
    Sessions,
    Leases,
    Interfaces,
}

impl Cycle {
    pub const ALL: [Cycle; 4] = [
        Cycle::Traffic,
        Cycle::Sessions,
        Cycle::Leases,
        Cycle::Interfaces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cycle::Traffic => "traffic",
            Cycle::Sessions => "sessions",
            Cycle::Leases => "leases",
            Cycle::Interfaces => "interfaces",
        }
    }

    fn schedule(&self, config: &ScheduleConfig) -> CycleSchedule {
        match self {
            Cycle::Traffic => config.traffic,
            Cycle::Sessions => config.sessions,
            Cycle::Leases => config.leases,
            Cycle::Interfaces => config.interfaces,
        }
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Scheduler started
    Started { cycles: usize },

    /// Cycle ran to completion
    ///
    /// `items` is the number of samples stored (traffic) or notices
    /// produced (other cycles).
    CycleCompleted { cycle: Cycle, items: usize },

    /// Router could not be observed; baseline kept
    CycleSkipped { cycle: Cycle, reason: String },

    /// Cycle returned an unexpected error or panicked
    CycleFailed { cycle: Cycle, error: String },

    /// Scheduler stopped
    Stopped { reason: String },
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// State shared by the cycle tasks
struct Runner {
    monitor: Arc<RouterMonitor>,
    dispatcher: Dispatcher,
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl Runner {
    async fn invoke(&self, cycle: Cycle) -> Result<usize> {
        let notices = match cycle {
            Cycle::Traffic => return self.monitor.run_traffic_cycle().await,
            Cycle::Sessions => self.monitor.run_session_cycle().await?,
            Cycle::Leases => self.monitor.run_lease_cycle().await?,
            Cycle::Interfaces => self.monitor.run_interface_cycle().await?,
        };

        if !notices.is_empty() {
            let report = self.dispatcher.dispatch(&notices).await;
            debug!(
                %cycle,
                delivered = report.delivered,
                failed = report.failed,
                "Notices dispatched"
            );
        }
        Ok(notices.len())
    }

    /// Run one invocation in its own task and report the outcome
    async fn run_once(self: &Arc<Self>, cycle: Cycle) {
        let runner = Arc::clone(self);
        let started = Instant::now();
        let mut handle = tokio::spawn(async move { runner.invoke(cycle).await });
        let _abort = AbortOnDrop(handle.abort_handle());

        let event = match (&mut handle).await {
            Ok(Ok(items)) => {
                debug!(%cycle, items, elapsed_ms = started.elapsed().as_millis() as u64, "Cycle completed");
                MonitorEvent::CycleCompleted { cycle, items }
            }
            Ok(Err(e)) if e.is_source_unavailable() => {
                warn!(%cycle, "Cycle skipped: {}", e);
                MonitorEvent::CycleSkipped {
                    cycle,
                    reason: e.to_string(),
                }
            }
            Ok(Err(e)) => {
                error!(%cycle, "Cycle failed: {}", e);
                MonitorEvent::CycleFailed {
                    cycle,
                    error: e.to_string(),
                }
            }
            Err(join_err) => {
                error!(%cycle, "Cycle panicked: {}", join_err);
                MonitorEvent::CycleFailed {
                    cycle,
                    error: join_err.to_string(),
                }
            }
        };
        self.emit_event(event);
    }

    fn emit_event(&self, event: MonitorEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Monitor event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

async fn cycle_loop(
    runner: Arc<Runner>,
    cycle: Cycle,
    schedule: CycleSchedule,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + schedule.initial_delay(), schedule.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        %cycle,
        interval_secs = schedule.interval_secs,
        initial_delay_secs = schedule.initial_delay_secs,
        "Cycle scheduled"
    );

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }
        if *stop.borrow() {
            break;
        }
        runner.run_once(cycle).await;
    }

    debug!(%cycle, "Cycle task exiting");
}

/// Drives the monitor on its schedule and fans notices out
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`]
/// 3. Runs until a shutdown signal is received
pub struct Scheduler {
    runner: Arc<Runner>,
    schedule: ScheduleConfig,
    shutdown_grace: Duration,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields monitor events
    pub fn new(
        monitor: Arc<RouterMonitor>,
        dispatcher: Dispatcher,
        schedule: ScheduleConfig,
        engine: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        schedule.validate()?;
        engine.validate()?;

        let (tx, rx) = mpsc::channel(engine.event_channel_capacity);

        let scheduler = Self {
            runner: Arc::new(Runner {
                monitor,
                dispatcher,
                event_tx: tx,
            }),
            schedule,
            shutdown_grace: engine.shutdown_grace(),
        };

        Ok((scheduler, rx))
    }

    pub fn monitor(&self) -> &Arc<RouterMonitor> {
        &self.runner.monitor
    }

    /// Run until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run until `shutdown_rx` fires (or Ctrl-C when `None`)
    ///
    /// The daemon passes a receiver wired to SIGTERM/SIGINT; tests use it
    /// for deterministic shutdown.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let (stop_tx, stop_rx) = watch::channel(false);

        let tasks: Vec<(Cycle, JoinHandle<()>)> = Cycle::ALL
            .into_iter()
            .map(|cycle| {
                let handle = tokio::spawn(cycle_loop(
                    Arc::clone(&self.runner),
                    cycle,
                    cycle.schedule(&self.schedule),
                    stop_rx.clone(),
                ));
                (cycle, handle)
            })
            .collect();

        self.runner.emit_event(MonitorEvent::Started {
            cycles: tasks.len(),
        });
        info!(cycles = tasks.len(), "Scheduler started");

        match shutdown_rx {
            Some(rx) => {
                // A dropped sender counts as a shutdown request
                let _ = rx.await;
            }
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
            }
        }
        info!("Shutdown signal received");

        let _ = stop_tx.send(true);
        let requested = Instant::now();
        let deadline = requested.checked_add(self.shutdown_grace).unwrap_or(requested);

        for (cycle, mut handle) in tasks {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(%cycle, "Cycle task ended abnormally: {}", e),
                Err(_) => {
                    warn!(%cycle, "Cycle still running after grace period, aborting");
                    handle.abort();
                }
            }
        }

        self.runner.emit_event(MonitorEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        // Flush the store before exiting
        self.runner.monitor.store().flush().await?;
        info!("Event store flushed, scheduler stopped");

        Ok(())
    }
}
