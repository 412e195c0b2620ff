// # SQLite Event Store
//
// Durable implementation of EventStore on a single SQLite file.
//
// ## Threading
//
// `rusqlite::Connection` is blocking and not `Sync`, so one worker thread owns
// it. Async callers send boxed closures over a channel and await the reply on
// a oneshot. Writes from the four cycles are serialized by that queue.
//
// ## Schema
//
// - `events`: one row per classified event, `details` as JSON text
// - `traffic_samples`: one row per interface counter reading
//
// Timestamps are stored as UTC microseconds since the epoch. Sub-microsecond
// precision is truncated, so an "at or before" lookup may accept a sample
// taken less than a microsecond after its target.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::event::{Domain, Event, EventKind};
use crate::traffic::TrafficSample;
use crate::traits::event_store::{EventStore, EventStoreFactory};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    domain TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    message TEXT NOT NULL,
    occurred_at_us INTEGER NOT NULL,
    details TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_domain_time
    ON events (domain, occurred_at_us);

CREATE TABLE IF NOT EXISTS traffic_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    interface TEXT NOT NULL,
    sampled_at_us INTEGER NOT NULL,
    rx_bytes INTEGER NOT NULL,
    tx_bytes INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_traffic_interface_time
    ON traffic_samples (interface, sampled_at_us);
";

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct StoreInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {}", err);
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {:?}", join_err);
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::persistence(format!("value {} exceeds SQLite INTEGER range", value)))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::persistence(format!("value {} is negative", value)))
}

fn from_micros(us: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_micros(us)
        .single()
        .ok_or_else(|| Error::persistence(format!("timestamp {} out of range", us)))
}

/// SQLite-backed event store
///
/// Cheap to clone: clones share the same worker thread and connection.
#[derive(Clone)]
pub struct SqliteEventStore {
    inner: Arc<StoreInner>,
    path: Arc<PathBuf>,
}

impl SqliteEventStore {
    /// Open (or create) the database at `path` and apply the schema
    ///
    /// Blocks until the worker thread has opened the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path_for_thread = path.clone();

        let worker = thread::Builder::new()
            .name("routerwatch-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(Error::persistence(format!(
                            "failed to open SQLite database: {}",
                            err
                        ))));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {}", err);
                }

                let init_result = conn.execute_batch(SCHEMA).map_err(Error::from);
                if ready_tx.send(init_result).is_err() {
                    error!("Store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                debug!("Store thread shutting down");
            })?;

        ready_rx.recv().map_err(|_| {
            Error::persistence("store worker exited before signaling readiness")
        })??;

        info!(path = %path.display(), "SQLite event store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                debug!("Store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| Error::persistence(format!("store thread unavailable: {}", err)))?;

        reply_rx
            .await
            .map_err(|_| Error::persistence("store thread terminated unexpectedly"))?
    }
}

impl std::fmt::Debug for SqliteEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEventStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append_event(&self, event: &Event) -> Result<()> {
        let event = event.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO events (kind, domain, entity_key, message, occurred_at_us, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.kind.as_str(),
                    event.domain().as_str(),
                    event.key,
                    event.message,
                    event.timestamp.timestamp_micros(),
                    serde_json::to_string(&event.details)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn append_traffic_sample(&self, sample: &TrafficSample) -> Result<()> {
        let sample = sample.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO traffic_samples (interface, sampled_at_us, rx_bytes, tx_bytes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    sample.interface,
                    sample.timestamp.timestamp_micros(),
                    to_i64(sample.rx_bytes)?,
                    to_i64(sample.tx_bytes)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn latest_traffic_sample_at_or_before(
        &self,
        interface: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<TrafficSample>> {
        let interface = interface.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT sampled_at_us, rx_bytes, tx_bytes
                     FROM traffic_samples
                     WHERE interface = ?1 AND sampled_at_us <= ?2
                     ORDER BY sampled_at_us DESC, id DESC
                     LIMIT 1",
                    params![interface, at.timestamp_micros()],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(us, rx, tx)| {
                Ok(TrafficSample {
                    timestamp: from_micros(us)?,
                    interface: interface.clone(),
                    rx_bytes: to_u64(rx)?,
                    tx_bytes: to_u64(tx)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn recent_events(&self, domain: Option<Domain>, limit: usize) -> Result<Vec<Event>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT kind, entity_key, message, occurred_at_us, details
                 FROM events
                 WHERE ?1 IS NULL OR domain = ?1
                 ORDER BY occurred_at_us DESC, id DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![domain.map(|d| d.as_str()), limit])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(Event {
                    kind: row.get::<_, String>(0)?.parse::<EventKind>()?,
                    key: row.get(1)?,
                    message: row.get(2)?,
                    timestamp: from_micros(row.get(3)?)?,
                    details: serde_json::from_str(&row.get::<_, String>(4)?)?,
                });
            }
            Ok(events)
        })
        .await
    }

    async fn flush(&self) -> Result<()> {
        self.execute(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}

/// Factory for `StoreConfig::Sqlite`
pub struct SqliteEventStoreFactory;

impl EventStoreFactory for SqliteEventStoreFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn EventStore>> {
        match config {
            StoreConfig::Sqlite { path } => Ok(Box::new(SqliteEventStore::open(path)?)),
            other => Err(Error::config(format!(
                "sqlite store factory cannot build a '{}' store",
                other.type_name()
            ))),
        }
    }
}
