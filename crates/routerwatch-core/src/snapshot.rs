//! Keyed snapshots of one domain at one poll instant
//!
//! [`build`] is the only place raw payloads are decoded. Everything
//! downstream works on typed keys and normalized states.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::Tracked;
use crate::error::{Error, Result};

/// Immutable mapping from a stable entity key to its normalized state
///
/// Backed by a `BTreeMap`, so iteration order is the key order and is the
/// same on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedSnapshot<K: Ord, S> {
    entries: BTreeMap<K, S>,
}

impl<K: Ord, S> KeyedSnapshot<K, S> {
    /// Create an empty snapshot ("observed, nothing there")
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&S> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &S)> {
        self.entries.iter()
    }

    fn insert(&mut self, key: K, state: S) {
        self.entries.insert(key, state);
    }
}

impl<K: Ord, S> Default for KeyedSnapshot<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Later pairs overwrite earlier ones with the same key
impl<K: Ord, S> FromIterator<(K, S)> for KeyedSnapshot<K, S> {
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (key, state) in iter {
            snapshot.insert(key, state);
        }
        snapshot
    }
}

/// Build the keyed snapshot of domain `D` from a raw source payload
///
/// # Returns
///
/// - `Ok(snapshot)`: The payload was a list; every decodable row is keyed
///   (duplicate keys: last row wins)
/// - `Err(Error::SourceUnavailable)`: The payload was absent or not a list,
///   so nothing can be said about which entities exist
pub fn build<D: Tracked>(payload: Option<&Value>) -> Result<KeyedSnapshot<D::Key, D::State>> {
    let rows = match payload {
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(Error::source_unavailable(format!(
                "{} payload is not a list (got {})",
                D::DOMAIN,
                json_type(other)
            )));
        }
        None => {
            return Err(Error::source_unavailable(format!(
                "no {} payload",
                D::DOMAIN
            )));
        }
    };

    let mut snapshot = KeyedSnapshot::new();
    for (index, row) in rows.iter().enumerate() {
        if !row.is_object() {
            warn!(domain = %D::DOMAIN, index, "Skipping {} row that is not an object", json_type(row));
            continue;
        }

        match D::Record::deserialize(row) {
            Ok(record) => {
                let key = D::key(&record);
                snapshot.insert(key, D::normalize(record));
            }
            Err(e) => {
                warn!(domain = %D::DOMAIN, index, "Skipping undecodable row: {}", e);
            }
        }
    }

    debug!(domain = %D::DOMAIN, rows = rows.len(), entities = snapshot.len(), "Snapshot built");
    Ok(snapshot)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
