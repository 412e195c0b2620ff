// # Tracked Domains
//
// Every monitored domain (hotspot sessions, DHCP leases, interfaces) runs
// through the same pipeline:
//
// ```text
// raw payload ─▶ Record ─▶ (Key, State) ─▶ KeyedSnapshot ─▶ Transition ─▶ Event
//              decode     key/normalize      build            diff        classify
// ```
//
// A domain plugs into that pipeline by implementing [`Tracked`]. The trait is
// purely functional: classification returns events as data, and the engine
// performs persistence and notification afterwards.

pub mod interface;
pub mod lease;
pub mod session;

pub use interface::{InterfaceDomain, InterfaceState, LinkStatus};
pub use lease::{LeaseDomain, LeaseState};
pub use session::{SessionDomain, SessionKey, SessionState};

use chrono::{DateTime, Local, Utc};
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display, Write};
use tracing::{debug, info, warn};

use crate::diff::{Transition, diff};
use crate::event::{Domain, Event};
use crate::record::Resource;
use crate::snapshot::KeyedSnapshot;

/// Keyed snapshot of domain `D`
pub type Snapshot<D> = KeyedSnapshot<<D as Tracked>::Key, <D as Tracked>::State>;

/// A domain whose entities are tracked across polls
pub trait Tracked: Send + Sync + 'static {
    /// Domain tag used in logs and events
    const DOMAIN: Domain;

    /// Router resource this domain is read from
    const RESOURCE: Resource;

    /// Typed row decoded from the source payload
    type Record: DeserializeOwned;

    /// Stable identity of an entity across polls
    type Key: Ord + Clone + Debug + Display + Send + Sync + 'static;

    /// Normalized entity state
    type State: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Extract the entity key from a row
    fn key(record: &Self::Record) -> Self::Key;

    /// Reduce a row to the fields the classifier inspects (plus rendering extras)
    fn normalize(record: Self::Record) -> Self::State;

    /// Whether a key present in both snapshots changed in a notable way
    ///
    /// Defaults to never: the domain only reports presence.
    fn changed(_before: &Self::State, _after: &Self::State) -> bool {
        false
    }

    /// Map a transition to at most one event
    ///
    /// Returning `None` means the transition is informational only.
    fn classify(transition: &Transition<Self::Key, Self::State>, at: DateTime<Utc>)
    -> Option<Event>;
}

/// Diff two snapshots of domain `D` and classify the result
///
/// Transitions that produce no event are logged (appearances at info,
/// disappearances at warn) and dropped.
pub fn evaluate<D: Tracked>(
    previous: Option<&Snapshot<D>>,
    current: &Snapshot<D>,
    at: DateTime<Utc>,
) -> Vec<Event> {
    let transitions = diff(previous, current, D::changed);
    let mut events = Vec::with_capacity(transitions.len());

    for transition in &transitions {
        match D::classify(transition, at) {
            Some(event) => {
                info!(domain = %D::DOMAIN, key = %event.key, kind = %event.kind, "Event detected");
                events.push(event);
            }
            None => match transition {
                Transition::Appeared { key, state } => {
                    info!(domain = %D::DOMAIN, key = %key, "New entity detected: {:?}", state);
                }
                Transition::Disappeared { key, .. } => {
                    warn!(domain = %D::DOMAIN, key = %key, "Entity disappeared");
                }
                Transition::Changed { key, .. } => {
                    debug!(domain = %D::DOMAIN, key = %key, transition = transition.label(), "No event for transition");
                }
            },
        }
    }

    events
}

/// Plain-text notification body: a title line, labelled lines, a timestamp
pub(crate) struct Message {
    text: String,
}

impl Message {
    pub(crate) fn new(title: &str) -> Self {
        let mut text = String::with_capacity(160);
        text.push_str(title);
        text.push('\n');
        Self { text }
    }

    pub(crate) fn line(mut self, label: &str, value: impl Display) -> Self {
        let _ = writeln!(self.text, "{}: {}", label, value);
        self
    }

    pub(crate) fn line_if(self, condition: bool, label: &str, value: impl Display) -> Self {
        if condition { self.line(label, value) } else { self }
    }

    /// Append the event time in the host's local zone and return the text
    pub(crate) fn finish(self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&Local);
        self.line("Time", local.format("%Y-%m-%d %H:%M:%S")).text
    }
}
