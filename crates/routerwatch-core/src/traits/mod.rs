//! Core traits for the routerwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RecordSource`]: Read raw router state, one resource at a time
//! - [`EventStore`]: Durable append-only log of events and traffic samples
//! - [`Notifier`]: Deliver a message to one recipient

pub mod event_store;
pub mod notifier;
pub mod record_source;

pub use event_store::{EventStore, EventStoreFactory};
pub use notifier::{Notifier, NotifierFactory};
pub use record_source::{RecordSource, RecordSourceFactory};
