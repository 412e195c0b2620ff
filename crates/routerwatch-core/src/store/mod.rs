// # Event Store Implementations
//
// This module provides implementations of the EventStore trait for
// different persistence strategies.

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryEventStore, MemoryEventStoreFactory};
pub use sqlite::{SqliteEventStore, SqliteEventStoreFactory};
