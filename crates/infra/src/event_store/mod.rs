//! Append-only event store boundary.
//!
//! One stream per ledger record, keyed by `aggregate_id`. Besides the
//! per-stream `sequence_number`, every committed event gets a store-wide
//! `global_position`; the stock view orders facts from different records by it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
