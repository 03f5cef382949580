//! Command execution pipeline for event-sourced ledger records.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the record's stream
//!   ↓
//! 2. Rehydrate the aggregate
//!   ↓
//! 3. Handle the command (pure decision, produces events)
//!   ↓
//! 4. Append every event in one batch, guarded by ExpectedVersion::Exact(loaded)
//!   ↓
//! 5. Publish committed events to the bus
//! ```
//!
//! A rejected decision produces no events, so nothing is appended. A writer
//! that loses the race at step 4 gets [`DispatchError::Concurrency`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use labstock_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use labstock_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Another writer committed to the stream first.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// The record is not in the status the command requires.
    #[error("state conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found")]
    NotFound,

    #[error("unresolved reference: {0}")]
    Referential(String),

    /// Historical payloads could not be decoded into the aggregate's event type.
    #[error("failed to decode stored event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::Unauthorized(msg) => DispatchError::Unauthorized(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::Referential(msg) => DispatchError::Referential(msg),
        }
    }
}

/// Aggregate state after a successful dispatch, with the events that produced it.
#[derive(Debug, Clone)]
pub struct Committed<A> {
    pub aggregate: A,
    pub events: Vec<StoredEvent>,
}

/// Reusable command execution engine, generic over store and bus.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Rebuild an aggregate from its stream without deciding anything.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Dispatch a command through the full pipeline.
    ///
    /// Returns the aggregate with the new events applied. Publication happens
    /// after the append; a bus failure is logged and never undoes the commit.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: labstock_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;

        // 3) Decide
        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(Committed {
                aggregate,
                events: vec![],
            });
        }

        // 4) Persist in one batch
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;
        for ev in &decided {
            aggregate.apply(ev);
        }

        // 5) Publish
        for stored in &committed {
            if let Err(err) = self.bus.publish(stored.to_envelope()) {
                tracing::warn!(
                    event_id = %stored.event_id,
                    global_position = stored.global_position,
                    error = ?err,
                    "committed event could not be published"
                );
            }
        }

        Ok(Committed {
            aggregate,
            events: committed,
        })
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use chrono::{NaiveDate, Utc};
    use labstock_core::{AggregateRoot, ItemCode, RoomCode, UserId};
    use labstock_events::InMemoryEventBus;
    use labstock_inventory::{
        ConsumptionCommand, ConsumptionId, ConsumptionLine, ConsumptionRecord, RecordConsumption,
    };
    use std::time::Duration;

    fn record(id: AggregateId, qty: i64) -> ConsumptionCommand {
        ConsumptionCommand::RecordConsumption(RecordConsumption {
            record_id: ConsumptionId::new(id),
            room: RoomCode::new("LAB-A").unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            lines: vec![ConsumptionLine {
                item: ItemCode::new("ETHANOL").unwrap(),
                quantity: qty,
            }],
            recorded_by: UserId::new(),
            occurred_at: Utc::now(),
        })
    }

    fn dispatcher() -> CommandDispatcher<InMemoryEventStore, InMemoryEventBus<EventEnvelope<JsonValue>>> {
        CommandDispatcher::new(InMemoryEventStore::new(), InMemoryEventBus::new())
    }

    fn make(id: AggregateId) -> ConsumptionRecord {
        ConsumptionRecord::empty(ConsumptionId::new(id))
    }

    #[test]
    fn commits_then_publishes() {
        let bus: InMemoryEventBus<EventEnvelope<JsonValue>> = InMemoryEventBus::new();
        let sub = bus.subscribe();
        let dispatcher = CommandDispatcher::new(InMemoryEventStore::new(), bus);
        let id = AggregateId::new();

        let committed = dispatcher
            .dispatch(id, "inventory.consumption", record(id, 2), make)
            .unwrap();
        assert_eq!(committed.events.len(), 1);
        assert_eq!(committed.aggregate.version(), 1);

        let envelope = sub.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(envelope.aggregate_id(), id);
        assert_eq!(envelope.global_position(), 1);

        let loaded = dispatcher.load(id, make).unwrap();
        assert!(loaded.exists());
    }

    #[test]
    fn rejected_decision_appends_nothing() {
        let dispatcher = dispatcher();
        let id = AggregateId::new();

        let err = dispatcher
            .dispatch(id, "inventory.consumption", record(id, 0), make)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(dispatcher.store().load_all().unwrap().is_empty());
    }

    #[test]
    fn domain_conflict_maps_to_conflict() {
        let dispatcher = dispatcher();
        let id = AggregateId::new();
        dispatcher
            .dispatch(id, "inventory.consumption", record(id, 1), make)
            .unwrap();

        let err = dispatcher
            .dispatch(id, "inventory.consumption", record(id, 1), make)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));
    }
}
